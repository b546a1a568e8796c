// Capability negotiation - which required layers/extensions are missing
//
// Everything missing is reported at once so the user can fix the setup in
// one go.

use ash::vk;
use std::collections::HashSet;
use std::ffi::{c_char, CStr};

use crate::error::{CapabilityScope, RenderError, Result};

/// Required names absent from `available`, in `required` order.
pub fn diff_missing<A, R>(available: A, required: &[R]) -> Vec<String>
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    R: AsRef<str>,
{
    let available: HashSet<String> = available
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();

    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !available.contains(*name))
        .map(str::to_string)
        .collect()
}

/// Fails with `CapabilityUnavailable` if any layer or extension is missing.
pub fn ensure_available(
    scope: CapabilityScope,
    available_layers: &[String],
    required_layers: &[String],
    available_extensions: &[String],
    required_extensions: &[String],
) -> Result<()> {
    let layers = diff_missing(available_layers, required_layers);
    let extensions = diff_missing(available_extensions, required_extensions);

    if layers.is_empty() && extensions.is_empty() {
        return Ok(());
    }

    Err(RenderError::CapabilityUnavailable {
        scope,
        layers,
        extensions,
    })
}

pub fn layer_names(properties: &[vk::LayerProperties]) -> Vec<String> {
    properties
        .iter()
        .map(|prop| fixed_name(&prop.layer_name))
        .collect()
}

pub fn extension_names(properties: &[vk::ExtensionProperties]) -> Vec<String> {
    properties
        .iter()
        .map(|prop| fixed_name(&prop.extension_name))
        .collect()
}

/// Reads a NUL-terminated name out of a fixed-size driver array.
pub(crate) fn fixed_name(raw: &[c_char]) -> String {
    // Driver-filled arrays are NUL terminated within their bounds
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
