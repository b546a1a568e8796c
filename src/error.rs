// Error taxonomy for device negotiation and frame presentation
//
// Every variant names the capability, format or resource involved: these
// are startup/configuration failures a human has to act on.

use ash::prelude::VkResult;
use ash::vk;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Where a capability check ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityScope {
    Instance,
    Device,
}

impl fmt::Display for CapabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityScope::Instance => f.write_str("Vulkan instance"),
            CapabilityScope::Device => f.write_str("Vulkan device"),
        }
    }
}

/// Misuse of the begin/present protocol on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameProtocolError {
    #[error("present() called without an active frame; call begin() first")]
    NoActiveFrame,
    #[error("frame was already submitted; call begin() before recording or presenting again")]
    AlreadySubmitted,
    #[error("begin() called while a frame is being recorded; present() it first")]
    AlreadyRecording,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{scope} is missing {}", describe_missing(.layers, .extensions))]
    CapabilityUnavailable {
        scope: CapabilityScope,
        layers: Vec<String>,
        extensions: Vec<String>,
    },

    #[error("no suitable physical device: need {requirement}")]
    NoSuitableDevice { requirement: String },

    #[error("no acceptable surface format offered (acceptable: {acceptable:?}, available: {available:?})")]
    NoSuitableFormat {
        acceptable: Vec<vk::Format>,
        available: Vec<vk::Format>,
    },

    #[error("none of the depth formats {candidates:?} supports optimal-tiling depth/stencil attachments")]
    NoSuitableDepthFormat { candidates: Vec<vk::Format> },

    #[error("backend has no presentation surface; a swapchain cannot be built")]
    NoValidSurface,

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error(transparent)]
    FrameProtocol(#[from] FrameProtocolError),

    #[error("timed out after {waited:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        waited: Duration,
    },

    #[error("device lost during {during}")]
    DeviceLost { during: &'static str },

    #[error("{call} failed: {result}")]
    Driver { call: &'static str, result: vk::Result },

    #[error("failed to load the Vulkan library. Is Vulkan installed?")]
    Loading(#[from] ash::LoadingError),

    #[error("GPU memory allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("window handle unavailable: {0}")]
    Surface(String),
}

impl RenderError {
    /// Maps a raw driver result, keeping device loss distinct from ordinary failures.
    pub fn from_vk(call: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => RenderError::DeviceLost { during: call },
            result => RenderError::Driver { call, result },
        }
    }

    /// True for failures that cannot be recovered from by retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::DeviceLost { .. })
    }
}

/// Attaches the failing driver call to an ash result.
pub trait VkResultExt<T> {
    fn during(self, call: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    fn during(self, call: &'static str) -> Result<T> {
        self.map_err(|result| RenderError::from_vk(call, result))
    }
}

fn describe_missing(layers: &[String], extensions: &[String]) -> String {
    let mut parts = Vec::new();
    if !layers.is_empty() {
        parts.push(format!("layers [{}]", layers.join(", ")));
    }
    if !extensions.is_empty() {
        parts.push(format!("extensions [{}]", extensions.join(", ")));
    }
    parts.join(" and ")
}
