// Public rendering surface: backend -> renderer -> frame
//
// A `Backend` owns the API instance and (optionally) the presentation
// surface. A `Renderer` owns one logical device picked from the backend's
// suitable devices. A `Frame` owns the swapchain and everything needed to
// clear and present one image at a time.
//
// Each level borrows the one above it, so a frame can never outlive its
// renderer and a renderer can never outlive its backend.

use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::backend::VulkanBackend;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::hint::Hint;

/// Identifies the application to the graphics driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub name: String,
    pub version: u32,
}

impl ApplicationInfo {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// A device a renderer can be created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// Position in the driver's enumeration order; stable for a given system.
    pub system_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendName {
    Vulkan,
}

pub trait Backend {
    fn name(&self) -> BackendName;

    /// Devices that satisfy the backend's requirements, in system order.
    /// Queried fresh on every call.
    fn suitable_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Creates a renderer on the hinted device, or on the first suitable one.
    fn create_renderer(&self, hints: &[Hint]) -> Result<Box<dyn Renderer + '_>>;
}

pub trait Renderer {
    fn device_info(&self) -> &DeviceInfo;

    /// Builds the swapchain and per-frame resources. Fails when the backend
    /// has no presentation surface.
    fn create_frame(&self) -> Result<Box<dyn Frame + '_>>;
}

/// One presentable frame: `begin`, optionally `clear_color`, then `present`.
pub trait Frame {
    fn begin(&mut self) -> Result<()>;

    /// Color the next presented image is cleared to. Takes effect at `present`.
    fn clear_color(&mut self, rgba: [f32; 4]) -> Result<()>;

    fn present(&mut self) -> Result<()>;
}

pub fn available_backends() -> Vec<BackendName> {
    vec![BackendName::Vulkan]
}

/// Backend without a presentation surface.
pub fn create_backend(
    name: BackendName,
    app: &ApplicationInfo,
    config: RenderConfig,
) -> Result<Box<dyn Backend>> {
    match name {
        BackendName::Vulkan => Ok(Box::new(VulkanBackend::headless(app, config)?)),
    }
}

/// Backend presenting to `window`. The returned backend borrows the window,
/// so the surface cannot outlive it.
pub fn create_surface_backend<'w, W>(
    name: BackendName,
    app: &ApplicationInfo,
    config: RenderConfig,
    window: &'w W,
) -> Result<Box<dyn Backend + 'w>>
where
    W: HasRawDisplayHandle + HasRawWindowHandle,
{
    match name {
        BackendName::Vulkan => Ok(Box::new(VulkanBackend::with_window(app, config, window)?)),
    }
}
