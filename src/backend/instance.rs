// Vulkan backend - instance, surface and device discovery
//
// Holds the driver, the optional presentation surface and the render policy.
// Suitable devices are enumerated fresh on every query.

use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use super::ash_driver::AshDriver;
use super::driver::Driver;
use super::renderer::VulkanRenderer;
use super::selector::{self, PhysicalDeviceCandidate};
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::hint::{Hint, SelectionHint};
use crate::render::{ApplicationInfo, Backend, BackendName, DeviceInfo, Renderer};

pub struct VulkanBackend<D: Driver = AshDriver> {
    config: RenderConfig,
    surface: Option<vk::SurfaceKHR>,
    driver: D,
}

impl VulkanBackend<AshDriver> {
    /// Rendering without a window is not supported yet.
    pub fn headless(app: &ApplicationInfo, _config: RenderConfig) -> Result<Self> {
        log::warn!("{} requested a headless Vulkan backend", app.name);
        Err(RenderError::NotImplemented("headless rendering"))
    }

    /// Instance plus a surface for `window`. Only the raw handles are kept:
    /// the caller keeps the window alive for as long as the backend exists.
    /// `create_surface_backend` ties the two lifetimes together.
    pub fn with_window<W>(app: &ApplicationInfo, config: RenderConfig, window: &W) -> Result<Self>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle,
    {
        let display = window.raw_display_handle();
        let driver = AshDriver::new(app, &config, display)?;
        let surface = driver.create_surface(display, window.raw_window_handle())?;

        Ok(Self::from_driver(driver, Some(surface), config))
    }
}

impl<D: Driver> VulkanBackend<D> {
    /// Wraps an already created driver. The backend takes ownership of
    /// `surface` and destroys it on drop.
    pub fn from_driver(driver: D, surface: Option<vk::SurfaceKHR>, config: RenderConfig) -> Self {
        Self {
            config,
            surface,
            driver,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn suitable_physical_devices(&self) -> Result<Vec<PhysicalDeviceCandidate>> {
        selector::enumerate_suitable(
            &self.driver,
            self.surface,
            &self.config.device_types(),
            &self.config.queue_flags(),
        )
    }

    /// Configured device extensions, plus swapchain support when presenting.
    pub fn required_device_extensions(&self) -> Vec<String> {
        let mut extensions = self.config.device.extensions.clone();
        if self.surface.is_some() {
            let swapchain = ash::extensions::khr::Swapchain::name()
                .to_string_lossy()
                .into_owned();
            if !extensions.contains(&swapchain) {
                extensions.push(swapchain);
            }
        }
        extensions
    }

    /// Creates a renderer on the hinted device, falling back to the first
    /// suitable one.
    pub fn renderer(&self, hints: &[Hint]) -> Result<VulkanRenderer<'_, D>> {
        let candidates = self.suitable_physical_devices()?;
        let hint = SelectionHint::from_hints(hints);

        let candidate = selector::choose(&candidates, hint.as_ref())
            .ok_or_else(|| RenderError::NoSuitableDevice {
                requirement: self.requirement(),
            })?;

        VulkanRenderer::new(self, candidate)
    }

    fn requirement(&self) -> String {
        let mut requirement = format!(
            "one of {:?} with queue families for {:?}",
            self.config.device_types(),
            self.config.queue_flags()
        );
        if self.surface.is_some() {
            requirement.push_str(" and presentation support");
        }
        requirement
    }
}

impl<D: Driver> Drop for VulkanBackend<D> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
        }
    }
}

impl<D: Driver + 'static> Backend for VulkanBackend<D> {
    fn name(&self) -> BackendName {
        BackendName::Vulkan
    }

    fn suitable_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self
            .suitable_physical_devices()?
            .into_iter()
            .map(|candidate| DeviceInfo {
                name: candidate.name,
                system_index: candidate.system_index,
            })
            .collect())
    }

    fn create_renderer(&self, hints: &[Hint]) -> Result<Box<dyn Renderer + '_>> {
        Ok(Box::new(self.renderer(hints)?))
    }
}
