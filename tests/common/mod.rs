// Scripted in-memory driver: no GPU required.
//
// Handles are fake raw values. Every created device object is tracked until
// it is destroyed so tests can check for leaks and double frees.

#![allow(dead_code)]

use ash::vk::{self, Handle};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use vk_present::backend::render_pass::RenderPassLayout;
use vk_present::backend::swapchain::SwapchainDescriptor;
use vk_present::backend::{DeviceDriver, Driver, PhysicalDeviceProperties, QueueRequest, VulkanBackend};
use vk_present::config::RenderConfig;
use vk_present::error::{RenderError, Result};

pub const SURFACE_RAW: u64 = 0x5ace;
pub const SWAPCHAIN_IMAGES: u32 = 3;

#[derive(Debug, Clone)]
pub struct QueueFamilySpec {
    pub flags: vk::QueueFlags,
    pub count: u32,
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct GpuSpec {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub families: Vec<QueueFamilySpec>,
    pub extensions: Vec<String>,
    /// Formats usable as optimal-tiling depth attachments.
    pub depth_formats: Vec<vk::Format>,
}

impl GpuSpec {
    /// A discrete GPU with one family that can do everything.
    pub fn discrete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            families: vec![QueueFamilySpec {
                flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                count: 4,
                present: true,
            }],
            extensions: vec!["VK_KHR_swapchain".to_string()],
            depth_formats: vec![vk::Format::D32_SFLOAT, vk::Format::D24_UNORM_S8_UINT],
        }
    }

    pub fn with_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_families(mut self, families: &[(vk::QueueFlags, u32, bool)]) -> Self {
        self.families = families
            .iter()
            .map(|&(flags, count, present)| QueueFamilySpec {
                flags,
                count,
                present,
            })
            .collect();
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn with_depth_formats(mut self, formats: &[vk::Format]) -> Self {
        self.depth_formats = formats.to_vec();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceMode {
    Signal,
    Timeout,
    DeviceLost,
}

#[derive(Debug)]
pub struct MockState {
    next_handle: u64,
    /// Live device objects: raw handle -> kind.
    pub live: BTreeMap<u64, &'static str>,
    pub double_destroys: u32,
    /// Creations so far, per kind.
    pub created: BTreeMap<&'static str, u32>,
    /// `(kind, n)`: the n-th creation of `kind` fails.
    pub fail_create: Option<(&'static str, u32)>,
    pub destroyed_surfaces: Vec<u64>,
    pub enumerations: u32,
    pub surface_support_queries: Vec<(u64, u32)>,
    pub queue_requests: Vec<QueueRequest>,
    pub requested_extensions: Vec<String>,
    pub devices_created: u32,
    pub devices_destroyed: u32,
    pub swapchain_descriptors: Vec<SwapchainDescriptor>,
    pub fence_mode: FenceMode,
    pub fence_waits: u32,
    pub fence_resets: u32,
    pub signaled_fences: BTreeSet<u64>,
    /// The acquire semaphore holds a signal nobody has waited on yet.
    pub acquire_pending: bool,
    /// Acquires that signalled an already signalled semaphore.
    pub acquire_overruns: u32,
    pub image_ready: bool,
    pub fail_begin_commands: bool,
    pub fail_submit: Option<vk::Result>,
    pub empty_submits: u32,
    pub suboptimal: bool,
    pub clear_colors: Vec<[f32; 4]>,
    pub submits: u32,
    pub presents: Vec<u32>,
    pub wait_idles: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_handle: 0x1000,
            live: BTreeMap::new(),
            double_destroys: 0,
            created: BTreeMap::new(),
            fail_create: None,
            destroyed_surfaces: Vec::new(),
            enumerations: 0,
            surface_support_queries: Vec::new(),
            queue_requests: Vec::new(),
            requested_extensions: Vec::new(),
            devices_created: 0,
            devices_destroyed: 0,
            swapchain_descriptors: Vec::new(),
            fence_mode: FenceMode::Signal,
            fence_waits: 0,
            fence_resets: 0,
            signaled_fences: BTreeSet::new(),
            acquire_pending: false,
            acquire_overruns: 0,
            image_ready: true,
            fail_begin_commands: false,
            fail_submit: None,
            empty_submits: 0,
            suboptimal: false,
            clear_colors: Vec::new(),
            submits: 0,
            presents: Vec::new(),
            wait_idles: 0,
        }
    }
}

impl MockState {
    fn create(&mut self, kind: &'static str) -> Result<u64> {
        let count = self.created.entry(kind).or_insert(0);
        *count += 1;
        if self.fail_create == Some((kind, *count)) {
            return Err(RenderError::Driver {
                call: kind,
                result: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            });
        }

        self.next_handle += 1;
        self.live.insert(self.next_handle, kind);
        Ok(self.next_handle)
    }

    fn destroy(&mut self, raw: u64) {
        if self.live.remove(&raw).is_none() {
            self.double_destroys += 1;
        }
    }

    pub fn live_count(&self, kind: &str) -> usize {
        self.live.values().filter(|live| **live == kind).count()
    }
}

pub type Shared = Rc<RefCell<MockState>>;

pub struct MockDriver {
    gpus: Vec<GpuSpec>,
    surface_formats: Vec<vk::SurfaceFormatKHR>,
    surface_caps: vk::SurfaceCapabilitiesKHR,
    state: Shared,
}

impl MockDriver {
    pub fn new(gpus: Vec<GpuSpec>) -> Self {
        Self {
            gpus,
            surface_formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            surface_caps: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 640,
                    height: 480,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    pub fn with_surface_formats(mut self, formats: &[vk::Format]) -> Self {
        self.surface_formats = formats
            .iter()
            .map(|&format| vk::SurfaceFormatKHR {
                format,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            })
            .collect();
        self
    }

    pub fn state(&self) -> Shared {
        Rc::clone(&self.state)
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> &GpuSpec {
        &self.gpus[physical_device.as_raw() as usize - 1]
    }
}

impl Driver for MockDriver {
    type Device = MockDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        self.state.borrow_mut().enumerations += 1;
        Ok((1..=self.gpus.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> PhysicalDeviceProperties {
        let gpu = self.gpu(physical_device);
        PhysicalDeviceProperties {
            name: gpu.name.clone(),
            device_type: gpu.device_type,
        }
    }

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.gpu(physical_device)
            .families
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: family.flags,
                queue_count: family.count,
                ..Default::default()
            })
            .collect()
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        assert_eq!(surface.as_raw(), SURFACE_RAW);
        self.state
            .borrow_mut()
            .surface_support_queries
            .push((physical_device.as_raw(), family_index));
        Ok(self.gpu(physical_device).families[family_index as usize].present)
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<String>> {
        Ok(self.gpu(physical_device).extensions.clone())
    }

    fn surface_formats(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.surface_formats.clone())
    }

    fn surface_capabilities(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(self.surface_caps)
    }

    fn format_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties {
        let supported = self.gpu(physical_device).depth_formats.contains(&format);
        vk::FormatProperties {
            optimal_tiling_features: if supported {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::FormatFeatureFlags::empty()
            },
            ..Default::default()
        }
    }

    fn create_device(
        &self,
        _physical_device: vk::PhysicalDevice,
        queues: &[QueueRequest],
        extensions: &[String],
    ) -> Result<MockDevice> {
        let mut state = self.state.borrow_mut();
        state.queue_requests = queues.to_vec();
        state.requested_extensions = extensions.to_vec();
        state.devices_created += 1;

        Ok(MockDevice {
            state: Rc::clone(&self.state),
        })
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        self.state
            .borrow_mut()
            .destroyed_surfaces
            .push(surface.as_raw());
    }
}

pub struct MockDevice {
    state: Shared,
}

impl MockDevice {
    fn create<H: Handle>(&self, kind: &'static str) -> Result<H> {
        Ok(H::from_raw(self.state.borrow_mut().create(kind)?))
    }

    fn destroy<H: Handle>(&self, handle: H) {
        self.state.borrow_mut().destroy(handle.as_raw());
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.state.borrow_mut().devices_destroyed += 1;
    }
}

impl DeviceDriver for MockDevice {
    fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x9000 + u64::from(family_index) * 16 + u64::from(queue_index))
    }

    fn create_command_pool(&self, _family_index: u32) -> Result<vk::CommandPool> {
        self.create("command_pool")
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.destroy(pool);
    }

    fn allocate_command_buffer(&self, _pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        self.create("command_buffer")
    }

    fn free_command_buffer(&self, _pool: vk::CommandPool, command_buffer: vk::CommandBuffer) {
        self.destroy(command_buffer);
    }

    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR> {
        assert_eq!(surface.as_raw(), SURFACE_RAW);
        self.state
            .borrow_mut()
            .swapchain_descriptors
            .push(descriptor.clone());
        self.create("swapchain")
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok((0..u64::from(SWAPCHAIN_IMAGES))
            .map(|i| vk::Image::from_raw((swapchain.as_raw() << 8) + i))
            .collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.destroy(swapchain);
    }

    fn create_image_view(
        &self,
        _image: vk::Image,
        _format: vk::Format,
        _aspect: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        self.create("image_view")
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(view);
    }

    fn create_depth_image(&self, _format: vk::Format, _extent: vk::Extent2D) -> Result<vk::Image> {
        self.create("depth_image")
    }

    fn destroy_depth_image(&self, image: vk::Image) {
        self.destroy(image);
    }

    fn create_render_pass(&self, _layout: &RenderPassLayout) -> Result<vk::RenderPass> {
        self.create("render_pass")
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(render_pass);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        _extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        assert_eq!(attachments.len(), 2, "color + depth");
        self.create("framebuffer")
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(framebuffer);
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        self.create("semaphore")
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.destroy(semaphore);
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let fence: vk::Fence = self.create("fence")?;
        if signaled {
            self.state.borrow_mut().signaled_fences.insert(fence.as_raw());
        }
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.destroy(fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: Duration) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        state.fence_waits += 1;
        match state.fence_mode {
            FenceMode::Signal => Ok(state.signaled_fences.contains(&fence.as_raw())),
            FenceMode::Timeout => Ok(false),
            FenceMode::DeviceLost => Err(RenderError::DeviceLost {
                during: "vkWaitForFences",
            }),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.fence_resets += 1;
        state.signaled_fences.remove(&fence.as_raw());
        Ok(())
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        _timeout: Duration,
        _signal: vk::Semaphore,
    ) -> Result<Option<u32>> {
        let mut state = self.state.borrow_mut();
        if !state.image_ready {
            return Ok(None);
        }
        if state.acquire_pending {
            state.acquire_overruns += 1;
        }
        state.acquire_pending = true;
        Ok(Some(state.presents.len() as u32 % SWAPCHAIN_IMAGES))
    }

    fn begin_commands(&self, _command_buffer: vk::CommandBuffer) -> Result<()> {
        if self.state.borrow().fail_begin_commands {
            return Err(RenderError::from_vk(
                "vkBeginCommandBuffer",
                vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            ));
        }
        Ok(())
    }

    fn record_clear_pass(
        &self,
        _command_buffer: vk::CommandBuffer,
        _render_pass: vk::RenderPass,
        _framebuffer: vk::Framebuffer,
        _extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        assert_eq!(clear_values.len(), 2, "color + depth clear values");
        let color = unsafe { clear_values[0].color.float32 };
        self.state.borrow_mut().clear_colors.push(color);
    }

    fn end_commands(&self, _command_buffer: vk::CommandBuffer) -> Result<()> {
        Ok(())
    }

    fn submit(
        &self,
        _queue: vk::Queue,
        _command_buffer: vk::CommandBuffer,
        _wait: vk::Semaphore,
        _signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(result) = state.fail_submit {
            return Err(RenderError::from_vk("vkQueueSubmit", result));
        }
        state.submits += 1;
        state.acquire_pending = false;
        state.signaled_fences.insert(fence.as_raw());
        Ok(())
    }

    fn signal_fence(&self, _queue: vk::Queue, _wait: vk::Semaphore, fence: vk::Fence) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.empty_submits += 1;
        state.acquire_pending = false;
        state.signaled_fences.insert(fence.as_raw());
        Ok(())
    }

    fn present(
        &self,
        _queue: vk::Queue,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        _wait: vk::Semaphore,
    ) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        state.presents.push(image_index);
        Ok(state.suboptimal)
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.borrow_mut().wait_idles += 1;
        Ok(())
    }
}

pub fn surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(SURFACE_RAW)
}

/// Backend over `driver`, presenting to the fake surface.
pub fn surface_backend(driver: MockDriver, config: RenderConfig) -> (VulkanBackend<MockDriver>, Shared) {
    let state = driver.state();
    (VulkanBackend::from_driver(driver, Some(surface()), config), state)
}

/// Backend over `driver` without a presentation surface.
pub fn surfaceless_backend(driver: MockDriver, config: RenderConfig) -> (VulkanBackend<MockDriver>, Shared) {
    let state = driver.state();
    (VulkanBackend::from_driver(driver, None, config), state)
}

/// Tight wait budget so timeout paths finish quickly.
pub fn quick_config() -> RenderConfig {
    let mut config = RenderConfig::default();
    config.sync.wait_slice_ms = 1;
    config.sync.max_wait_attempts = 3;
    config
}
