// Graphics driver seam
//
// `Driver` is the instance-level service: physical device enumeration,
// capability/format queries and logical device creation. `DeviceDriver` is
// the device-level resource factory plus submission and presentation.
//
// Handles are plain ash handles. Create-info structs never cross the seam;
// the negotiation code hands over plain descriptors (`QueueRequest`,
// `SwapchainDescriptor`, `RenderPassLayout`) and the implementation turns
// them into API calls.

use ash::vk;
use std::time::Duration;

use super::render_pass::RenderPassLayout;
use super::swapchain::SwapchainDescriptor;
use crate::error::Result;

/// Identity of a physical device as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceProperties {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
}

/// Queues requested from one family at device creation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    pub family_index: u32,
    pub priorities: Vec<f32>,
}

pub trait Driver {
    type Device: DeviceDriver;

    /// Physical devices in stable enumeration order.
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>>;

    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> PhysicalDeviceProperties;

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool>;

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<String>>;

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>>;

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR>;

    fn format_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties;

    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        queues: &[QueueRequest],
        extensions: &[String],
    ) -> Result<Self::Device>;

    fn destroy_surface(&self, surface: vk::SurfaceKHR);
}

pub trait DeviceDriver {
    fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue;

    fn create_command_pool(&self, family_index: u32) -> Result<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffer(&self, pool: vk::CommandPool) -> Result<vk::CommandBuffer>;
    fn free_command_buffer(&self, pool: vk::CommandPool, command_buffer: vk::CommandBuffer);

    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    /// Optimal-tiling 2D depth image with its backing memory bound.
    fn create_depth_image(&self, format: vk::Format, extent: vk::Extent2D) -> Result<vk::Image>;
    fn destroy_depth_image(&self, image: vk::Image);

    fn create_render_pass(&self, layout: &RenderPassLayout) -> Result<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    /// `Ok(false)` when `timeout` elapsed before the fence signalled.
    fn wait_for_fence(&self, fence: vk::Fence, timeout: Duration) -> Result<bool>;
    fn reset_fence(&self, fence: vk::Fence) -> Result<()>;

    /// `Ok(None)` when no image became available within `timeout`.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: Duration,
        signal: vk::Semaphore,
    ) -> Result<Option<u32>>;

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;
    /// Records a render pass that only clears its attachments.
    fn record_clear_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    );
    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;

    fn submit(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()>;

    /// Submits an empty batch that waits on `wait` and signals `fence`.
    fn signal_fence(&self, queue: vk::Queue, wait: vk::Semaphore, fence: vk::Fence) -> Result<()>;

    /// Returns true when the presentation was suboptimal.
    fn present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool>;

    fn wait_idle(&self) -> Result<()>;
}
