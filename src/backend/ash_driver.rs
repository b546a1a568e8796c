// Ash driver - the production `Driver`/`DeviceDriver` over a real Vulkan ICD
//
// Responsibilities:
// - Library loading, instance creation with validation layers
// - Debug messenger routing validation output into `log`
// - Surface creation from raw window handles (ash-window)
// - Logical device, swapchain loader and depth memory (gpu-allocator)
//
// Everything above this file talks to the `Driver` traits only.

use ash::extensions::{ext::DebugUtils, khr};
use ash::{vk, Entry};
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::time::Duration;

use super::capability::{self, fixed_name};
use super::driver::{DeviceDriver, Driver, PhysicalDeviceProperties, QueueRequest};
use super::render_pass::RenderPassLayout;
use super::swapchain::SwapchainDescriptor;
use crate::config::RenderConfig;
use crate::error::{CapabilityScope, RenderError, Result, VkResultExt};
use crate::render::ApplicationInfo;

const ENGINE_NAME: &str = "vk-present";

/// Instance-level driver: owns the loader, the instance and the debug messenger.
pub struct AshDriver {
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    surface_loader: khr::Surface,
    instance: ash::Instance,
    entry: Entry,
}

impl AshDriver {
    /// Loads Vulkan and creates an instance able to present to `display`.
    ///
    /// Missing layers and extensions are reported together before the
    /// instance is created.
    pub fn new(app: &ApplicationInfo, config: &RenderConfig, display: RawDisplayHandle) -> Result<Self> {
        log::info!("Creating Vulkan instance for {}", app.name);

        let entry = unsafe { Entry::load() }?;

        let layers = config.validation_layers();
        let mut extensions: Vec<String> = ash_window::enumerate_required_extensions(display)
            .during("vkEnumerateInstanceExtensionProperties")?
            .iter()
            .map(|&name| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
            .collect();
        if config.debug.validation {
            extensions.push(DebugUtils::name().to_string_lossy().into_owned());
        }

        let available_layers = capability::layer_names(
            &unsafe { entry.enumerate_instance_layer_properties() }
                .during("vkEnumerateInstanceLayerProperties")?,
        );
        let available_extensions = capability::extension_names(
            &unsafe { entry.enumerate_instance_extension_properties(None) }
                .during("vkEnumerateInstanceExtensionProperties")?,
        );
        capability::ensure_available(
            CapabilityScope::Instance,
            &available_layers,
            &layers,
            &available_extensions,
            &extensions,
        )?;

        let instance = create_instance(&entry, app, &layers, &extensions)?;

        let debug_utils = if config.debug.validation {
            match setup_debug_messenger(&entry, &instance) {
                Ok(debug_utils) => Some(debug_utils),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = khr::Surface::new(&entry, &instance);

        Ok(Self {
            debug_utils,
            surface_loader,
            instance,
            entry,
        })
    }

    /// Creates a presentation surface for a live window.
    ///
    /// The window behind the handles must outlive the returned surface.
    pub fn create_surface(
        &self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR> {
        unsafe { ash_window::create_surface(&self.entry, &self.instance, display, window, None) }
            .during("vkCreateSurfaceKHR")
    }
}

impl Driver for AshDriver {
    type Device = AshDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }.during("vkEnumeratePhysicalDevices")
    }

    fn device_properties(&self, physical_device: vk::PhysicalDevice) -> PhysicalDeviceProperties {
        let props = unsafe { self.instance.get_physical_device_properties(physical_device) };
        PhysicalDeviceProperties {
            name: fixed_name(&props.device_name),
            device_type: props.device_type,
        }
    }

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(physical_device)
        }
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, family_index, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceSupportKHR")
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<String>> {
        let props = unsafe {
            self.instance
                .enumerate_device_extension_properties(physical_device)
        }
        .during("vkEnumerateDeviceExtensionProperties")?;
        Ok(capability::extension_names(&props))
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceFormatsKHR")
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
    }

    fn format_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(physical_device, format)
        }
    }

    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        queues: &[QueueRequest],
        extensions: &[String],
    ) -> Result<AshDevice> {
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queues
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(request.family_index)
                    .queue_priorities(&request.priorities)
                    .build()
            })
            .collect();

        let extensions = to_cstrings(extensions);
        let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs);

        let device = unsafe {
            self.instance
                .create_device(physical_device, &create_info, None)
        }
        .during("vkCreateDevice")?;

        AshDevice::new(&self.instance, physical_device, device)
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe { self.surface_loader.destroy_surface(surface, None) };
    }
}

impl Drop for AshDriver {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");

        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Depth images and the memory backing them.
struct DepthMemory {
    allocator: Allocator,
    allocations: HashMap<vk::Image, Allocation>,
}

/// Device-level driver: the logical device plus its loaders and allocator.
pub struct AshDevice {
    // Dropped explicitly before the device goes away
    memory: Option<Mutex<DepthMemory>>,
    swapchain_loader: khr::Swapchain,
    device: ash::Device,
}

impl AshDevice {
    fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Result<Self> {
        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        let swapchain_loader = khr::Swapchain::new(instance, &device);

        Ok(Self {
            memory: Some(Mutex::new(DepthMemory {
                allocator,
                allocations: HashMap::new(),
            })),
            swapchain_loader,
            device,
        })
    }

    /// Raw ash device, for callers recording their own commands.
    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    fn allocate_depth_memory(&self, image: vk::Image) -> Result<()> {
        let memory = self.memory.as_ref().ok_or(RenderError::Driver {
            call: "vkAllocateMemory",
            result: vk::Result::ERROR_INITIALIZATION_FAILED,
        })?;
        let mut memory = memory.lock();

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = memory.allocator.allocate(&AllocationCreateDesc {
            name: "depth buffer",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        let bound = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        if let Err(result) = bound {
            if let Err(e) = memory.allocator.free(allocation) {
                log::warn!("Failed to release depth memory: {}", e);
            }
            return Err(RenderError::from_vk("vkBindImageMemory", result));
        }

        memory.allocations.insert(image, allocation);
        Ok(())
    }
}

impl DeviceDriver for AshDevice {
    fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(family_index, queue_index) }
    }

    fn create_command_pool(&self, family_index: u32) -> Result<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(family_index);

        unsafe { self.device.create_command_pool(&create_info, None) }
            .during("vkCreateCommandPool")
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn allocate_command_buffer(&self, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .during("vkAllocateCommandBuffers")?
            .pop()
            .ok_or(RenderError::Driver {
                call: "vkAllocateCommandBuffers",
                result: vk::Result::ERROR_UNKNOWN,
            })
    }

    fn free_command_buffer(&self, pool: vk::CommandPool, command_buffer: vk::CommandBuffer) {
        unsafe { self.device.free_command_buffers(pool, &[command_buffer]) };
    }

    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(descriptor.min_image_count)
            .image_format(descriptor.format.format)
            .image_color_space(descriptor.format.color_space)
            .image_extent(descriptor.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&descriptor.sharing_families)
            .pre_transform(descriptor.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(descriptor.present_mode)
            .clipped(true);

        unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .during("vkCreateSwapchainKHR")
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .during("vkGetSwapchainImagesKHR")
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&create_info, None) }.during("vkCreateImageView")
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_depth_image(&self, format: vk::Format, extent: vk::Extent2D) -> Result<vk::Image> {
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image =
            unsafe { self.device.create_image(&create_info, None) }.during("vkCreateImage")?;

        if let Err(e) = self.allocate_depth_memory(image) {
            unsafe { self.device.destroy_image(image, None) };
            return Err(e);
        }

        Ok(image)
    }

    fn destroy_depth_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };

        if let Some(memory) = &self.memory {
            let mut memory = memory.lock();
            if let Some(allocation) = memory.allocations.remove(&image) {
                if let Err(e) = memory.allocator.free(allocation) {
                    log::warn!("Failed to release depth memory: {}", e);
                }
            }
        }
    }

    fn create_render_pass(&self, layout: &RenderPassLayout) -> Result<vk::RenderPass> {
        let attachments = [layout.color, layout.depth];
        let color_refs = [layout.color_ref];

        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&layout.depth_ref)
            .build();
        let dependencies = [layout.dependency];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        unsafe { self.device.create_render_pass(&create_info, None) }.during("vkCreateRenderPass")
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        unsafe { self.device.create_framebuffer(&create_info, None) }.during("vkCreateFramebuffer")
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        unsafe { self.device.create_semaphore(&create_info, None) }.during("vkCreateSemaphore")
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        unsafe { self.device.create_fence(&create_info, None) }.during("vkCreateFence")
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: Duration) -> Result<bool> {
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        match unsafe { self.device.wait_for_fences(&[fence], true, nanos) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(result) => Err(RenderError::from_vk("vkWaitForFences", result)),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { self.device.reset_fences(&[fence]) }.during("vkResetFences")
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: Duration,
        signal: vk::Semaphore,
    ) -> Result<Option<u32>> {
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        let result = unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, nanos, signal, vk::Fence::null())
        };

        match result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    log::debug!("Acquired image {} from a suboptimal swapchain", index);
                }
                Ok(Some(index))
            }
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(None),
            Err(result) => Err(RenderError::from_vk("vkAcquireNextImageKHR", result)),
        }
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
        }
        .during("vkResetCommandBuffer")?;

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(command_buffer, &begin_info) }
            .during("vkBeginCommandBuffer")
    }

    fn record_clear_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            self.device.cmd_end_render_pass(command_buffer);
        }
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe { self.device.end_command_buffer(command_buffer) }.during("vkEndCommandBuffer")
    }

    fn submit(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [signal];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe { self.device.queue_submit(queue, &[submit_info], fence) }.during("vkQueueSubmit")
    }

    fn signal_fence(&self, queue: vk::Queue, wait: vk::Semaphore, fence: vk::Fence) -> Result<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .build();

        unsafe { self.device.queue_submit(queue, &[submit_info], fence) }.during("vkQueueSubmit")
    }

    fn present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
            .during("vkQueuePresentKHR")
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.during("vkDeviceWaitIdle")
    }
}

impl Drop for AshDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        // Allocator frees its memory blocks through the device
        if let Some(memory) = self.memory.take() {
            let memory = memory.into_inner();
            if !memory.allocations.is_empty() {
                log::warn!("{} depth images still alive at device teardown", memory.allocations.len());
            }
            drop(memory);
        }

        unsafe { self.device.destroy_device(None) };
    }
}

fn create_instance(
    entry: &Entry,
    app: &ApplicationInfo,
    layers: &[String],
    extensions: &[String],
) -> Result<ash::Instance> {
    let app_name = to_cstring(&app.name);
    let engine_name = to_cstring(ENGINE_NAME);

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .application_version(app.version)
        .engine_name(&engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_3);

    let layers = to_cstrings(layers);
    let layer_ptrs: Vec<_> = layers.iter().map(|name| name.as_ptr()).collect();
    let extensions = to_cstrings(extensions);
    let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs);

    unsafe { entry.create_instance(&create_info, None) }.during("vkCreateInstance")
}

fn setup_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = DebugUtils::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
        .during("vkCreateDebugUtilsMessengerEXT")?;

    Ok((debug_utils, messenger))
}

fn to_cstring(name: &str) -> CString {
    CString::new(name.replace('\0', "")).unwrap_or_default()
}

fn to_cstrings(names: &[String]) -> Vec<CString> {
    names.iter().map(|name| to_cstring(name)).collect()
}

// Validation layer output goes through `log`
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan {:?}] {}", message_type, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan {:?}] {}", message_type, message);
        }
        _ => {
            log::debug!("[Vulkan {:?}] {}", message_type, message);
        }
    }

    vk::FALSE
}
