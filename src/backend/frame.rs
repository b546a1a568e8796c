// Frame - swapchain, depth buffer and the begin/clear/present cycle
//
// FRAME FLOW:
// 1. begin():   wait for the previous submission, acquire an image,
//               start recording
// 2. clear_color(): remember the color for this image
// 3. present(): record the clearing render pass, submit, wait, present
//
// Exactly one frame is in flight. Every wait is bounded by the sync budget.

use ash::vk;

use super::driver::{DeviceDriver, Driver};
use super::objects::{DeviceObject, DeviceObjects};
use super::render_pass::{self, depth_aspect};
use super::renderer::VulkanRenderer;
use super::swapchain::{self, Swapchain};
use super::sync::{self, FrameSync, WaitBudget};
use crate::error::{FrameProtocolError, RenderError, Result};
use crate::render::Frame;

/// Clear value used for the depth attachment.
const DEPTH_CLEAR: vk::ClearDepthStencilValue = vk::ClearDepthStencilValue {
    depth: 1.0,
    stencil: 0,
};

const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Nothing acquired yet.
    Idle,
    /// An image is acquired and commands are being recorded.
    Recording { image_index: u32 },
    /// The last image was submitted and presented; `begin` starts the next.
    Submitted { image_index: u32 },
}

pub struct VulkanFrame<'r, D: Driver> {
    renderer: &'r VulkanRenderer<'r, D>,
    queue: vk::Queue,
    queue_family: u32,
    swapchain: Swapchain,
    depth_format: vk::Format,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    command_buffer: vk::CommandBuffer,
    sync: FrameSync,
    budget: WaitBudget,
    clear_color: [f32; 4],
    state: FrameState,
    // Last field: released after the device went idle in `drop`
    objects: DeviceObjects<'r, D::Device>,
}

impl<'r, D: Driver> VulkanFrame<'r, D> {
    pub(crate) fn new(renderer: &'r VulkanRenderer<'r, D>) -> Result<Self> {
        let backend = renderer.backend();
        let config = backend.config();
        let surface = backend.surface().ok_or(RenderError::NoValidSurface)?;
        let physical_device = renderer.physical_device();

        let pool = renderer
            .presentation_pool()
            .ok_or_else(|| RenderError::NoSuitableDevice {
                requirement: "a queue family that supports both graphics and presentation".into(),
            })?;

        let depth_format = render_pass::choose_depth_format(&config.depth_formats(), |format| {
            backend.driver().format_properties(physical_device, format)
        })?;

        let device = renderer.logical_device();
        let mut objects = DeviceObjects::new(device);

        let swapchain = swapchain::build(
            backend.driver(),
            &mut objects,
            physical_device,
            Some(surface),
            renderer.queue_families(),
            &config.surface_formats(),
            config.fallback_extent(),
        )?;

        let depth_image = device.create_depth_image(depth_format, swapchain.extent)?;
        objects.push(DeviceObject::DepthImage(depth_image));
        let depth_view = device.create_image_view(depth_image, depth_format, depth_aspect(depth_format))?;
        objects.push(DeviceObject::ImageView(depth_view));

        let render_pass =
            render_pass::build_render_pass(&mut objects, swapchain.format.format, depth_format)?;
        let framebuffers = render_pass::build_frame_buffers(
            &mut objects,
            render_pass,
            &swapchain.image_views,
            depth_view,
            swapchain.extent,
        )?;

        let command_buffer = device.allocate_command_buffer(pool.pool)?;
        objects.push(DeviceObject::CommandBuffer {
            pool: pool.pool,
            buffer: command_buffer,
        });
        let sync = FrameSync::new(&mut objects)?;

        log::info!(
            "Frame ready: {} images, depth {:?}, queue family {}",
            swapchain.images.len(),
            depth_format,
            pool.family_index
        );

        Ok(Self {
            renderer,
            queue: device.queue(pool.family_index, 0),
            queue_family: pool.family_index,
            swapchain,
            depth_format,
            render_pass,
            framebuffers,
            command_buffer,
            sync,
            budget: WaitBudget::from(&config.sync),
            clear_color: DEFAULT_CLEAR_COLOR,
            state: FrameState::Idle,
            objects,
        })
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Number of device objects this frame owns.
    pub fn owned_objects(&self) -> usize {
        self.objects.len()
    }

    fn device(&self) -> &'r D::Device {
        self.renderer.logical_device()
    }

    fn begin_frame(&mut self) -> Result<()> {
        if let FrameState::Recording { .. } = self.state {
            return Err(FrameProtocolError::AlreadyRecording.into());
        }

        let device = self.device();
        sync::wait_for_fence(device, self.sync.in_flight_fence, self.budget, "previous frame")?;

        let image_index = sync::acquire_image(
            device,
            self.swapchain.handle,
            self.sync.image_available,
            self.budget,
        )?;
        if let Err(e) = device.begin_commands(self.command_buffer) {
            return Err(self.abandon_image(e));
        }

        self.state = FrameState::Recording { image_index };
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) -> Result<()> {
        if let FrameState::Submitted { .. } = self.state {
            return Err(FrameProtocolError::AlreadySubmitted.into());
        }
        self.clear_color = rgba;
        Ok(())
    }

    fn present_frame(&mut self) -> Result<()> {
        let image_index = match self.state {
            FrameState::Idle => return Err(FrameProtocolError::NoActiveFrame.into()),
            FrameState::Submitted { .. } => return Err(FrameProtocolError::AlreadySubmitted.into()),
            FrameState::Recording { image_index } => image_index,
        };

        // A failed recording cannot be resumed; the next begin() starts over
        self.state = FrameState::Idle;
        if let Err(e) = self.record_and_submit(image_index) {
            return Err(self.abandon_image(e));
        }
        self.state = FrameState::Submitted { image_index };

        let device = self.device();
        sync::wait_for_fence(device, self.sync.in_flight_fence, self.budget, "frame submission")?;

        let suboptimal = device.present(
            self.queue,
            self.swapchain.handle,
            image_index,
            self.sync.render_finished,
        )?;
        if suboptimal {
            log::warn!("Swapchain is suboptimal for the surface; presentation continues");
        }

        Ok(())
    }

    /// Puts the sync objects back into the state `begin` expects after an
    /// acquired image was never submitted: an empty batch consumes the
    /// acquire semaphore and signals the in-flight fence.
    fn abandon_image(&self, error: RenderError) -> RenderError {
        if error.is_fatal() {
            return error;
        }

        let device = self.device();
        let fence = self.sync.in_flight_fence;
        let released = device
            .reset_fence(fence)
            .and_then(|()| device.signal_fence(self.queue, self.sync.image_available, fence));

        match released {
            Ok(()) => log::warn!("Dropped the acquired image after: {}", error),
            Err(e) => log::error!("Frame sync not released after '{}': {}", error, e),
        }
        error
    }

    fn record_and_submit(&self, image_index: u32) -> Result<()> {
        let device = self.device();
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .copied()
            .ok_or(RenderError::Driver {
                call: "vkAcquireNextImageKHR",
                result: vk::Result::ERROR_UNKNOWN,
            })?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: DEPTH_CLEAR,
            },
        ];

        device.record_clear_pass(
            self.command_buffer,
            self.render_pass,
            framebuffer,
            self.swapchain.extent,
            &clear_values,
        );
        device.end_commands(self.command_buffer)?;

        device.reset_fence(self.sync.in_flight_fence)?;
        device.submit(
            self.queue,
            self.command_buffer,
            self.sync.image_available,
            self.sync.render_finished,
            self.sync.in_flight_fence,
        )
    }
}

impl<D: Driver> Drop for VulkanFrame<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.device().wait_idle() {
            log::warn!("Device did not go idle before frame teardown: {}", e);
        }
    }
}

impl<D: Driver + 'static> Frame for VulkanFrame<'_, D> {
    fn begin(&mut self) -> Result<()> {
        self.begin_frame()
    }

    fn clear_color(&mut self, rgba: [f32; 4]) -> Result<()> {
        self.set_clear_color(rgba)
    }

    fn present(&mut self) -> Result<()> {
        self.present_frame()
    }
}
