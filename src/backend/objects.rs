// Owned device objects, destroyed in reverse creation order
//
// Construction pushes every handle as soon as it exists. If a later step
// fails the stack is dropped and everything created so far goes away, so a
// half-built frame is never observable.

use ash::vk;

use super::driver::DeviceDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceObject {
    CommandBuffer {
        pool: vk::CommandPool,
        buffer: vk::CommandBuffer,
    },
    Swapchain(vk::SwapchainKHR),
    ImageView(vk::ImageView),
    DepthImage(vk::Image),
    RenderPass(vk::RenderPass),
    Framebuffer(vk::Framebuffer),
    Semaphore(vk::Semaphore),
    Fence(vk::Fence),
}

pub struct DeviceObjects<'d, X: DeviceDriver> {
    device: &'d X,
    owned: Vec<DeviceObject>,
}

impl<'d, X: DeviceDriver> DeviceObjects<'d, X> {
    pub fn new(device: &'d X) -> Self {
        Self {
            device,
            owned: Vec::new(),
        }
    }

    pub fn device(&self) -> &'d X {
        self.device
    }

    pub fn push(&mut self, object: DeviceObject) {
        self.owned.push(object);
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    fn destroy(&self, object: DeviceObject) {
        let device = self.device;
        match object {
            DeviceObject::CommandBuffer { pool, buffer } => device.free_command_buffer(pool, buffer),
            DeviceObject::Swapchain(handle) => device.destroy_swapchain(handle),
            DeviceObject::ImageView(handle) => device.destroy_image_view(handle),
            DeviceObject::DepthImage(handle) => device.destroy_depth_image(handle),
            DeviceObject::RenderPass(handle) => device.destroy_render_pass(handle),
            DeviceObject::Framebuffer(handle) => device.destroy_framebuffer(handle),
            DeviceObject::Semaphore(handle) => device.destroy_semaphore(handle),
            DeviceObject::Fence(handle) => device.destroy_fence(handle),
        }
    }
}

impl<X: DeviceDriver> Drop for DeviceObjects<'_, X> {
    fn drop(&mut self) {
        while let Some(object) = self.owned.pop() {
            self.destroy(object);
        }
    }
}
