// Backend module - Vulkan variant of the rendering surface
//
// Design: negotiation logic is written against the `Driver` traits; the ash
// implementation is one driver among possibly several (tests use a scripted one)

pub mod ash_driver;
pub mod capability;
pub mod device;
pub mod driver;
pub mod frame;
pub mod instance;
pub mod objects;
pub mod render_pass;
pub mod renderer;
pub mod selector;
pub mod swapchain;
pub mod sync;

pub use ash_driver::{AshDevice, AshDriver};
pub use driver::{DeviceDriver, Driver, PhysicalDeviceProperties, QueueRequest};
pub use frame::{FrameState, VulkanFrame};
pub use instance::VulkanBackend;
pub use renderer::VulkanRenderer;
pub use swapchain::Swapchain;
