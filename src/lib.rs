// vk-present - device negotiation and frame presentation over Vulkan
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  Backend (instance, surface, render policy)                     │
// │    └── Renderer (logical device, queues, command pools)         │
// │          └── Frame (swapchain, depth, render pass, sync)        │
// │                └── begin → clear_color → present                │
// └─────────────────────────────────────────────────────────────────┘

pub mod backend;
pub mod config;
pub mod error;
pub mod hint;
pub mod render;

pub use config::{Config, RenderConfig};
pub use error::{FrameProtocolError, RenderError, Result};
pub use hint::{Hint, HintName, HintValue};
pub use render::{
    available_backends, create_backend, create_surface_backend, ApplicationInfo, Backend,
    BackendName, DeviceInfo, Frame, Renderer,
};
