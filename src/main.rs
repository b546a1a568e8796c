// =============================================================================
// VK-PRESENT DEMO - clear a window to a color, one frame at a time
// =============================================================================
//
// FRAME FLOW:
// 1. Wait for the previous frame, acquire a swapchain image  (begin)
// 2. Set the clear color                                       (clear_color)
// 3. Record the clearing render pass, submit, present          (present)
//
// Set VK_PRESENT_DEVICE to a GPU index or name to pick a device.
//
// =============================================================================

use anyhow::{Context, Result};
use vk_present::{
    available_backends, create_surface_backend, ApplicationInfo, BackendName, Config, Frame,
    Hint, RenderError,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

const DEVICE_ENV: &str = "VK_PRESENT_DEVICE";

fn main() -> Result<()> {
    init_logging();

    let config = Config::load();
    log::info!("Starting vk-present");
    log::info!("Window: {}x{}", config.window.width, config.window.height);
    log::info!("Available backends: {:?}", available_backends());

    let event_loop = EventLoop::new()?;

    // The window has to exist before the backend so the backend can borrow it
    #[allow(deprecated)]
    let window = event_loop
        .create_window(
            WindowAttributes::default()
                .with_title(&config.window.title)
                .with_inner_size(PhysicalSize::new(config.window.width, config.window.height)),
        )
        .context("Failed to create window")?;

    let app_info = ApplicationInfo::new(config.window.title.clone(), 1);
    let backend = create_surface_backend(BackendName::Vulkan, &app_info, config.render.clone(), &window)
        .context("Failed to create Vulkan backend")?;

    for device in backend.suitable_devices()? {
        log::info!("Suitable GPU {}: {}", device.system_index, device.name);
    }

    let renderer = backend
        .create_renderer(&device_hints())
        .context("Failed to create renderer")?;
    log::info!("Rendering on {}", renderer.device_info().name);

    let frame = renderer.create_frame().context("Failed to create frame")?;

    let mut app = App {
        window: &window,
        frame,
        clear_color: config.window.clear_color,
        frames_presented: 0,
    };
    event_loop.run_app(&mut app)?;

    log::info!("Presented {} frames", app.frames_presented);
    Ok(())
}

fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();
    builder.init();
}

/// Device hint from the environment: a number selects by index, anything
/// else by name.
fn device_hints() -> Vec<Hint> {
    match std::env::var(DEVICE_ENV) {
        Ok(value) => match value.trim().parse::<i32>() {
            Ok(index) => vec![Hint::use_device(index)],
            Err(_) => vec![Hint::use_device(value)],
        },
        Err(_) => Vec::new(),
    }
}

struct App<'a> {
    window: &'a Window,
    frame: Box<dyn Frame + 'a>,
    clear_color: [f32; 4],
    frames_presented: u64,
}

impl App<'_> {
    fn render_frame(&mut self) -> vk_present::Result<()> {
        self.frame.begin()?;
        self.frame.clear_color(self.clear_color)?;
        self.frame.present()?;
        self.frames_presented += 1;
        Ok(())
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => match self.render_frame() {
                Ok(()) => {}
                Err(e @ RenderError::DeviceLost { .. }) => {
                    log::error!("Fatal render error: {}", e);
                    event_loop.exit();
                }
                Err(e) => log::error!("Render error: {}", e),
            },

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }
}
