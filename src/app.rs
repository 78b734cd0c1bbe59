use crate::config::StereogramConfig;
use crate::error::EngineError;
use crate::utils::Viewport;
use crate::StereogramEngine;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Autostereogram".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Handed to the frame callback once per redraw.
pub struct FrameContext {
    pub pressed_keys: Vec<winit::keyboard::Key>,
    pub delta_time: f32,
    /// Current surface size; changes only after a resize went through the engine.
    pub viewport: Viewport,
}

type FrameCallback = Box<dyn FnMut(&mut StereogramEngine<'static>, &FrameContext)>;

pub struct StereogramApp {
    window_config: WindowConfig,
    engine_config: Option<StereogramConfig>,
    engine: Option<StereogramEngine<'static>>,
    window: Option<Arc<Window>>,
    last_frame: std::time::Instant,
    frame_callback: FrameCallback,
    frame_context: FrameContext,
    fatal: Option<anyhow::Error>,
}

impl StereogramApp {
    pub fn new<F>(window_config: WindowConfig, engine_config: StereogramConfig, frame_callback: F) -> Self
    where
        F: FnMut(&mut StereogramEngine<'static>, &FrameContext) + 'static,
    {
        let viewport = Viewport::new(window_config.width, window_config.height);
        Self {
            window_config,
            engine_config: Some(engine_config),
            engine: None,
            window: None,
            last_frame: std::time::Instant::now(),
            frame_callback: Box::new(frame_callback),
            frame_context: FrameContext {
                pressed_keys: Vec::new(),
                delta_time: 0.0,
                viewport,
            },
            fatal: None,
        }
    }

    pub fn engine(&mut self) -> Option<&mut StereogramEngine<'static>> {
        self.engine.as_mut()
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref().map(|w| w.as_ref())
    }

    fn create_engine(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(engine_config) = self.engine_config.take() else {
            // already built on an earlier resume
            return Ok(());
        };
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let window_attributes = Window::default_attributes()
            .with_title(&self.window_config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        let surface = instance
            .create_surface(window.clone())
            .map_err(EngineError::from)?;
        let engine = StereogramEngine::new(surface, &instance, size, engine_config)?;

        self.frame_context.viewport = engine.viewport();
        window.request_redraw();
        self.engine = Some(engine);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler<()> for StereogramApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.create_engine(event_loop) {
            log::error!("{err:#}");
            self.fatal = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    self.frame_context.pressed_keys.push(event.logical_key);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = std::time::Instant::now();
                self.frame_context.delta_time = (now - self.last_frame).as_secs_f32();
                self.last_frame = now;

                if let Some(engine) = &mut self.engine {
                    // Run user's frame callback
                    (self.frame_callback)(engine, &self.frame_context);

                    // Request next frame
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }

                    // Clear frame data
                    self.frame_context.pressed_keys.clear();
                }
            }
            WindowEvent::Resized(new_size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize(&new_size);
                    self.frame_context.viewport = engine.viewport();
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            _ => (),
        }
    }
}

/// Opens a window and drives `frame_callback` once per redraw until the window closes.
///
/// Fails if the engine cannot be built, e.g. when the GPU lacks depth capture.
pub fn run_app<F>(
    window_config: WindowConfig,
    engine_config: StereogramConfig,
    frame_callback: F,
) -> anyhow::Result<()>
where
    F: FnMut(&mut StereogramEngine<'static>, &FrameContext) + 'static,
{
    let event_loop = EventLoop::new()?;
    let mut app = StereogramApp::new(window_config, engine_config, frame_callback);

    event_loop.run_app(&mut app)?;
    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
