use std::time::Instant;

use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    error::OsError,
    event::*,
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window, WindowBuilder},
};

use crate::diagnostics::{self, Diagnostic, Disposition};

#[derive(Debug)]
pub struct AppState {
    previous_time: Instant,
    /// Seconds since the previous frame.
    pub elapsed_time: f32,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            elapsed_time: 0.0,
        }
    }

    pub fn update(&mut self) {
        let current_time = Instant::now();
        self.elapsed_time = current_time.duration_since(self.previous_time).as_secs_f32();
        self.previous_time = current_time;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame rate averaged over windows of at least one second.
#[derive(Debug, Default)]
pub struct FrameCounter {
    frames: u32,
    elapsed: f32,
}

impl FrameCounter {
    /// Count one frame; returns the frames per second whenever a window closes.
    pub fn tick(&mut self, elapsed_time: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += elapsed_time;
        if self.elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

pub struct Application<L: Layer + 'static> {
    layer: Option<L>,
    config: L::Config,
    screen: Screen,
    state: AppState,
}

impl<L: Layer + 'static> Application<L> {
    pub fn new(screen: Screen, config: L::Config) -> Self {
        Self {
            screen,
            config,
            layer: None,
            state: AppState::new(),
        }
    }

    fn run(
        &mut self,
        event: Event<()>,
        _event_loop: &EventLoopWindowTarget<()>,
        control_flow: &mut ControlFlow,
    ) {
        control_flow.set_wait();

        if let Some(layer) = self.layer.as_mut() {
            layer.process_event(&event, &mut self.screen);
        }

        match event {
            Event::NewEvents(StartCause::Init) => {
                match L::start(&self.config, &mut self.screen, &self.state) {
                    Ok(layer) => self.layer = Some(layer),
                    Err(e) => {
                        tracing::error!("failed to start: {e}");
                        control_flow.set_exit_with_code(1);
                    }
                }
            }
            Event::WindowEvent {
                window_id,
                ref event,
            } if self.screen.window().id() == window_id => match event {
                WindowEvent::CloseRequested => {
                    control_flow.set_exit_with_code(0);
                    if let Some(mut layer) = self.layer.take() {
                        if let Err(e) = layer.shutdown(&self.state, &mut self.screen) {
                            tracing::error!("shutdown failed: {e}");
                            control_flow.set_exit_with_code(1);
                        }
                    }
                }
                WindowEvent::Resized(physical_size) => {
                    self.resize(*physical_size);
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    self.resize(**new_inner_size);
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                self.state.update();
                self.screen.window().request_redraw();
            }
            Event::RedrawRequested(window_id) if self.screen.window().id() == window_id => {
                let Some(layer) = self.layer.as_mut() else {
                    return;
                };
                layer.update(&self.state, &mut self.screen);

                if let Err(e) = layer.render(&self.state, &mut self.screen) {
                    if matches!(e, SurfaceError::Lost | SurfaceError::Outdated) {
                        self.screen.resize_to_current();
                    }
                    let diagnostic = Diagnostic::from_surface(&e);
                    if let Disposition::Terminate { exit_code } = diagnostics::report(&diagnostic) {
                        control_flow.set_exit_with_code(exit_code);
                    }
                }
            }
            _ => {}
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        // minimized windows report a zero size; keep the last real one
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.screen.resize(new_size);
        if let Some(layer) = self.layer.as_mut() {
            layer.resize(new_size, &self.state, &mut self.screen);
        }
    }

    pub async fn init(options: WindowOptions, config: L::Config) -> Result<(), ScreenError> {
        let event_loop = EventLoop::new();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let screen = Screen::new(&event_loop, &instance, &options).await?;
        let mut application = Self::new(screen, config);
        event_loop.run(move |event, event_loop, control_flow| {
            application.run(event, event_loop, control_flow);
        })
    }
}

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub size: PhysicalSize<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("failed to create window: {0}")]
    Window(#[from] OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no graphics adapter is compatible with the window surface")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
}

pub struct Screen {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    window: Window,
}

impl Screen {
    pub async fn new(
        event_loop: &EventLoopWindowTarget<()>,
        instance: &wgpu::Instance,
        options: &WindowOptions,
    ) -> Result<Self, ScreenError> {
        let window = WindowBuilder::new()
            .with_title(options.title.clone())
            .with_inner_size(options.size)
            .build(event_loop)?;

        // SAFETY:
        // The surface needs to live as long as the window that created it.
        // Screen owns the window so this should be safe.
        let surface = unsafe { instance.create_surface(&window) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ScreenError::NoAdapter)?;
        tracing::info!(adapter = ?adapter.get_info(), "selected adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: adapter.features(),
                    limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;
        diagnostics::install(&device);

        let size = window.inner_size();
        let config = surface
            .get_default_config(&adapter, size.width, size.height)
            .ok_or(ScreenError::UnsupportedSurface)?;
        surface.configure(&device, &config);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resize the screen to new window size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Resize the screen to current window inner size.
    pub fn resize_to_current(&mut self) {
        self.resize(self.window.inner_size());
    }
}

pub trait Layer: Sized {
    type Config: 'static;
    type LayerErr: std::error::Error + 'static;

    fn start(
        config: &Self::Config,
        screen: &mut Screen,
        app: &AppState,
    ) -> Result<Self, Self::LayerErr>;
    fn process_event(&mut self, event: &Event<()>, screen: &mut Screen);
    fn resize(&mut self, new_size: PhysicalSize<u32>, app: &AppState, screen: &mut Screen);
    fn update(&mut self, app: &AppState, screen: &mut Screen);
    fn render(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), SurfaceError>;
    fn shutdown(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), Self::LayerErr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_counter_reports_once_per_second() {
        let mut counter = FrameCounter::default();
        for _ in 0..63 {
            assert_eq!(counter.tick(1.0 / 64.0), None);
        }
        assert_eq!(counter.tick(1.0 / 64.0), Some(64.0));
        assert_eq!(counter.tick(0.5), None);
    }

    #[test]
    fn elapsed_time_is_in_seconds() {
        let mut state = AppState::new();
        std::thread::sleep(std::time::Duration::from_millis(20));
        state.update();
        assert!(state.elapsed_time >= 0.02, "{}", state.elapsed_time);
        assert!(state.elapsed_time < 5.0);
    }
}
