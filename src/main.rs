use std::process::ExitCode;

use clap::Parser;
use sphere_tracer_lib::{
    application::{AppState, Application, FrameCounter, Layer, Screen, WindowOptions},
    config::{Args, TracerConfig},
    input::InputState,
    renderer::Presenter,
    scene::{Scene, SceneError},
};
use tracing_subscriber::EnvFilter;
use wgpu::{CommandEncoderDescriptor, TextureViewDescriptor};
use winit::{dpi::PhysicalSize, event::Event, window::CursorGrabMode};

struct SphereTracer {
    scene: Option<Scene>,
    presenter: Presenter,
    input: InputState,
    frames: FrameCounter,
    looking: bool,
}

impl SphereTracer {
    fn grab_cursor(&mut self, screen: &Screen, grab: bool) {
        let window = screen.window();
        let result = if grab {
            window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            tracing::warn!("cursor grab unavailable: {e}");
        }
        window.set_cursor_visible(!grab);
        self.looking = grab;
    }
}

impl Layer for SphereTracer {
    type Config = TracerConfig;
    type LayerErr = SceneError;

    fn start(
        config: &TracerConfig,
        screen: &mut Screen,
        _app: &AppState,
    ) -> Result<Self, SceneError> {
        // the surface may differ from the requested size on scaled displays
        let config = TracerConfig {
            width: screen.config.width,
            height: screen.config.height,
            ..config.clone()
        };
        let scene = Scene::new(&screen.device, &screen.queue, &config)?;
        let presenter = Presenter::new(&screen.device, screen.config.format);

        Ok(Self {
            scene: Some(scene),
            presenter,
            input: InputState::new(),
            frames: FrameCounter::default(),
            looking: false,
        })
    }

    fn process_event(&mut self, event: &Event<()>, _screen: &mut Screen) {
        self.input.handle_event(event);
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>, _app: &AppState, screen: &mut Screen) {
        if let Some(scene) = self.scene.as_mut() {
            scene.resize(&screen.device, new_size.width, new_size.height);
        }
    }

    fn update(&mut self, app: &AppState, screen: &mut Screen) {
        let frame = self.input.frame();
        if frame.look_held != self.looking {
            self.grab_cursor(screen, frame.look_held);
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.react_to_input(&frame, app.elapsed_time);
        }
        self.input.end_frame();

        if let Some(fps) = self.frames.tick(app.elapsed_time) {
            screen.window().set_title(&format!("sphere_tracer | FPS: {fps:.0}"));
        }
    }

    fn render(&mut self, _app: &AppState, screen: &mut Screen) -> Result<(), wgpu::SurfaceError> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };

        let output = screen.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let mut encoder = screen
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        match scene.render(&screen.device, &screen.queue, &mut encoder) {
            Ok(frame) => self.presenter.draw(&screen.device, &mut encoder, &frame, &view),
            Err(e) => tracing::error!("skipping frame: {e}"),
        }

        screen.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn shutdown(&mut self, _app: &AppState, _screen: &mut Screen) -> Result<(), SceneError> {
        if let Some(scene) = self.scene.take() {
            scene.dispose();
        }
        tracing::info!("exiting");
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match TracerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(seed = config.seed, "starting");

    let options = WindowOptions {
        title: "sphere_tracer".to_owned(),
        size: PhysicalSize::new(config.width, config.height),
    };
    match pollster::block_on(Application::<SphereTracer>::init(options, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
