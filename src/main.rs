use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use progressive_tracer::cli::Cli;
use progressive_tracer::core::{Clock, GpuContext, RenderSequencer, SurfaceRenderer, WgpuDevice};
use progressive_tracer::{PathTracer, TracerConfig};

type Tracer = PathTracer<WgpuDevice>;

fn load_config(cli: &Cli) -> Result<TracerConfig> {
    let mut config = match &cli.config {
        Some(path) => TracerConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => TracerConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_tracer(gpu: GpuContext, config: &TracerConfig) -> Result<Tracer> {
    let device = WgpuDevice::new(gpu, config).context("Failed to initialise tracer device")?;
    let mut tracer = PathTracer::new(device, config);
    tracer
        .populate_scene(config)
        .context("Failed to populate scene")?;
    Ok(tracer)
}

/// Run the configured sequence without a window
fn run_headless(config: TracerConfig) -> Result<()> {
    let gpu = pollster::block_on(GpuContext::new()).context("Failed to create GPU context")?;
    let mut tracer = build_tracer(gpu, &config)?;
    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    let mut clock = Clock::new();

    sequencer.start();
    while sequencer.is_running() {
        let wait = sequencer.time_until_resume();
        if wait > 0.0 {
            std::thread::sleep(Duration::from_secs_f32(wait));
        }
        sequencer.tick(clock.tick(), &mut tracer)?;
    }

    log::info!(
        "Headless run finished: {} frames, {} dispatches",
        sequencer.frames_completed(),
        tracer.frames_rendered()
    );
    Ok(())
}

struct App {
    config: TracerConfig,
    window: Option<Arc<Window>>,
    surface: Option<SurfaceRenderer>,
    tracer: Option<Tracer>,
    sequencer: RenderSequencer,
    clock: Clock,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: TracerConfig) -> Self {
        let sequencer = RenderSequencer::new(config.sequence.clone());
        Self {
            config,
            window: None,
            surface: None,
            tracer: None,
            sequencer,
            clock: Clock::new(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("Progressive Tracer")
                    .with_inner_size(winit::dpi::PhysicalSize::new(
                        self.config.width,
                        self.config.height,
                    )),
            )?,
        );

        let (gpu, surface) = pollster::block_on(GpuContext::with_window(window.clone()))
            .context("Failed to create GPU context")?;
        let size = window.inner_size();
        let surface = SurfaceRenderer::new(gpu.clone(), surface, size.width, size.height);

        let mut tracer = build_tracer(gpu, &self.config)?;
        tracer.resize(size.width, size.height);

        self.sequencer.start();
        self.clock.reset();

        self.window = Some(window);
        self.surface = Some(surface);
        self.tracer = Some(tracer);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(tracer) = &mut self.tracer {
            if self.sequencer.is_running() {
                self.sequencer.cancel(tracer);
            }
        }
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(tracer), Some(surface)) = (&mut self.tracer, &self.surface) else {
            return Ok(());
        };

        // Outside a sequence run the image keeps converging
        if !self.sequencer.is_running() {
            tracer.render_frame()?;
        }

        if let Some(target) = tracer.current_target() {
            surface.present(target)?;
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e.context("Failed to initialise tracer"));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.shutdown(event_loop),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::KeyR),
                        repeat: false,
                        ..
                    },
                ..
            } => self.sequencer.start(),
            WindowEvent::Resized(size) => {
                if let Some(surface) = &mut self.surface {
                    surface.resize(size.width, size.height);
                }
                if let Some(tracer) = &mut self.tracer {
                    tracer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e.context("Render error"));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let delta = self.clock.tick();
        if let Some(tracer) = &mut self.tracer {
            if self.sequencer.is_running() {
                if let Err(e) = self.sequencer.tick(delta, tracer) {
                    self.fail(event_loop, anyhow::Error::new(e).context("Render sequence failed"));
                    return;
                }
            }
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.headless {
        return run_headless(config);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);

    log::info!("Progressive Tracer - R restarts the sequence, Escape quits");
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
