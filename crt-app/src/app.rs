use anyhow::{Context, Result};
use crt_core::{Frame, Point, TickRate};
use crt_experiment::{CsvRecorder, EventQueue, SessionConfig, SessionController, SessionStep};
use crt_render::{FrameStats, SkiaRenderer, load_font};
use crt_render::ab_glyph::FontVec;
use crt_timing::{HighPrecisionTimer, Pacer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    font: Option<FontVec>,
    session: SessionController<StdRng, CsvRecorder>,
    timer: HighPrecisionTimer,
    queue: EventQueue<HighPrecisionTimer>,
    pacer: Pacer,
    frame: Frame,
    fatal: Option<anyhow::Error>,

    should_exit: bool,
}

impl App {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let font = load_font(config.font_path.as_deref());
        let recorder = CsvRecorder::new(&config.output);
        let session = SessionController::new(config, rng, recorder)?;

        let timer = HighPrecisionTimer::new();
        // the cursor position is unknown until the first move; start outside home
        let queue = EventQueue::new(timer.clone(), Point::new(0.0, 0.0));
        let pacer = Pacer::new(session.tick_rate_hz());
        let frame = session.frame();

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            font,
            session,
            timer,
            queue,
            pacer,
            frame,
            fatal: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let config = self.session.config();
        tracing::info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            trials = config.n_trials,
            targets = config.n_targets,
            output = %config.output.display(),
            "starting session, Esc quits"
        );

        event_loop.run_app(&mut self)?;

        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = {
            let config = self.session.config();
            (config.field_width, config.field_height)
        };

        let refresh_rate = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .and_then(|m| m.refresh_rate_millihertz())
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Center-out reaching task")
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        tracing::info!(
            field = ?(width, height),
            window = ?(physical_size.width, physical_size.height),
            scale_factor = window.scale_factor(),
            refresh_hz = ?refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(
            Pixels::new(width, height, surface_texture).context("creating pixel surface")?,
        );

        let palette = *self.session.scene().palette();
        let renderer = SkiaRenderer::new(width, height, palette, self.font.take())?;
        if !renderer.has_font() {
            tracing::warn!("no usable font found, pass --font to show trial text");
        }
        self.renderer = Some(renderer);

        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let stats: FrameStats = renderer.render_frame(&self.frame, pixels.frame_mut(), &self.timer)?;
        let now = self.timer.now();
        pixels.render()?;
        let present = self.timer.elapsed(now);

        tracing::trace!(
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            present_ms = present.as_secs_f64() * 1e3,
            cached_texts = stats.cached_texts,
            "frame presented"
        );
        Ok(())
    }

    /// Drains queued input into one cycle and advances the session.
    fn step(&mut self, event_loop: &ActiveEventLoop) {
        let cycle = self.queue.drain();
        match self.session.tick(&cycle) {
            Ok(SessionStep::Running(frame)) => {
                if frame != self.frame {
                    self.frame = frame;
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
                self.pacer.set_rate(self.session.tick_rate_hz());
            }
            Ok(SessionStep::Finished) => {
                tracing::info!(path = %self.session.config().output.display(), "all trials done");
                self.cleanup_and_exit(event_loop);
            }
            Ok(SessionStep::Quit) => self.cleanup_and_exit(event_loop),
            Err(err) => {
                tracing::error!(error = %err, "session failed");
                self.fatal = Some(err.into());
                self.cleanup_and_exit(event_loop);
            }
        }
    }

    fn schedule(&mut self, event_loop: &ActiveEventLoop) {
        match self.session.current_trial().phase().tick_rate() {
            TickRate::Coarse => {
                let deadline = self.timer.instant_at(self.pacer.next_deadline());
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            TickRate::Fine => {
                self.timer.sleep(self.pacer.until_due(self.timer.now()));
                event_loop.set_control_flow(ControlFlow::Poll);
            }
        }
    }

    fn cursor_to_field(&self, x: f64, y: f64) -> Option<Point> {
        let pixels = self.pixels.as_ref()?;
        let (px, py) = pixels
            .window_pos_to_pixel((x as f32, y as f32))
            .unwrap_or_else(|pos| pixels.clamp_pixel_pos(pos));
        Some(Point::new(px as f32, py as f32))
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        let stats = self.timer.pacing_stats();
        if stats.samples > 0 {
            tracing::info!(
                ticks = stats.samples,
                mean_ms = stats.average_frame_time_ns / 1e6,
                jitter_ms = stats.jitter_ns / 1e6,
                min_ms = stats.min_frame_time_ns / 1e6,
                max_ms = stats.max_frame_time_ns / 1e6,
                effective_hz = stats.effective_hz,
                "tick pacing"
            );
        }

        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                tracing::error!(error = %e, "failed to create window and surface");
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.queue.push_quit();
                self.step(event_loop);
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.queue.push_quit();
                self.step(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(pos) = self.cursor_to_field(position.x, position.y) {
                    self.queue.push_move(pos);
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let pos = self.queue.pointer();
                self.queue.push_press(pos);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    tracing::error!(error = %e, "render failed");
                    self.fatal = Some(e);
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(pixels) = &mut self.pixels {
                    if let Err(e) = pixels.resize_surface(size.width, size.height) {
                        tracing::warn!(error = %e, "failed to resize surface");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }

        let now = self.timer.now();
        if self.pacer.is_due(now) {
            if let Some(since_last) = self.pacer.tick(now) {
                self.timer.record_frame(since_last);
            }
            self.step(event_loop);
            if self.should_exit {
                return;
            }
        }
        self.schedule(event_loop);
    }
}
