use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{DeviceEvent, DeviceId, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use wander::batch::BatchRenderer;
use wander::camera::Camera;
use wander::frame::{FrameClock, FrameContext};
use wander::input::{Action, InputController};
use wander::renderer::{FrameInput, Renderer};
use wander::scene::{Scene, SceneConfig};

const WINDOW_WIDTH: f64 = 1280.0;
const WINDOW_HEIGHT: f64 = 720.0;

#[derive(Parser, Debug)]
#[command(name = "wander")]
#[command(about = "Walk around a height-mapped terrain")]
struct Args {
    /// Directory holding height maps, models, textures and skybox faces
    #[arg(long, default_value = "res")]
    assets: PathBuf,

    /// Seed for scattering trees, grass and ferns (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Target frame rate
    #[arg(long, default_value_t = 120)]
    fps: u32,
}

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Scene,
    scene_config: SceneConfig,
    assets: PathBuf,
    camera: Camera,
    input: InputController,
    batches: BatchRenderer,
    target_fps: u32,
    clock: FrameClock,
    /// Fatal error raised inside the event loop, reported by `main`
    error: Option<anyhow::Error>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("Wander")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &self.scene,
            &self.scene_config,
            &self.assets,
        ))
        .context("Failed to initialise renderer")?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        // Loading time should not count as the first frame
        self.clock = FrameClock::new(self.target_fps);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn set_cursor_grab(&self, grabbed: bool) {
        let Some(window) = &self.window else {
            return;
        };
        if grabbed {
            let result = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = result {
                warn!("Could not capture the cursor: {e}");
            }
            window.set_cursor_visible(false);
        } else {
            if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
                warn!("Could not release the cursor: {e}");
            }
            window.set_cursor_visible(true);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match self.input.handle_keyboard(code, event.state, event.repeat) {
            Some(Action::Exit) => event_loop.exit(),
            Some(Action::ToggleGrab) => self.set_cursor_grab(self.input.state.cursor_grabbed),
            Some(Action::TogglePanel) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.ui.toggle();
                }
            }
            None => {}
        }
    }

    /// Update the world by one frame and draw it.
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return;
        };

        let ctx = FrameContext::new(self.clock.tick());
        let controls = self.input.take_controls();
        self.camera.update(&controls, &self.scene.world, ctx.delta);
        self.scene.sky.advance(ctx.delta);

        for entity in &self.scene.entities {
            self.batches.submit(entity);
        }

        let frame = FrameInput {
            scene: &self.scene,
            camera: &mut self.camera,
            batches: &mut self.batches,
            fps: self.clock.fps(),
        };
        match renderer.render(window, frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => warn!("Render error: {e:?}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) {
            renderer.handle_window_event(window, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::Resized(physical_size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.handle_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let deadline = self.clock.next_deadline();
        if Instant::now() >= deadline {
            if let Some(ref window) = self.window {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref mut renderer) = self.renderer {
            renderer.clean_up();
        }
        info!("Exiting");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Scatter seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let scene_config = SceneConfig::default();
    let scene = Scene::load(&scene_config, &args.assets, &mut rng)
        .with_context(|| format!("Failed to load scene from {}", args.assets.display()))?;

    let event_loop = EventLoop::new()?;

    let mut app = App {
        window: None,
        renderer: None,
        scene,
        scene_config,
        assets: args.assets,
        camera: Camera::new(),
        input: InputController::new(),
        batches: BatchRenderer::new(),
        target_fps: args.fps,
        clock: FrameClock::new(args.fps),
        error: None,
    };

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
