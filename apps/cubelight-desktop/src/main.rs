use anyhow::{Context, anyhow};
use clap::Parser;
use cubelight_input::{ControlState, Key};
use cubelight_render::{FrameClock, SceneDescriptor, SceneKind, SceneState};
use cubelight_render_wgpu::CubeRenderer;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const WINDOW_TITLE: &str = "Basic Lighting";
const WINDOW_WIDTH: u32 = 640;
const WINDOW_HEIGHT: u32 = 480;

#[derive(Parser)]
#[command(name = "cubelight-desktop", about = "Cubes, lights and a fly camera")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Built-in scene: lit or skybox
    #[arg(long, default_value = "lit")]
    scene: SceneKind,

    /// Scene descriptor YAML; overrides --scene
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Why the app stopped before or during startup.
enum Failure {
    /// Window, surface, adapter or device could not be created.
    Environment(anyhow::Error),
    /// Scene, shader or texture setup failed.
    Setup(anyhow::Error),
}

impl Failure {
    fn report(&self) -> ExitCode {
        match self {
            Failure::Environment(e) => {
                tracing::error!("cannot create window or GPU context: {e:#}");
                ExitCode::from(2)
            }
            Failure::Setup(e) => {
                tracing::error!("setup failed: {e:#}");
                ExitCode::from(1)
            }
        }
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        _ => return None,
    })
}

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: CubeRenderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, scene: &SceneDescriptor) -> Result<Self, Failure> {
        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("create window")
                .map_err(Failure::Environment)?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("create surface")
            .map_err(Failure::Environment)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| Failure::Environment(anyhow!("no compatible GPU adapter")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cubelight_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")
        .map_err(Failure::Environment)?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| Failure::Environment(anyhow!("surface reports no formats")))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        let renderer = CubeRenderer::new(
            &device,
            &queue,
            surface_format,
            config.width,
            config.height,
            scene,
        )
        .map_err(|e| Failure::Setup(e.into()))?;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
        })
    }
}

struct App {
    scene: SceneDescriptor,
    state: Option<SceneState>,
    gpu: Option<Gpu>,
    keys_held: HashSet<Key>,
    clock: FrameClock,
    failure: Option<Failure>,
}

impl App {
    fn new(scene: SceneDescriptor) -> Self {
        Self {
            scene,
            state: None,
            gpu: None,
            keys_held: HashSet::new(),
            clock: FrameClock::default(),
            failure: None,
        }
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(state)) = (&self.gpu, &mut self.state) else {
            return;
        };

        let dt = self.clock.tick(Instant::now());
        let controls = ControlState::from_keys(&self.keys_held, &self.scene.bindings);
        let frame = state.update(&controls, dt);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.renderer
            .render(&gpu.device, &gpu.queue, &view, &frame, state.lights.as_ref());

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() || self.failure.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.scene) {
            Ok(gpu) => {
                self.state = Some(SceneState::new(
                    &self.scene,
                    gpu.config.width,
                    gpu.config.height,
                ));
                self.clock = FrameClock::start(Instant::now());
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(failure) => {
                self.failure = Some(failure);
                event_loop.exit();
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
            WindowEvent::CloseRequested => {
                tracing::info!("close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    gpu.renderer
                        .resize(&gpu.device, gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(key) = map_key(code) {
                    if key_state == ElementState::Pressed {
                        self.keys_held.insert(key);
                    } else {
                        self.keys_held.remove(&key);
                    }
                }
            }
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn load_scene(cli: &Cli) -> anyhow::Result<SceneDescriptor> {
    match &cli.config {
        Some(path) => SceneDescriptor::load(path)
            .with_context(|| format!("load scene {}", path.display())),
        None => Ok(SceneDescriptor::builtin(cli.scene)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("cubelight-desktop starting");

    let scene = match load_scene(&cli) {
        Ok(scene) => scene,
        Err(e) => return Failure::Setup(e).report(),
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => return Failure::Environment(e.into()).report(),
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene);
    if let Err(e) = event_loop.run_app(&mut app) {
        return Failure::Environment(e.into()).report();
    }

    match &app.failure {
        Some(failure) => failure.report(),
        None => ExitCode::SUCCESS,
    }
}
