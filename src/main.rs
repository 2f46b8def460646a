//! skinrig - Skinned animation viewer
//!
//! Usage:
//!     skinrig [OPTIONS] [ASSET]
//!
//! Options:
//!     -c, --config <FILE>     Viewer config (JSON)
//!     -a, --asset <PATH>      Asset to load (same as the positional ASSET)
//!     --clip <N>              Animation clip to play
//!     --frames <N>            Loop over the first N frames
//!     --headless <TICKS>      Run TICKS fixed steps without a window and exit
//!     -h, --help              Show this help message

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use skinrig::animation::{AnimationPlayer, SkinnedScene};
use skinrig::core::{
    camera::Camera,
    config::ViewerConfig,
    error::Error,
    logging,
    time::FrameTimer,
    types::{Result, Vec3},
};
use skinrig::import;
use skinrig::render::{self, GpuContext, GpuSkinningSink, MeshHandle, PaletteSink};

fn print_help() {
    eprintln!("skinrig - Skinned animation viewer");
    eprintln!();
    eprintln!("Usage: skinrig [OPTIONS] [ASSET]");
    eprintln!();
    eprintln!("ASSET is a glTF/GLB file or a directory written by export_rig.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -c, --config <FILE>     Viewer config (JSON)");
    eprintln!("    -a, --asset <PATH>      Asset to load (same as the positional ASSET)");
    eprintln!("    --clip <N>              Animation clip to play (default: 0)");
    eprintln!("    --frames <N>            Loop over the first N frames (default: clip length)");
    eprintln!("    --headless <TICKS>      Run TICKS fixed steps without a window and exit");
    eprintln!("    -h, --help              Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    skinrig assets/model.glb");
    eprintln!("    skinrig --clip 1 --frames 60 ./export/walk");
    eprintln!("    skinrig --headless 300 assets/model.glb");
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    asset: Option<PathBuf>,
    clip: Option<usize>,
    frames: Option<u32>,
    headless: Option<u32>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --config")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "-a" | "--asset" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --asset")?;
                parsed.asset = Some(PathBuf::from(value));
            }
            "--clip" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --clip")?;
                parsed.clip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid clip index: {}", value))?,
                );
            }
            "--frames" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --frames")?;
                parsed.frames = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid frame count: {}", value))?,
                );
            }
            "--headless" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --headless")?;
                parsed.headless = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid tick count: {}", value))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if parsed.asset.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                parsed.asset = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Merge the config file with command line overrides
fn resolve_config(args: &Args) -> Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_sync(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(asset) = &args.asset {
        config.asset = asset.clone();
    }
    if let Some(clip) = args.clip {
        config.clip = clip;
    }
    if args.frames.is_some() {
        config.frame_count = args.frames;
    }
    config.validate()?;
    Ok(config)
}

/// Import the asset and evaluate the first frame so bad rigs fail before a window opens
fn load_scene(config: &ViewerConfig) -> Result<(SkinnedScene, AnimationPlayer)> {
    let imported = import::load_asset(&config.asset)?;
    let mut scene = SkinnedScene::build(&imported, config.clip, config.duplicate_tracks)?;

    let available = scene.frame_count();
    let frame_count = match config.frame_count {
        Some(frames) if !scene.tracks.is_empty() && frames > available => {
            return Err(Error::Config(format!(
                "frame_count {} exceeds the {} frame(s) every track can serve",
                frames, available
            )));
        }
        Some(frames) => frames,
        None => available,
    };

    scene.update(0)?;

    log::info!(
        "Loaded {}: {} mesh(es), {} track(s), looping {} frame(s) at {:.1} fps",
        config.asset.display(),
        scene.meshes.len(),
        scene.tracks.len(),
        frame_count,
        1.0 / config.tick_seconds
    );

    Ok((scene, AnimationPlayer::new(frame_count, config.tick_seconds)))
}

struct App {
    config: ViewerConfig,
    scene: SkinnedScene,
    player: AnimationPlayer,
    camera: Camera,
    timer: FrameTimer,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    sink: Option<GpuSkinningSink>,
    handles: Vec<MeshHandle>,
}

impl App {
    fn new(config: ViewerConfig, scene: SkinnedScene, player: AnimationPlayer) -> Self {
        let mut camera = Camera::look_at(
            Vec3::from(config.eye),
            Vec3::from(config.focus),
            Vec3::from(config.up),
        );
        camera.fov_y = config.fov_y_degrees.to_radians();
        camera.set_aspect(config.window_width as f32, config.window_height as f32);

        Self {
            config,
            scene,
            player,
            camera,
            timer: FrameTimer::new(),
            window: None,
            gpu: None,
            sink: None,
            handles: Vec::new(),
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("skinrig")
            .with_inner_size(PhysicalSize::new(self.config.window_width, self.config.window_height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| Error::Window(e.to_string()))?,
        );

        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
        let (width, height) = gpu.size();
        self.camera.set_aspect(width as f32, height as f32);

        log::info!("Window created: {}x{}", width, height);

        let mut sink = GpuSkinningSink::new(&gpu.device, &gpu.queue, gpu.format(), width, height);
        sink.set_camera(self.camera.view_projection());

        self.handles = render::load_scene_meshes(&self.scene, &mut sink)?;

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.sink = Some(sink);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_aspect(width as f32, height as f32);
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
        }
        if let Some(sink) = &mut self.sink {
            sink.resize(width, height);
            sink.set_camera(self.camera.view_projection());
        }
    }

    /// Advance the clock, refresh palettes on a new frame and draw
    fn update(&mut self) -> Result<()> {
        self.timer.tick();

        let (Some(gpu), Some(sink)) = (&self.gpu, &mut self.sink) else {
            return Ok(());
        };

        if self.player.advance(self.timer.delta_secs()) {
            let frame = self.player.frame();
            for (mesh, handle) in self.scene.meshes.iter_mut().zip(&self.handles) {
                mesh.update_bones(frame)?;
                sink.submit_palette(*handle, mesh.palette())?;
            }
        }

        let Some(output) = gpu.acquire_frame()? else {
            return Ok(());
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("skinning_encoder"),
        });
        sink.render(&mut encoder, &view);
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if self.timer.frame_count() % 120 == 0 {
            if let Some(window) = &self.window {
                window.set_title(&format!(
                    "skinrig - {:.1} FPS | frame {}/{}",
                    self.timer.fps(),
                    self.player.frame(),
                    self.player.frame_count()
                ));
            }
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_graphics(event_loop) {
            log::error!("Failed to initialise graphics: {}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.update() {
                    log::error!("Frame failed: {}", e);
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let (mut scene, mut player) = match load_scene(&config) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("Failed to load {}: {}", config.asset.display(), e);
            std::process::exit(1);
        }
    };

    if let Some(ticks) = args.headless {
        if let Err(e) = render::play_headless(&mut scene, &mut player, ticks) {
            log::error!("Headless run failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config, scene, player);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
}
