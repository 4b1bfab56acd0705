use std::{convert::Infallible, process::ExitCode};

use raytracer_lib::{
    application::{AppState, Application, Layer, Screen},
    camera::{Camera, CameraController},
    compute::{cpu::CpuDevice, gpu::GpuDevice, ComputeDevice, Dispatcher},
    config::{Config, DeviceKind},
    error::SetupError,
    input::InputState,
    renderer::Blitter,
    scene::Scene,
    screenshot::ScreenshotWriter,
};
use tracing_subscriber::EnvFilter;
use wgpu::{CommandEncoderDescriptor, TextureViewDescriptor};
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};

struct RayTracer {
    camera: Camera,
    camera_controller: CameraController,
    input: InputState,
    dispatcher: Dispatcher<Box<dyn ComputeDevice>>,
    blitter: Blitter,
    clear_color: glam::Vec3,
    screenshots: ScreenshotWriter,
    screenshot_requested: bool,
}

impl Layer for RayTracer {
    type LayerErr = Infallible;

    fn start(screen: &mut Screen, _app: &AppState, config: &Config) -> Result<Self, SetupError> {
        let extent = config.extent();
        let scene = Scene::default();

        let device: Box<dyn ComputeDevice> = match config.device {
            DeviceKind::Gpu => Box::new(GpuDevice::new(&scene, extent, &config.kernel_path)?),
            DeviceKind::Cpu => Box::new(CpuDevice::new(&scene, extent)),
        };

        let camera = Camera::setup(config.fov, extent.aspect_ratio(), config.fov_mode);
        tracing::info!(
            fov = config.fov,
            fov_mode = ?config.fov_mode,
            height_extent = config.fov_mode.height_extent(config.fov),
            "camera ready"
        );

        Ok(Self {
            camera,
            camera_controller: CameraController::new(config.rotation_speed, config.move_speed),
            input: InputState::empty(),
            dispatcher: Dispatcher::new(device),
            blitter: Blitter::new(&screen.device, screen.config.format, extent),
            clear_color: config.clear_color(),
            screenshots: ScreenshotWriter::new(&config.screenshot_dir),
            screenshot_requested: false,
        })
    }

    fn process_event(&mut self, event: &WindowEvent, _screen: &mut Screen) {
        if self.input.process_event(event) {
            return;
        }

        if let WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(VirtualKeyCode::F12),
                    ..
                },
            ..
        } = event
        {
            self.screenshot_requested = true;
        }
    }

    fn update(&mut self, app: &AppState, _screen: &mut Screen) {
        self.camera_controller
            .update(&mut self.camera, app.delta_time(), self.input);
    }

    fn render(&mut self, _app: &AppState, screen: &mut Screen) -> Result<(), wgpu::SurfaceError> {
        let extent = self.dispatcher.extent();
        match self.dispatcher.frame(&self.camera, self.clear_color) {
            Ok(pixels) => {
                self.blitter.upload(&screen.queue, pixels);

                if std::mem::take(&mut self.screenshot_requested) {
                    match self.screenshots.save(extent, pixels) {
                        Ok(path) => tracing::info!(path = %path.display(), "screenshot saved"),
                        Err(err) => tracing::warn!(%err, "screenshot failed"),
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "frame dropped"),
        }

        let output = screen.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let mut encoder = screen
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Blit Encoder"),
            });
        self.blitter.draw(&mut encoder, &view);

        screen.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn shutdown(&mut self, _app: &AppState, _screen: &mut Screen) -> Result<(), Self::LayerErr> {
        tracing::info!("exiting");
        Ok(())
    }
}

fn run() -> Result<Infallible, SetupError> {
    let config = Config::load()?;
    tracing::debug!(?config, "configuration loaded");
    Application::<RayTracer>::init("raytracer", config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(never) => match never {},
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
