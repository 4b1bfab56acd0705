use std::{
    convert::Infallible,
    time::{Duration, Instant},
};

use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window, WindowBuilder},
};

use crate::{compute::Extent, config::Config, error::SetupError};

/// Interval between frame rate reports.
const STATS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct AppState {
    previous_time: Instant,
    delta_time: f32,
    stats_start: Instant,
    stats_frames: u32,
}

impl AppState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            previous_time: now,
            delta_time: 0.0,
            stats_start: now,
            stats_frames: 0,
        }
    }

    /// Advances the tick clock.
    pub fn update(&mut self) {
        let current_time = Instant::now();
        self.delta_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f32();
        self.previous_time = current_time;
    }

    /// Seconds between the last two ticks.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Counts a rendered frame. Returns the average frame rate once per
    /// [`STATS_INTERVAL`].
    pub fn record_frame(&mut self) -> Option<f32> {
        self.stats_frames += 1;
        let elapsed = self.stats_start.elapsed();
        if elapsed < STATS_INTERVAL {
            return None;
        }

        let frame_rate = self.stats_frames as f32 / elapsed.as_secs_f32();
        self.stats_start = Instant::now();
        self.stats_frames = 0;
        Some(frame_rate)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Application<L: Layer + 'static> {
    layer: L,
    screen: Screen,
    state: AppState,
    exiting: bool,
}

impl<L: Layer + 'static> Application<L> {
    fn run(&mut self, event: Event<()>, control_flow: &mut ControlFlow) {
        control_flow.set_poll();

        match event {
            Event::WindowEvent {
                window_id,
                ref event,
            } if self.screen.window().id() == window_id => {
                self.layer.process_event(event, &mut self.screen);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    } => self.exit(control_flow),
                    WindowEvent::Resized(physical_size) => {
                        self.screen.resize(*physical_size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.screen.resize(**new_inner_size);
                    }
                    _ => {}
                }
            }
            Event::MainEventsCleared => {
                self.state.update();
                self.screen.window().request_redraw();
            }
            Event::RedrawRequested(window_id) if self.screen.window().id() == window_id => {
                if self.exiting {
                    return;
                }

                self.layer.update(&self.state, &mut self.screen);

                match self.layer.render(&self.state, &mut self.screen) {
                    Ok(_) => {}
                    Err(SurfaceError::Lost) => self.screen.resize_to_current(),
                    Err(SurfaceError::OutOfMemory) => {
                        tracing::error!("surface out of memory");
                        control_flow.set_exit_with_code(137);
                    }
                    Err(e) => tracing::error!("{:?}", e),
                }

                if let Some(frame_rate) = self.state.record_frame() {
                    tracing::debug!(fps = frame_rate, "frame statistics");
                }
            }
            _ => {}
        }
    }

    fn exit(&mut self, control_flow: &mut ControlFlow) {
        if self.exiting {
            return;
        }
        self.exiting = true;

        control_flow.set_exit_with_code(0);
        if let Err(err) = self.layer.shutdown(&self.state, &mut self.screen) {
            tracing::error!(%err, "shutdown failed");
            control_flow.set_exit_with_code(1);
        }
    }

    /// Opens the window, starts the layer and runs the event loop. Only
    /// returns if setup fails; everything acquired so far is dropped first.
    pub fn init(title: &str, config: Config) -> Result<Infallible, SetupError> {
        let event_loop = EventLoop::new();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let mut screen = pollster::block_on(Screen::new(
            &event_loop,
            &instance,
            title,
            config.extent(),
        ))?;
        let state = AppState::new();
        let layer = L::start(&mut screen, &state, &config)?;

        let mut application = Self {
            layer,
            screen,
            state,
            exiting: false,
        };
        event_loop.run(move |event, _, control_flow| {
            application.run(event, control_flow);
        });
    }
}

pub struct Screen {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    window: Window,
}

impl Screen {
    /// Creates a fixed-size window and a presentation device for it.
    pub async fn new(
        event_loop: &EventLoopWindowTarget<()>,
        instance: &wgpu::Instance,
        title: &str,
        extent: Extent,
    ) -> Result<Self, SetupError> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(extent.width, extent.height))
            .with_resizable(false)
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
            .ok_or(SetupError::NoAdapter("presentation"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                    label: Some("Presentation Device"),
                },
                None,
            )
            .await?;

        let size = window.inner_size();
        let mut config = surface
            .get_default_config(&adapter, size.width, size.height)
            .ok_or(SetupError::UnsupportedSurface)?;
        // Pixels are already display values; an sRGB target would encode them again.
        if let Some(format) = surface
            .get_capabilities(&adapter)
            .formats
            .into_iter()
            .find(|format| !format.is_srgb())
        {
            config.format = format;
        }
        surface.configure(&device, &config);
        tracing::info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "surface configured"
        );

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
    type LayerErr: std::error::Error + 'static;

    fn start(screen: &mut Screen, app: &AppState, config: &Config) -> Result<Self, SetupError>;
    fn process_event(&mut self, event: &WindowEvent, screen: &mut Screen);
    fn update(&mut self, app: &AppState, screen: &mut Screen);
    fn render(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), SurfaceError>;
    fn shutdown(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), Self::LayerErr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frames_do_not_report_statistics() {
        let mut state = AppState::new();
        state.update();
        assert!(state.delta_time() >= 0.0);
        assert_eq!(state.record_frame(), None);
    }

    #[test]
    fn reports_frame_rate_after_interval() {
        let mut state = AppState::new();
        state.stats_start = Instant::now() - STATS_INTERVAL;
        state.stats_frames = 59;
        let frame_rate = state.record_frame().unwrap();
        assert!(frame_rate > 0.0 && frame_rate <= 60.0);
        assert_eq!(state.stats_frames, 0);
    }
}
