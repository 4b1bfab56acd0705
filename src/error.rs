use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading `raytracer.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Unrecoverable failure while acquiring windows, devices or device resources.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("surface is not supported by the adapter")]
    UnsupportedSurface,

    #[error("no suitable {0} adapter found")]
    NoAdapter(&'static str),

    #[error("failed to acquire device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to read kernel source {path}: {source}")]
    KernelSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build kernel {path}:\n{log}")]
    KernelBuild { path: PathBuf, log: String },

    #[error("failed to allocate device buffers: {0}")]
    Allocation(String),
}

/// Failure of a single frame's dispatch. The frame is dropped; device
/// resources stay valid for the next one.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{stage} stage failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },

    #[error("failed to map display buffer: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("readback channel closed before the display buffer was mapped")]
    ReadbackAbandoned,

    #[error("display buffer holds {expected} pixels but the host buffer holds {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Failure while writing a screenshot. Rendering carries on.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("failed to create screenshot directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{pixels} pixels do not fill a {width}x{height} image")]
    SizeMismatch {
        width: u32,
        height: u32,
        pixels: usize,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}
