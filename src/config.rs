//! Startup configuration, read once from `raytracer.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{camera::FovMode, compute::Extent, error::ConfigError};

/// File looked up in the working directory when `RAYTRACER_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "raytracer.toml";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RAYTRACER_CONFIG";

/// Which compute backend runs the two per-pixel stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Gpu,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image and window width in pixels.
    pub width: u32,
    /// Image and window height in pixels.
    pub height: u32,
    pub fov: f32,
    pub fov_mode: FovMode,
    /// Degrees per second.
    pub rotation_speed: f32,
    /// World units per second.
    pub move_speed: f32,
    pub clear_color: [f32; 3],
    pub kernel_path: PathBuf,
    pub device: DeviceKind,
    pub screenshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov: 60.0,
            fov_mode: FovMode::Literal,
            rotation_speed: 64.0,
            move_speed: 4.0,
            clear_color: [0.0; 3],
            kernel_path: PathBuf::from("asset/kernel/raytracer.wgsl"),
            device: DeviceKind::Gpu,
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&contents, path)
    }

    /// Loads `$RAYTRACER_CONFIG` if set (it must exist), otherwise
    /// `raytracer.toml` if present, otherwise the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load_from_file(Path::new(&path));
        }

        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
            Ok(Self::default())
        }
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width.max(1), self.height.max(1))
    }

    pub fn clear_color(&self) -> glam::Vec3 {
        glam::Vec3::from_array(self.clear_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("", Path::new("test.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.extent(), Extent::new(1280, 720));
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::from_toml(
            r#"
                width = 640
                fov_mode = "half_angle_degrees"
                device = "cpu"
                clear_color = [0.1, 0.2, 0.3]
            "#,
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert_eq!(config.fov_mode, FovMode::HalfAngleDegrees);
        assert_eq!(config.device, DeviceKind::Cpu);
        assert_eq!(config.clear_color(), glam::vec3(0.1, 0.2, 0.3));
    }

    #[test]
    fn malformed_file_reports_path() {
        let err = Config::from_toml("width = \"wide\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load_from_file(Path::new("no/such/raytracer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn zero_sized_image_is_bumped_to_one_pixel() {
        let config = Config {
            width: 0,
            ..Config::default()
        };
        assert_eq!(config.extent(), Extent::new(1, 720));
    }
}
