//! F12 screenshots of the display buffer.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::{compute::Extent, error::ScreenshotError};

/// Writes numbered PNG files into one directory.
#[derive(Debug)]
pub struct ScreenshotWriter {
    directory: PathBuf,
    next_index: u32,
}

impl ScreenshotWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            next_index: 0,
        }
    }

    /// Saves `pixels` as `frame-NNNN.png`, skipping names already taken.
    pub fn save(&mut self, extent: Extent, pixels: &[u32]) -> Result<PathBuf, ScreenshotError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| {
            ScreenshotError::Directory {
                path: self.directory.clone(),
                source,
            }
        })?;

        let path = loop {
            let path = self
                .directory
                .join(format!("frame-{:04}.png", self.next_index));
            self.next_index += 1;
            if !path.exists() {
                break path;
            }
        };

        save_png(&path, extent, pixels)?;
        Ok(path)
    }
}

/// Encodes packed RGBA8 pixels, row 0 first, as a PNG file.
pub fn save_png(path: &Path, extent: Extent, pixels: &[u32]) -> Result<(), ScreenshotError> {
    let bytes: Vec<u8> = bytemuck::cast_slice(pixels).to_vec();
    let image = RgbaImage::from_raw(extent.width, extent.height, bytes).ok_or(
        ScreenshotError::SizeMismatch {
            width: extent.width,
            height: extent.height,
            pixels: pixels.len(),
        },
    )?;

    image.save(path).map_err(|source| ScreenshotError::Encode {
        path: path.to_owned(),
        source,
    })
}
