//! Two-stage frame dispatch: shade every pixel, then convert every pixel to
//! the display format, then read the display buffer back to the host.

pub mod cpu;
pub mod gpu;

use crate::{camera::Camera, error::DispatchError};

/// Edge length of the square work-group tile. Must match `@workgroup_size`
/// in the kernel source.
pub const WORKGROUP_SIZE: u32 = 16;

/// Size of the pixel grid the stages run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Work-groups per axis needed to cover the grid; edge tiles are partial.
    pub fn workgroups(&self) -> (u32, u32) {
        (
            self.width.div_ceil(WORKGROUP_SIZE),
            self.height.div_ceil(WORKGROUP_SIZE),
        )
    }

    /// Pixel coordinates of a row-major buffer index.
    pub fn coordinates(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }
}

/// A compute backend holding the scene and both per-pixel buffers.
///
/// The scene is uploaded when the device is built and never again. Each call
/// runs one stage over the whole grid and returns only once that stage's
/// writes are complete, which is the barrier between the two stages.
pub trait ComputeDevice {
    fn extent(&self) -> Extent;

    /// Runs the shading stage into the framebuffer.
    fn shade(&mut self, camera: &Camera, clear_color: glam::Vec3) -> Result<(), DispatchError>;

    /// Runs the presentation stage from the framebuffer into the display buffer.
    fn present(&mut self) -> Result<(), DispatchError>;

    /// Copies the display buffer into `pixels`.
    fn read_display(&mut self, pixels: &mut [u32]) -> Result<(), DispatchError>;
}

impl<D: ComputeDevice + ?Sized> ComputeDevice for Box<D> {
    fn extent(&self) -> Extent {
        (**self).extent()
    }

    fn shade(&mut self, camera: &Camera, clear_color: glam::Vec3) -> Result<(), DispatchError> {
        (**self).shade(camera, clear_color)
    }

    fn present(&mut self) -> Result<(), DispatchError> {
        (**self).present()
    }

    fn read_display(&mut self, pixels: &mut [u32]) -> Result<(), DispatchError> {
        (**self).read_display(pixels)
    }
}

/// Owns a compute device and the host copy of the display buffer, and drives
/// one frame at a time through it.
pub struct Dispatcher<D: ComputeDevice> {
    device: D,
    pixels: Vec<u32>,
}

impl<D: ComputeDevice> Dispatcher<D> {
    pub fn new(device: D) -> Self {
        let pixels = vec![0; device.extent().pixel_count()];
        Self { device, pixels }
    }

    pub fn extent(&self) -> Extent {
        self.device.extent()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Display pixels of the last frame that completed, RGBA8 packed.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Renders one frame and returns its display pixels. On error the host
    /// buffer may hold a partial readback and should not be shown.
    pub fn frame(
        &mut self,
        camera: &Camera,
        clear_color: glam::Vec3,
    ) -> Result<&[u32], DispatchError> {
        self.device.shade(camera, clear_color)?;
        self.device.present()?;
        self.device.read_display(&mut self.pixels)?;
        Ok(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workgroups_cover_partial_tiles() {
        assert_eq!(Extent::new(1280, 720).workgroups(), (80, 45));
        assert_eq!(Extent::new(17, 1).workgroups(), (2, 1));
    }

    #[test]
    fn coordinates_are_row_major() {
        let extent = Extent::new(4, 3);
        assert_eq!(extent.coordinates(0), (0, 0));
        assert_eq!(extent.coordinates(5), (1, 1));
        assert_eq!(extent.coordinates(11), (3, 2));
        assert_eq!(extent.pixel_count(), 12);
    }
}
