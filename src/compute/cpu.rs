use rayon::prelude::*;

use crate::{
    camera::Camera,
    engine,
    error::DispatchError,
    present,
    scene::Scene,
};

use super::{ComputeDevice, Extent};

/// Compute device backed by the rayon thread pool.
///
/// Both stages are a parallel-for over every pixel index; rayon gives no
/// ordering between invocations, and `for_each` returning is the barrier.
pub struct CpuDevice {
    extent: Extent,
    scene: Scene,
    framebuffer: Vec<glam::Vec3>,
    display: Vec<u32>,
}

impl CpuDevice {
    pub fn new(scene: &Scene, extent: Extent) -> Self {
        tracing::info!(
            threads = rayon::current_num_threads(),
            width = extent.width,
            height = extent.height,
            "using cpu compute device"
        );
        Self {
            extent,
            scene: scene.clone(),
            framebuffer: vec![glam::Vec3::ZERO; extent.pixel_count()],
            display: vec![0; extent.pixel_count()],
        }
    }

    /// Linear colors written by the last shading stage.
    pub fn framebuffer(&self) -> &[glam::Vec3] {
        &self.framebuffer
    }
}

impl ComputeDevice for CpuDevice {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn shade(&mut self, camera: &Camera, clear_color: glam::Vec3) -> Result<(), DispatchError> {
        let extent = self.extent;
        let scene = &self.scene;
        self.framebuffer
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, pixel)| {
                let (x, y) = extent.coordinates(index);
                *pixel = engine::shade_pixel(x, y, extent, camera, scene, clear_color);
            });
        Ok(())
    }

    fn present(&mut self) -> Result<(), DispatchError> {
        present::present(&self.framebuffer, &mut self.display);
        Ok(())
    }

    fn read_display(&mut self, pixels: &mut [u32]) -> Result<(), DispatchError> {
        if pixels.len() != self.display.len() {
            return Err(DispatchError::SizeMismatch {
                expected: self.display.len(),
                actual: pixels.len(),
            });
        }
        pixels.copy_from_slice(&self.display);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FovMode;

    #[test]
    fn rejects_wrong_sized_host_buffer() {
        let mut device = CpuDevice::new(&Scene::empty(), Extent::new(4, 4));
        let mut pixels = vec![0; 15];
        let err = device.read_display(&mut pixels).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::SizeMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn framebuffer_is_overwritten_each_frame() {
        let extent = Extent::new(8, 8);
        let mut device = CpuDevice::new(&Scene::empty(), extent);
        let camera = Camera::setup(60.0, extent.aspect_ratio(), FovMode::Literal);

        device.shade(&camera, glam::Vec3::ONE).unwrap();
        device.shade(&camera, glam::vec3(0.1, 0.2, 0.3)).unwrap();
        assert!(device
            .framebuffer()
            .iter()
            .all(|pixel| *pixel == glam::vec3(0.1, 0.2, 0.3)));
    }
}
