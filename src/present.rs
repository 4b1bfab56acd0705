//! Conversion of the linear float framebuffer into display pixels.

use rayon::prelude::*;

/// Packs a linear color into RGBA8 with red in the lowest byte, matching
/// WGSL's `pack4x8unorm`. Channels are clamped to `[0, 1]` first; alpha is
/// always opaque. No gamma is applied.
pub fn pack_pixel(color: glam::Vec3) -> u32 {
    let [r, g, b] = color
        .clamp(glam::Vec3::ZERO, glam::Vec3::ONE)
        .to_array()
        .map(|channel| (channel * 255.0).round() as u32);
    r | (g << 8) | (b << 16) | (0xff << 24)
}

/// Inverse of [`pack_pixel`] up to quantization.
pub fn unpack_pixel(pixel: u32) -> glam::Vec3 {
    let [r, g, b, _] = pixel.to_le_bytes();
    glam::vec3(r as f32, g as f32, b as f32) / 255.0
}

/// The presentation stage: every display pixel from the framebuffer pixel at
/// the same index. Must only run once the shading stage has finished.
pub fn present(framebuffer: &[glam::Vec3], display: &mut [u32]) {
    debug_assert_eq!(framebuffer.len(), display.len());
    display
        .par_iter_mut()
        .zip(framebuffer.par_iter())
        .for_each(|(pixel, color)| *pixel = pack_pixel(*color));
}
