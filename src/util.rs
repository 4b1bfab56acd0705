pub mod math {
    pub fn degree_to_radian(degree: f32) -> f32 {
        degree * std::f32::consts::PI / 180.0
    }

    /// Relative luminance of a linear rgb color (Rec. 601 weights).
    pub fn luminance(color: glam::Vec3) -> f32 {
        color.dot(glam::Vec3::new(0.299, 0.587, 0.114))
    }
}

#[cfg(test)]
mod tests {
    use super::math;
    use approx::assert_abs_diff_eq;

    #[test]
    fn converts_degrees() {
        assert_abs_diff_eq!(math::degree_to_radian(180.0), std::f32::consts::PI);
        assert_abs_diff_eq!(math::degree_to_radian(-90.0), -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn white_has_unit_luminance() {
        assert_abs_diff_eq!(math::luminance(glam::Vec3::ONE), 1.0, epsilon = 1e-6);
        assert_eq!(math::luminance(glam::Vec3::ZERO), 0.0);
    }
}
