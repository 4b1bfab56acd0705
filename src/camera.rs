use bytemuck::{Pod, Zeroable};
use serde::Deserialize;

use crate::{compute::Extent, engine::Ray, input::InputState, util::math::degree_to_radian};

/// Pinhole camera described by an orthonormal basis and the half extents of
/// the image plane at unit distance along `forward`.
///
/// `up` is `forward × right`, so it points towards increasing image rows
/// (downwards on screen); pixel row 0 therefore looks towards world +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: glam::Vec3,
    pub forward: glam::Vec3,
    pub right: glam::Vec3,
    pub up: glam::Vec3,
    pub width: f32,
    pub height: f32,
}

impl Camera {
    pub const WORLD_UP: glam::Vec3 = glam::Vec3::Y;

    /// Camera at the origin looking down -Z.
    pub fn setup(fov: f32, aspect_ratio: f32, fov_mode: FovMode) -> Self {
        let forward = glam::Vec3::NEG_Z;
        let right = forward.cross(Self::WORLD_UP).normalize();
        let up = forward.cross(right);
        let height = fov_mode.height_extent(fov);

        Self {
            position: glam::Vec3::ZERO,
            forward,
            right,
            up,
            width: height * aspect_ratio,
            height,
        }
    }

    /// Rebuilds the basis from scratch out of yaw and pitch in degrees.
    pub fn orient(&mut self, yaw: f32, pitch: f32) {
        let yaw = degree_to_radian(yaw);
        let pitch = degree_to_radian(pitch);

        self.forward = glam::vec3(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        // Closed form of normalize(forward × WORLD_UP); it does not depend on
        // pitch and stays defined when looking straight up or down.
        self.right = glam::vec3(-yaw.sin(), 0.0, yaw.cos());
        self.up = self.forward.cross(self.right);
    }

    /// Primary ray through the center of pixel `(x, y)`.
    pub fn ray_through(&self, x: u32, y: u32, extent: Extent) -> Ray {
        let u = (x as f32 + 0.5) / extent.width as f32 * 2.0 - 1.0;
        let v = (y as f32 + 0.5) / extent.height as f32 * 2.0 - 1.0;
        let direction =
            (self.forward + u * self.right * self.width + v * self.up * self.height).normalize();
        Ray::new(self.position, direction)
    }

    pub fn to_gpu(&self) -> GpuCamera {
        GpuCamera {
            position: self.position.to_array(),
            _padding0: 0.0,
            forward: self.forward.to_array(),
            _padding1: 0.0,
            right: self.right.to_array(),
            _padding2: 0.0,
            up: self.up.to_array(),
            width: self.width,
            height: self.height,
            _padding3: [0.0; 3],
        }
    }
}

/// How the configured field of view becomes the vertical image-plane extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FovMode {
    /// `tan(fov)` with the degree value passed straight to `tan`. For 60 this
    /// gives a much narrower view than a 60 degree lens.
    #[default]
    Literal,
    /// `tan(fov / 2)` with `fov` converted to radians, i.e. a true vertical FOV.
    HalfAngleDegrees,
}

impl FovMode {
    pub fn height_extent(self, fov: f32) -> f32 {
        match self {
            Self::Literal => fov.tan(),
            Self::HalfAngleDegrees => (degree_to_radian(fov) / 2.0).tan(),
        }
    }
}

/// Camera as laid out in the kernel's uniform `Camera` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuCamera {
    pub position: [f32; 3],
    pub _padding0: f32,
    pub forward: [f32; 3],
    pub _padding1: f32,
    pub right: [f32; 3],
    pub _padding2: f32,
    pub up: [f32; 3],
    pub width: f32,
    pub height: f32,
    pub _padding3: [f32; 3],
}

/// Turns held keys into camera motion. Owns the orientation angles so the
/// basis can be rebuilt every tick without drift.
#[derive(Debug, Clone)]
pub struct CameraController {
    yaw: f32,
    pitch: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    /// World units per second.
    pub speed: f32,
}

impl CameraController {
    /// Yaw that reproduces the -Z forward of [`Camera::setup`].
    pub const INITIAL_YAW: f32 = -90.0;

    pub fn new(rotation_speed: f32, speed: f32) -> Self {
        Self {
            yaw: Self::INITIAL_YAW,
            pitch: 0.0,
            rotation_speed,
            speed,
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Integrates one tick of input: rotate, rebuild the basis, then translate
    /// along the ground-projected forward/right and world up.
    pub fn update(&mut self, camera: &mut Camera, delta_time: f32, input: InputState) {
        let turn = self.rotation_speed * delta_time;
        self.yaw = (self.yaw + turn * input.axis(InputState::TURN_LEFT, InputState::TURN_RIGHT))
            % 360.0;
        self.pitch = (self.pitch + turn * input.axis(InputState::LOOK_DOWN, InputState::LOOK_UP))
            .clamp(-90.0, 90.0);

        camera.orient(self.yaw, self.pitch);

        let forward = glam::vec3(camera.forward.x, 0.0, camera.forward.z);
        let right = glam::vec3(camera.right.x, 0.0, camera.right.z);
        let step = self.speed * delta_time;

        camera.position += forward * step * input.axis(InputState::BACKWARD, InputState::FORWARD);
        camera.position += right * step * input.axis(InputState::LEFT, InputState::RIGHT);
        camera.position +=
            Camera::WORLD_UP * step * input.axis(InputState::DESCEND, InputState::ASCEND);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn assert_orthonormal(camera: &Camera) {
        assert_abs_diff_eq!(camera.forward.length(), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.right.length(), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.up.length(), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.forward.dot(camera.right), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.forward.dot(camera.up), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.right.dot(camera.up), 0.0, epsilon = EPSILON);
        // right-handed: right × up == forward
        let handed = camera.right.cross(camera.up);
        assert_abs_diff_eq!(handed.distance(camera.forward), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn setup_looks_down_negative_z() {
        let camera = Camera::setup(60.0, 16.0 / 9.0, FovMode::Literal);
        assert_eq!(camera.position, glam::Vec3::ZERO);
        assert_eq!(camera.forward, glam::Vec3::NEG_Z);
        assert_eq!(camera.right, glam::Vec3::X);
        assert_eq!(camera.up, glam::Vec3::NEG_Y);
        assert_orthonormal(&camera);
    }

    #[test]
    fn literal_fov_feeds_degrees_to_tan() {
        let camera = Camera::setup(60.0, 2.0, FovMode::Literal);
        assert_eq!(camera.height, 60.0_f32.tan());
        assert_eq!(camera.width, camera.height * 2.0);
    }

    #[test]
    fn half_angle_fov_is_a_true_vertical_fov() {
        let camera = Camera::setup(60.0, 1.0, FovMode::HalfAngleDegrees);
        assert_abs_diff_eq!(camera.height, 30.0_f32.to_radians().tan(), epsilon = EPSILON);
    }

    #[test]
    fn idle_update_keeps_initial_orientation() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);
        controller.update(&mut camera, 0.016, InputState::empty());

        assert_abs_diff_eq!(camera.forward.distance(glam::Vec3::NEG_Z), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.right.distance(glam::Vec3::X), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.up.distance(glam::Vec3::NEG_Y), 0.0, epsilon = EPSILON);
        assert_eq!(camera.position, glam::Vec3::ZERO);
    }

    #[test]
    fn yaw_stays_within_one_turn() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);

        for delta in [0.016, 0.5, 3.0, 11.25, 100.0] {
            for _ in 0..200 {
                controller.update(&mut camera, delta, InputState::TURN_RIGHT);
                assert!(controller.yaw() > -360.0 && controller.yaw() < 360.0);
            }
            for _ in 0..400 {
                controller.update(&mut camera, delta, InputState::TURN_LEFT);
                assert!(controller.yaw() > -360.0 && controller.yaw() < 360.0);
            }
        }
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);

        for _ in 0..100 {
            controller.update(&mut camera, 0.25, InputState::LOOK_UP);
            assert!(controller.pitch() <= 90.0);
        }
        assert_eq!(controller.pitch(), 90.0);
        assert_orthonormal(&camera);

        for _ in 0..100 {
            controller.update(&mut camera, 0.25, InputState::LOOK_DOWN);
            assert!(controller.pitch() >= -90.0);
        }
        assert_eq!(controller.pitch(), -90.0);
        assert_orthonormal(&camera);
    }

    #[test]
    fn basis_stays_orthonormal_under_mixed_input() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);
        let inputs = [
            InputState::TURN_LEFT | InputState::LOOK_UP,
            InputState::FORWARD | InputState::TURN_RIGHT,
            InputState::LOOK_DOWN | InputState::RIGHT | InputState::ASCEND,
            InputState::LOOK_UP | InputState::LEFT,
            InputState::TURN_LEFT | InputState::BACKWARD | InputState::DESCEND,
        ];

        for tick in 0..5000 {
            let input = inputs[tick % inputs.len()];
            let delta = 0.001 + (tick % 17) as f32 * 0.013;
            controller.update(&mut camera, delta, input);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn right_matches_normalized_cross_product() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        camera.orient(37.0, 45.0);
        let expected = camera.forward.cross(Camera::WORLD_UP).normalize();
        assert_abs_diff_eq!(camera.right.distance(expected), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn moves_along_flattened_forward() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);
        controller.update(&mut camera, 1.0, InputState::FORWARD);

        assert_abs_diff_eq!(camera.position.x, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.position.y, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.position.z, -4.0, epsilon = EPSILON);
    }

    #[test]
    fn vertical_movement_ignores_pitch() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);
        controller.update(&mut camera, 0.5, InputState::LOOK_UP);
        let pitched = camera.position;

        controller.update(&mut camera, 0.5, InputState::ASCEND);
        assert_abs_diff_eq!(camera.position.y - pitched.y, 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.position.x, pitched.x, epsilon = EPSILON);
        assert_abs_diff_eq!(camera.position.z, pitched.z, epsilon = EPSILON);
    }

    #[test]
    fn strafing_follows_right() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let mut controller = CameraController::new(64.0, 4.0);
        controller.update(&mut camera, 0.25, InputState::RIGHT);
        assert_abs_diff_eq!(camera.position.x, 1.0, epsilon = EPSILON);

        controller.update(&mut camera, 0.5, InputState::LEFT);
        assert_abs_diff_eq!(camera.position.x, -1.0, epsilon = EPSILON);
    }

    #[test]
    fn center_ray_follows_forward() {
        let mut camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        camera.orient(20.0, -10.0);
        let ray = camera.ray_through(1, 1, Extent::new(3, 3));
        assert_abs_diff_eq!(ray.direction.distance(camera.forward), 0.0, epsilon = EPSILON);
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn top_row_looks_up() {
        let camera = Camera::setup(60.0, 1.0, FovMode::Literal);
        let ray = camera.ray_through(1, 0, Extent::new(3, 3));
        assert!(ray.direction.y > 0.0);
        let ray = camera.ray_through(0, 1, Extent::new(3, 3));
        assert!(ray.direction.x < 0.0);
    }

    #[test]
    fn gpu_camera_layout_matches_kernel_struct() {
        assert_eq!(std::mem::size_of::<GpuCamera>(), 80);
        let camera = Camera::setup(60.0, 1.0, FovMode::Literal).to_gpu();
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&camera));
        assert_eq!(&floats[4..7], &[0.0, 0.0, -1.0]);
        assert_eq!(floats[15], camera.width);
        assert_eq!(floats[16], camera.height);
    }
}
