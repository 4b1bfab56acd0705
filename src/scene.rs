use bytemuck::{Pod, Zeroable};

/// Immutable set of spheres and point lights for one run.
///
/// Both collections are fixed at construction; there is no way to add or
/// remove objects afterwards, so device copies never go stale.
#[derive(Debug, Clone)]
pub struct Scene {
    spheres: Box<[Sphere]>,
    lights: Box<[Light]>,
}

impl Scene {
    pub fn new(spheres: Vec<Sphere>, lights: Vec<Light>) -> Self {
        Self {
            spheres: spheres.into_boxed_slice(),
            lights: lights.into_boxed_slice(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Device layout of the spheres, in scene order.
    pub fn gpu_spheres(&self) -> Vec<GpuSphere> {
        self.spheres.iter().map(GpuSphere::from).collect()
    }

    /// Device layout of the lights, in scene order.
    pub fn gpu_lights(&self) -> Vec<GpuLight> {
        self.lights.iter().map(GpuLight::from).collect()
    }
}

impl Default for Scene {
    /// Four small spheres around the origin standing on a huge ground sphere,
    /// lit by a single white light.
    fn default() -> Self {
        Self::new(
            vec![
                Sphere::new(glam::vec3(-8.0, 0.0, 0.0), 1.0, glam::Vec3::splat(0.5)),
                Sphere::new(glam::vec3(0.0, 0.0, -8.0), 1.0, glam::vec3(0.0, 0.5, 0.0)),
                Sphere::new(glam::vec3(8.0, 0.0, 0.0), 1.0, glam::vec3(0.0, 0.0, 0.5)),
                Sphere::new(glam::vec3(0.0, 0.0, 8.0), 1.0, glam::vec3(0.5, 0.0, 0.0)),
                Sphere::new(glam::vec3(0.0, -5001.0, 0.0), 5000.0, glam::vec3(1.0, 1.0, 0.0)),
            ],
            vec![Light::new(glam::vec3(0.0, 1.0, 0.0), 0.6, glam::Vec3::ONE)],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: glam::Vec3,
    pub radius: f32,

    pub color: glam::Vec3,
}

impl Sphere {
    pub fn new(center: glam::Vec3, radius: f32, color: glam::Vec3) -> Self {
        debug_assert!(radius > 0.0, "sphere radius must be positive");
        Self {
            center,
            radius,
            color,
        }
    }
}

/// Point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: glam::Vec3,
    pub intensity: f32,
    pub color: glam::Vec3,
}

impl Light {
    pub fn new(position: glam::Vec3, intensity: f32, color: glam::Vec3) -> Self {
        debug_assert!(intensity >= 0.0, "light intensity must not be negative");
        Self {
            position,
            intensity,
            color,
        }
    }
}

/// Sphere as laid out in the kernel's `array<Sphere>` storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuSphere {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub _padding: f32,
}

impl From<&Sphere> for GpuSphere {
    fn from(sphere: &Sphere) -> Self {
        Self {
            center: sphere.center.to_array(),
            radius: sphere.radius,
            color: sphere.color.to_array(),
            _padding: 0.0,
        }
    }
}

/// Light as laid out in the kernel's `array<Light>` storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub _padding: f32,
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.to_array(),
            intensity: light.intensity,
            color: light.color.to_array(),
            _padding: 0.0,
        }
    }
}
