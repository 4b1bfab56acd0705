//! Host rendition of the per-pixel shading kernel.
//!
//! Everything here is a pure function of its arguments so it can be evaluated
//! for any pixel in any order. `asset/kernel/raytracer.wgsl` implements the
//! same math for the device; keep the two in step.

use crate::{
    camera::Camera,
    compute::Extent,
    scene::{Scene, Sphere},
};

/// Light reaching every hit regardless of the light list.
pub const AMBIENT: f32 = 0.1;
pub const SPECULAR_STRENGTH: f32 = 0.5;
pub const SHININESS: f32 = 32.0;
/// Offset along the normal applied to shadow ray origins.
pub const SHADOW_BIAS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: glam::Vec3,
    pub direction: glam::Vec3,
}

impl Ray {
    pub fn new(origin: glam::Vec3, direction: glam::Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> glam::Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f32,
    /// Index into the scene's sphere list.
    pub sphere: usize,
}

/// Smallest positive `t` with `|O + tD - C| = r`, if any.
pub fn intersect(sphere: &Sphere, ray: &Ray) -> Option<f32> {
    // a t^2 + 2 b t + c = 0
    // where
    // a = D.D
    // b = (O - C).D
    // c = |O - C|^2 - r^2
    let oc = ray.origin - sphere.center;
    let a = ray.direction.length_squared();
    let b = oc.dot(ray.direction);
    // Factored to keep precision when |O - C| and r are both large.
    let distance = oc.length();
    let c = (distance - sphere.radius) * (distance + sphere.radius);

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    // A tangent ray has a zero discriminant and both roots coincide.
    let root = discriminant.sqrt();
    let near = (-b - root) / a;
    if near > 0.0 {
        return Some(near);
    }
    let far = (-b + root) / a;
    (far > 0.0).then_some(far)
}

/// Linear scan for the closest sphere. On exact ties the earlier sphere wins.
pub fn nearest_hit(spheres: &[Sphere], ray: &Ray) -> Option<Hit> {
    spheres
        .iter()
        .enumerate()
        .filter_map(|(index, sphere)| intersect(sphere, ray).map(|t| Hit { t, sphere: index }))
        .fold(None, |nearest: Option<Hit>, hit| match nearest {
            Some(nearest) if nearest.t <= hit.t => Some(nearest),
            _ => Some(hit),
        })
}

/// Whether any sphere crosses the ray strictly between 0 and `max_t`.
pub fn occluded(spheres: &[Sphere], ray: &Ray, max_t: f32) -> bool {
    spheres
        .iter()
        .filter_map(|sphere| intersect(sphere, ray))
        .any(|t| t < max_t)
}

/// Color seen along `ray`: ambient plus Phong diffuse/specular from every
/// light with a clear line of sight, clamped to `[0, 1]`.
pub fn trace(ray: &Ray, scene: &Scene, clear_color: glam::Vec3) -> glam::Vec3 {
    let spheres = scene.spheres();
    let Some(hit) = nearest_hit(spheres, ray) else {
        return clear_color;
    };

    let sphere = &spheres[hit.sphere];
    let point = ray.at(hit.t);
    let normal = (point - sphere.center) / sphere.radius;
    let to_eye = -ray.direction;
    let shadow_origin = point + normal * SHADOW_BIAS;

    let mut color = sphere.color * AMBIENT;
    for light in scene.lights() {
        let to_light = light.position - shadow_origin;
        let distance = to_light.length();
        let light_dir = to_light / distance;

        if occluded(spheres, &Ray::new(shadow_origin, light_dir), distance) {
            continue;
        }

        let radiance = light.color * light.intensity;
        let diffuse = normal.dot(light_dir).max(0.0);
        let specular = if diffuse > 0.0 {
            let reflected = reflect(-light_dir, normal);
            reflected.dot(to_eye).max(0.0).powf(SHININESS) * SPECULAR_STRENGTH
        } else {
            0.0
        };

        color += (sphere.color * diffuse + glam::Vec3::splat(specular)) * radiance;
    }

    color.clamp(glam::Vec3::ZERO, glam::Vec3::ONE)
}

/// The shading kernel: color of pixel `(x, y)`.
pub fn shade_pixel(
    x: u32,
    y: u32,
    extent: Extent,
    camera: &Camera,
    scene: &Scene,
    clear_color: glam::Vec3,
) -> glam::Vec3 {
    trace(&camera.ray_through(x, y, extent), scene, clear_color)
}

fn reflect(incident: glam::Vec3, normal: glam::Vec3) -> glam::Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}
