//! Core path tracing integrator.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with a hard bounce limit
//! - Sky gradient background on a miss
//! - Gamma correction and byte quantization

use crate::material::Scatter;
use crate::sampling::gen_f32;
use crate::{Camera, Color, Hittable, Ray};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uncleray_math::Interval;

/// Minimum hit distance, avoids self-intersection acne.
pub const T_MIN: f32 = 0.001;

/// Vertical gradient returned for rays that escape the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sky {
    pub horizon: Color,
    pub zenith: Color,
}

impl Default for Sky {
    fn default() -> Self {
        Self {
            horizon: Color::ONE,
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }
}

impl Sky {
    /// Blend from horizon to zenith by the ray's normalized height.
    pub fn color(&self, ray: &Ray) -> Color {
        let unit_direction = ray.direction().normalize();
        let a = 0.5 * (unit_direction.y + 1.0);
        self.horizon.lerp(self.zenith, a)
    }
}

/// Compute the radiance carried back along `ray`.
///
/// `depth` is the number of bounces still allowed; at zero the path
/// contributes black.
pub fn ray_color(
    ray: &Ray,
    world: &dyn Hittable,
    depth: u32,
    sky: &Sky,
    rng: &mut dyn RngCore,
) -> Color {
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, Interval::new(T_MIN, f32::INFINITY)) else {
        return sky.color(ray);
    };

    match rec.material.scatter(ray, &rec, rng) {
        Some(result) => {
            result.attenuation * ray_color(&result.scattered, world, depth - 1, sky, rng)
        }
        // Absorbed
        None => Color::ZERO,
    }
}

/// Per-pixel sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct PixelSampler<'a> {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub max_depth: u32,
    pub jitter: bool,
    pub sky: &'a Sky,
}

impl PixelSampler<'_> {
    /// Average `samples_per_pixel` paths through pixel (x, y).
    ///
    /// `y` counts up from the bottom scanline, matching the camera's `t`.
    pub fn render_pixel(
        &self,
        camera: &Camera,
        world: &dyn Hittable,
        x: u32,
        y: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        // A single column or row maps to the viewport's lower-left edge
        let u_scale = self.width.saturating_sub(1).max(1) as f32;
        let v_scale = self.height.saturating_sub(1).max(1) as f32;

        let mut pixel_color = Color::ZERO;
        for _ in 0..self.samples_per_pixel {
            let (du, dv) = if self.jitter {
                (gen_f32(rng), gen_f32(rng))
            } else {
                (0.0, 0.0)
            };
            let u = (x as f32 + du) / u_scale;
            let v = (y as f32 + dv) / v_scale;

            let ray = camera.cast_ray(rng, u, v);
            pixel_color += ray_color(&ray, world, self.max_depth, self.sky, rng);
        }

        pixel_color / self.samples_per_pixel as f32
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected bytes in B, G, R order.
pub fn color_to_bgr(color: Color) -> [u8; 3] {
    let quantize = |c: f32| (255.0 * Interval::UNIT.clamp(linear_to_gamma(c))) as u8;
    [quantize(color.z), quantize(color.y), quantize(color.x)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraSettings, Material, Scene, Sphere, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn one_sphere(material: Material) -> Scene {
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, Arc::new(material)));
        scene
    }

    #[test]
    fn test_sky_gradient() {
        let sky = Sky::default();

        let up = sky.color(&Ray::new(Vec3::ZERO, Vec3::Y));
        let down = sky.color(&Ray::new(Vec3::ZERO, Vec3::NEG_Y));
        let level = sky.color(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -3.0)));

        assert!((up - sky.zenith).length() < 1e-6);
        assert!((down - sky.horizon).length() < 1e-6);
        assert!((level - Color::new(0.75, 0.85, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_miss_returns_sky() {
        let scene = Scene::new();
        let sky = Sky::default();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, 0.4, -1.0));

        assert_eq!(ray_color(&ray, &scene, 5, &sky, &mut rng), sky.color(&ray));
    }

    #[test]
    fn test_depth_zero_is_black() {
        let scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);

        assert_eq!(ray_color(&ray, &scene, 0, &Sky::default(), &mut rng), Color::ZERO);
    }

    #[test]
    fn test_absorbing_surface_is_black() {
        // Black metal still reflects, but contributes nothing
        let scene = one_sphere(Material::metal(Color::ZERO, 0.0));
        let mut rng = StdRng::seed_from_u64(2);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert_eq!(ray_color(&ray, &scene, 10, &Sky::default(), &mut rng), Color::ZERO);
    }

    #[test]
    fn test_attenuation_multiplies_down_the_path() {
        // Mirror facing the camera: reflected ray goes straight back to +Z sky
        let albedo = Color::new(0.5, 0.25, 1.0);
        let scene = one_sphere(Material::metal(albedo, 0.0));
        let sky = Sky::default();
        let mut rng = StdRng::seed_from_u64(3);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let color = ray_color(&ray, &scene, 10, &sky, &mut rng);
        let expected = albedo * sky.color(&Ray::new(Vec3::ZERO, Vec3::Z));
        assert!((color - expected).length() < 1e-5);

        // One bounce allowed: the reflected path is cut off
        assert_eq!(ray_color(&ray, &scene, 1, &sky, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_render_pixel_hits_sphere() {
        let scene = one_sphere(Material::matte(Color::new(0.5, 0.5, 0.5)));
        let camera = Camera::new(&CameraSettings::default(), 1.0);
        let sky = Sky::default();
        let sampler = PixelSampler {
            width: 11,
            height: 11,
            samples_per_pixel: 4,
            max_depth: 5,
            jitter: true,
            sky: &sky,
        };
        let mut rng = StdRng::seed_from_u64(42);

        let color = sampler.render_pixel(&camera, &scene, 5, 5, &mut rng);
        assert!(color.length() > 0.0);
        // Grey albedo can only darken the sky
        assert!(color.z < 0.5 + 1e-5);
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_bgr() {
        assert_eq!(color_to_bgr(Color::new(1.0, 0.25, 0.0)), [0, 127, 255]);
        // Out of range values clamp
        assert_eq!(color_to_bgr(Color::new(4.0, -1.0, 2.0)), [255, 0, 255]);
    }
}
