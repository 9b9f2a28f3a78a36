//! Scene aggregate: an unordered list of spheres with closest-hit search.

use crate::error::{EngineError, EngineResult};
use crate::hittable::{HitRecord, Hittable};
use crate::{Color, Material, Ray, Sphere};
use std::sync::Arc;
use uncleray_math::{Interval, Vec3};

/// Scripted radius animation for one primitive.
///
/// `radius(t) = base_radius + amplitude * sin(t * speed)` with `t` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Index of the animated primitive in the scene
    pub primitive: usize,
    pub base_radius: f32,
    pub amplitude: f32,
    /// Angular speed in radians per second
    pub speed: f32,
}

impl Pulse {
    pub fn radius_at(&self, elapsed_secs: f32) -> f32 {
        self.base_radius + self.amplitude * (elapsed_secs * self.speed).sin()
    }
}

/// A list of spheres searched linearly.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<Sphere>,
    pulse: Option<Pulse>,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sphere and return its index.
    pub fn add(&mut self, sphere: Sphere) -> usize {
        self.objects.push(sphere);
        self.objects.len() - 1
    }

    /// Designate the primitive whose radius follows `pulse`.
    pub fn set_pulse(&mut self, pulse: Pulse) -> EngineResult<()> {
        if pulse.primitive >= self.objects.len() {
            return Err(EngineError::InvalidPulse {
                index: pulse.primitive,
                len: self.objects.len(),
            });
        }
        self.pulse = Some(pulse);
        Ok(())
    }

    pub fn pulse(&self) -> Option<&Pulse> {
        self.pulse.as_ref()
    }

    pub fn objects(&self) -> &[Sphere] {
        &self.objects
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Apply the scripted pulse for the given time.
    ///
    /// Must only run between frames, never while bands are in flight.
    pub(crate) fn animate(&mut self, elapsed_secs: f32) {
        if let Some(pulse) = self.pulse {
            if let Some(sphere) = self.objects.get_mut(pulse.primitive) {
                sphere.set_radius(pulse.radius_at(elapsed_secs));
            }
        }
    }

    /// The scene an engine renders when none is supplied.
    ///
    /// Ground, a pulsing soft reflector in the middle, a hollow glass ball on
    /// the left, a brushed metal ball on the right and a small tinted lens in
    /// front.
    pub fn demo() -> Self {
        let ground = Arc::new(Material::matte(Color::new(0.8, 0.8, 0.0)));
        let center = Arc::new(Material::soft_reflect(
            Color::new(0.1, 0.2, 0.5),
            Some(Color::new(0.9, 0.9, 0.9)),
            0.3,
            0.05,
        ));
        let glass = Arc::new(Material::glass(1.5));
        let metal = Arc::new(Material::metal(Color::new(0.8, 0.6, 0.2), 0.1));
        let tinted = Arc::new(Material::refractive(
            Color::new(0.9, 0.2, 0.2),
            1.3,
            0.7,
            0.02,
        ));

        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::new(0.0, -100.5, -1.0), 100.0, ground));
        let pulsing = scene.add(Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, center));
        scene.add(Sphere::new(Vec3::new(-1.0, 0.0, -1.0), 0.5, Arc::clone(&glass)));
        scene.add(Sphere::new(Vec3::new(-1.0, 0.0, -1.0), -0.45, glass));
        scene.add(Sphere::new(Vec3::new(1.0, 0.0, -1.0), 0.5, metal));
        scene.add(Sphere::new(Vec3::new(0.35, -0.35, -0.5), 0.12, tinted));

        scene.pulse = Some(Pulse {
            primitive: pulsing,
            base_radius: 0.5,
            amplitude: 0.1,
            speed: 1.0,
        });
        scene
    }
}

impl Hittable for Scene {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        let mut closest: Option<HitRecord<'a>> = None;

        // Unordered list, so every object is tested
        for object in &self.objects {
            let max = closest.map_or(ray_t.max, |rec| rec.t);
            if let Some(rec) = object.hit(ray, ray_t.with_max(max)) {
                closest = Some(rec);
            }
        }

        closest
    }
}
