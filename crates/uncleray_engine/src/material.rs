//! Surface materials and the scattering protocol.
//!
//! Materials form a closed set dispatched by [`Material`]. Each variant is a
//! plain data struct with its own [`Scatter`] implementation.

use crate::hittable::HitRecord;
use crate::sampling::{
    gen_f32, near_zero, random_in_hemisphere, random_in_unit_sphere, random_unit_vector,
};
use crate::Ray;
use rand::RngCore;
use uncleray_math::Vec3;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Outcome of a successful scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    pub attenuation: Color,
    pub scattered: Ray,
}

/// A surface's response to an incoming ray.
pub trait Scatter {
    /// Returns the attenuation and outgoing ray, or `None` if the ray is absorbed.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore)
        -> Option<ScatterResult>;
}

/// Diffuse (Lambertian-like) material.
#[derive(Debug, Clone, PartialEq)]
pub struct Matte {
    pub albedo: Color,
}

impl Scatter for Matte {
    fn scatter(&self, _ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let mut direction = rec.normal + random_unit_vector(rng);

        // Catch degenerate scatter direction
        if near_zero(direction) {
            direction = rec.normal;
        }

        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

/// Reflective metal with optional fuzz.
#[derive(Debug, Clone, PartialEq)]
pub struct Metal {
    pub albedo: Color,
    /// Roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fuzz: f32,
}

impl Scatter for Metal {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let reflected = reflect(ray_in.direction(), rec.normal);
        let direction = if self.fuzz > 0.0 {
            reflected + self.fuzz * random_in_unit_sphere(rng)
        } else {
            reflected
        };

        // Only scatter if the reflected ray leaves the surface
        if direction.dot(rec.normal) > 0.0 {
            Some(ScatterResult {
                attenuation: self.albedo,
                scattered: Ray::new(rec.p, direction),
            })
        } else {
            None
        }
    }
}

/// Dielectric that is only partially opaque to the refractive lobe.
///
/// With probability `1 - opacity` the hit scatters diffusely and picks up
/// `albedo`; otherwise it refracts or reflects like clear glass.
#[derive(Debug, Clone, PartialEq)]
pub struct Refractive {
    pub albedo: Color,
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub refraction_index: f32,
    pub opacity: f32,
    pub blur: f32,
}

impl Scatter for Refractive {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        if gen_f32(rng) >= self.opacity {
            return Some(ScatterResult {
                attenuation: self.albedo,
                scattered: Ray::new(rec.p, random_in_hemisphere(rng, rec.normal)),
            });
        }

        let ratio = if rec.front_face {
            1.0 / self.refraction_index
        } else {
            self.refraction_index
        };

        let unit_direction = ray_in.direction().normalize();
        let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        // Total internal reflection
        let cannot_refract = ratio * sin_theta > 1.0;

        let bent = if cannot_refract || reflectance(cos_theta, ratio) > gen_f32(rng) {
            reflect(unit_direction, rec.normal)
        } else {
            refract(unit_direction, rec.normal, ratio)
        };

        let mut direction = if self.blur > 0.0 {
            bent + self.blur * random_in_hemisphere(rng, rec.normal)
        } else {
            bent
        };
        if near_zero(direction) {
            direction = bent;
        }

        Some(ScatterResult {
            attenuation: Color::ONE,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

/// Mix of a diffuse lobe and a blurred mirror lobe.
///
/// Both lobes are offset by `blur * random_in_hemisphere(normal)`. The
/// diffuse lobe starts from a hemisphere sample rather than being scaled by
/// `blur`, so a zero blur still scatters.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftReflect {
    pub flat_albedo: Color,
    /// Tint of the mirror lobe, `None` reuses `flat_albedo`
    pub reflect_albedo: Option<Color>,
    pub reflect_chance: f32,
    pub blur: f32,
}

impl Scatter for SoftReflect {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let (base, attenuation) = if gen_f32(rng) >= self.reflect_chance {
            (random_in_hemisphere(rng, rec.normal), self.flat_albedo)
        } else {
            (
                reflect(ray_in.direction(), rec.normal),
                self.reflect_albedo.unwrap_or(self.flat_albedo),
            )
        };

        let mut direction = if self.blur > 0.0 {
            base + self.blur * random_in_hemisphere(rng, rec.normal)
        } else {
            base
        };
        if near_zero(direction) {
            direction = rec.normal;
        }

        Some(ScatterResult {
            attenuation,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

/// The closed set of surface materials.
///
/// Materials are immutable once built and shared between primitives through
/// `Arc<Material>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Matte(Matte),
    Metal(Metal),
    Refractive(Refractive),
    SoftReflect(SoftReflect),
}

impl Material {
    pub fn matte(albedo: Color) -> Self {
        Material::Matte(Matte { albedo })
    }

    /// Create a metal; `fuzz` is clamped to [0, 1].
    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        Material::Metal(Metal {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        })
    }

    /// Create a refractive material; `opacity` is clamped to [0, 1].
    pub fn refractive(albedo: Color, refraction_index: f32, opacity: f32, blur: f32) -> Self {
        Material::Refractive(Refractive {
            albedo,
            refraction_index,
            opacity: opacity.clamp(0.0, 1.0),
            blur: blur.max(0.0),
        })
    }

    /// Clear glass: fully opaque to the refractive lobe, untinted, unblurred.
    pub fn glass(refraction_index: f32) -> Self {
        Self::refractive(Color::ONE, refraction_index, 1.0, 0.0)
    }

    /// Create a soft reflector; `reflect_chance` is clamped to [0, 1].
    pub fn soft_reflect(
        flat_albedo: Color,
        reflect_albedo: Option<Color>,
        reflect_chance: f32,
        blur: f32,
    ) -> Self {
        Material::SoftReflect(SoftReflect {
            flat_albedo,
            reflect_albedo,
            reflect_chance: reflect_chance.clamp(0.0, 1.0),
            blur: blur.max(0.0),
        })
    }
}

impl Scatter for Material {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        match self {
            Material::Matte(m) => m.scatter(ray_in, rec, rng),
            Material::Metal(m) => m.scatter(ray_in, rec, rng),
            Material::Refractive(m) => m.scatter(ray_in, rec, rng),
            Material::SoftReflect(m) => m.scatter(ray_in, rec, rng),
        }
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with relative index `ratio`.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, ratio: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = ratio * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance.
#[inline]
pub fn reflectance(cosine: f32, ratio: f32) -> f32 {
    let r0 = ((1.0 - ratio) / (1.0 + ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
