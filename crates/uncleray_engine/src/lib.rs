//! UncleRay engine - CPU path tracing
//!
//! A Monte Carlo path tracer over spheres with matte, metal, refractive and
//! soft-reflect materials. Frames are rendered in horizontal row bands on a
//! rayon worker pool, optionally refined progressively across frames.
//!
//! The engine only produces a raw B/G/R byte framebuffer; encoding it to an
//! image file or putting it on screen is left to the caller.

mod band;
mod camera;
mod engine;
mod error;
mod framebuffer;
mod hittable;
mod material;
mod renderer;
mod sampling;
mod scene;
mod settings;
mod sphere;

pub use band::{generate_bands, Band};
pub use camera::{Camera, CameraSettings};
pub use engine::{CancelToken, Engine, FrameStatus, PartialFrameFn};
pub use error::{EngineError, EngineResult};
pub use framebuffer::{blend, Framebuffer, BYTES_PER_PIXEL};
pub use hittable::{HitRecord, Hittable};
pub use material::{
    reflect, reflectance, refract, Color, Material, Matte, Metal, Refractive, Scatter,
    ScatterResult, SoftReflect,
};
pub use renderer::{color_to_bgr, linear_to_gamma, ray_color, PixelSampler, Sky, T_MIN};
pub use sampling::{
    gen_f32, near_zero, random_in_cube, random_in_hemisphere, random_in_unit_disk,
    random_in_unit_sphere, random_unit_vector,
};
pub use scene::{Pulse, Scene};
pub use settings::{EngineSettings, SeedMode, DEFAULT_CHUNK_HEIGHT};
pub use sphere::Sphere;

/// Re-export Vec3 and common math types from uncleray_math
pub use uncleray_math::{Interval, Ray, Vec3};
