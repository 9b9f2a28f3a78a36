//! Camera for ray generation.

use crate::error::{EngineError, EngineResult};
use crate::sampling::random_in_unit_disk;
use crate::Ray;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uncleray_math::Vec3;

/// Construction parameters for a [`Camera`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Lens diameter, 0.0 = pinhole
    pub aperture: f32,
    /// Distance to the plane of perfect focus.
    /// `None` focuses on `look_at`.
    pub focus_distance: Option<f32>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            vfov: 90.0,
            aperture: 0.0,
            focus_distance: None,
        }
    }
}

impl CameraSettings {
    /// Set camera position.
    pub fn with_position(mut self, position: Vec3, look_at: Vec3, up: Vec3) -> Self {
        self.position = position;
        self.look_at = look_at;
        self.up = up;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_distance: Option<f32>) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_distance = focus_distance;
        self
    }

    /// Focus distance actually used by the camera.
    pub fn resolved_focus_distance(&self) -> f32 {
        self.focus_distance
            .unwrap_or_else(|| (self.position - self.look_at).length())
    }

    /// Reject settings that cannot produce an orthonormal basis.
    pub fn validate(&self) -> EngineResult<()> {
        let view = self.look_at - self.position;
        if view.length_squared() == 0.0 {
            return Err(EngineError::InvalidCamera(
                "position and look_at coincide".into(),
            ));
        }
        if view.cross(self.up).length_squared() == 0.0 {
            return Err(EngineError::InvalidCamera(
                "up vector is parallel to the view direction".into(),
            ));
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(EngineError::InvalidCamera(format!(
                "vertical field of view {} is outside (0, 180)",
                self.vfov
            )));
        }
        if self.aperture < 0.0 {
            return Err(EngineError::InvalidCamera(format!(
                "aperture {} is negative",
                self.aperture
            )));
        }
        let focus = self.resolved_focus_distance();
        if !(focus > 0.0 && focus.is_finite()) {
            return Err(EngineError::InvalidCamera(format!(
                "focus distance {} must be positive",
                focus
            )));
        }
        Ok(())
    }
}

/// Immutable pinhole/thin-lens camera.
#[derive(Debug, Clone)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    // Orthonormal basis: w points backwards, away from the view direction
    u: Vec3,
    v: Vec3,
    w: Vec3,
    viewport_width: f32,
    viewport_height: f32,
    lens_radius: f32,
}

impl Camera {
    /// Derive a camera from its settings and the image aspect ratio (width / height).
    pub fn new(settings: &CameraSettings, aspect_ratio: f32) -> Self {
        let theta = settings.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * aspect_ratio;

        let w = (settings.position - settings.look_at).normalize();
        let u = settings.up.cross(w).normalize();
        let v = w.cross(u);

        let focus = settings.resolved_focus_distance();
        let origin = settings.position;
        let horizontal = focus * viewport_width * u;
        let vertical = focus * viewport_height * v;
        let lower_left_corner = origin - horizontal / 2.0 - vertical / 2.0 - focus * w;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            w,
            viewport_width,
            viewport_height,
            lens_radius: settings.aperture / 2.0,
        }
    }

    /// Generate a ray through normalized image-plane coordinates `s`, `t` in [0, 1].
    ///
    /// `(0, 0)` is the lower-left corner of the viewport. With a non-zero
    /// aperture the origin is jittered across the lens disk.
    pub fn cast_ray(&self, rng: &mut dyn RngCore, s: f32, t: f32) -> Ray {
        let offset = if self.lens_radius > 0.0 {
            let rd = self.lens_radius * random_in_unit_disk(rng);
            self.u * rd.x + self.v * rd.y
        } else {
            Vec3::ZERO
        };

        let origin = self.origin + offset;
        let direction =
            self.lower_left_corner + s * self.horizontal + t * self.vertical - origin;
        Ray::new(origin, direction)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn lens_radius(&self) -> f32 {
        self.lens_radius
    }
}
