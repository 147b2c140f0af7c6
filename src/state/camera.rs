// Orbit camera: yaw/pitch around the dashboard origin plus a clamped distance.
use std::f64::consts::PI;

use crate::geometry::{NdcPoint, Ray, ScreenPoint, Vec3, Viewport};

pub const PITCH_LIMIT: f64 = PI / 3.0;
pub const MIN_DISTANCE: f64 = 2.0;
pub const MAX_DISTANCE: f64 = 10.0;
pub const NEAR_PLANE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub yaw: f64,
    pub pitch: f64,
    pub distance: f64,
    /// Vertical field of view in radians.
    pub fov_y: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 5.0,
            fov_y: 50f64.to_radians(),
        }
    }
}

/// Eye position and orthonormal view axes.
#[derive(Debug, Clone, Copy)]
pub struct CameraBasis {
    pub eye: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl CameraState {
    /// Applies an orbit step: `yaw -= dx * speed`, `pitch -= dy * speed`.
    pub fn orbit(&mut self, dx: f64, dy: f64, speed: f64) {
        self.yaw -= dx * speed;
        self.pitch = (self.pitch - dy * speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Multiplies the distance by `ratio` (pinch) and re-clamps.
    pub fn scale_distance(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.set_distance(self.distance * ratio);
        }
    }

    /// Wheel zoom: adds `delta * speed` to the distance.
    pub fn zoom_by(&mut self, delta: f64, speed: f64) {
        if delta.is_finite() {
            self.set_distance(self.distance + delta * speed);
        }
    }

    fn set_distance(&mut self, d: f64) {
        self.distance = d.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn basis(&self) -> CameraBasis {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let forward = Vec3::new(-cp * sy, -sp, -cp * cy);
        let right = forward.cross(Vec3::UP).normalize();
        let up = right.cross(forward);
        CameraBasis { eye: -forward * self.distance, forward, right, up }
    }

    fn tan_half_fov(&self) -> f64 {
        (self.fov_y * 0.5).tan()
    }

    /// Ray from the eye through a pointer position.
    pub fn ray_from_ndc(&self, p: NdcPoint, aspect: f64) -> Ray {
        let b = self.basis();
        let t = self.tan_half_fov();
        let dir = b.forward + b.right * (p.x * t * aspect) + b.up * (p.y * t);
        Ray::new(b.eye, dir)
    }

    /// NDC position and view depth of a world point, `None` when behind the near plane.
    pub fn project_to_ndc(&self, point: Vec3, aspect: f64) -> Option<(f64, f64, f64)> {
        let b = self.basis();
        let v = point - b.eye;
        let depth = v.dot(b.forward);
        if depth <= NEAR_PLANE {
            return None;
        }
        let t = self.tan_half_fov();
        let x = v.dot(b.right) / (depth * t * aspect);
        let y = v.dot(b.up) / (depth * t);
        Some((x, y, depth))
    }

    pub fn project_to_screen(&self, point: Vec3, viewport: Viewport) -> Option<ScreenPoint> {
        let (x, y, _) = self.project_to_ndc(point, viewport.aspect())?;
        Some(viewport.ndc_to_screen(x, y))
    }

    /// Pixels covered by one world unit at `depth`.
    pub fn pixels_per_unit(&self, depth: f64, viewport: Viewport) -> f64 {
        if depth <= 0.0 {
            return 0.0;
        }
        (viewport.height * 0.5) / (self.tan_half_fov() * depth)
    }
}
