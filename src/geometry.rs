//! Small 3D math kit shared by the camera, hit testing and the canvas renderer.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > f64::EPSILON { self * (1.0 / len) } else { Vec3::ZERO }
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// Pointer position in normalized device coordinates: x and y in [-1, 1], y up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NdcPoint {
    pub x: f64,
    pub y: f64,
}

impl NdcPoint {
    #[cfg(test)]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Maps a client-space pixel position inside `rect` (left, top, width, height) to NDC.
    pub fn from_client(client_x: f64, client_y: f64, rect: (f64, f64, f64, f64)) -> Self {
        let (left, top, width, height) = rect;
        let width = width.max(1.0);
        let height = height.max(1.0);
        Self {
            x: ((client_x - left) / width) * 2.0 - 1.0,
            y: -((client_y - top) / height) * 2.0 + 1.0,
        }
    }

    pub fn distance(self, other: NdcPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Pixel position on the drawing surface, origin top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 { self.width / self.height } else { 1.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn ndc_to_screen(&self, x: f64, y: f64) -> ScreenPoint {
        ScreenPoint {
            x: (x * 0.5 + 0.5) * self.width,
            y: (-y * 0.5 + 0.5) * self.height,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize() }
    }

    #[cfg(test)]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Volumes used for pointer picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bounds {
    Sphere { center: Vec3, radius: f64 },
    Aabb { min: Vec3, max: Vec3 },
}

impl Bounds {
    pub fn sphere(center: Vec3, radius: f64) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn aabb_centered(center: Vec3, half_extents: Vec3) -> Self {
        Self::Aabb { min: center - half_extents, max: center + half_extents }
    }

    /// Box enclosing the segment `a..b` padded by `radius` on every axis.
    pub fn around_segment(a: Vec3, b: Vec3, radius: f64) -> Self {
        let pad = Vec3::new(radius, radius, radius);
        Self::Aabb { min: a.min(b) - pad, max: a.max(b) + pad }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        match *self {
            Bounds::Sphere { center, radius } => Bounds::Sphere { center: center + offset, radius },
            Bounds::Aabb { min, max } => Bounds::Aabb { min: min + offset, max: max + offset },
        }
    }

    /// Distance along the ray to the first intersection in front of its origin.
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        match *self {
            Bounds::Sphere { center, radius } => {
                let oc = ray.origin - center;
                let b = oc.dot(ray.direction);
                let c = oc.dot(oc) - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let near = -b - sq;
                let far = -b + sq;
                if near >= 0.0 {
                    Some(near)
                } else if far >= 0.0 {
                    Some(0.0)
                } else {
                    None
                }
            }
            Bounds::Aabb { min, max } => {
                let mut t_min = f64::NEG_INFINITY;
                let mut t_max = f64::INFINITY;
                let axes = [
                    (ray.origin.x, ray.direction.x, min.x, max.x),
                    (ray.origin.y, ray.direction.y, min.y, max.y),
                    (ray.origin.z, ray.direction.z, min.z, max.z),
                ];
                for (o, d, lo, hi) in axes {
                    if d.abs() < 1e-12 {
                        if o < lo || o > hi {
                            return None;
                        }
                        continue;
                    }
                    let t1 = (lo - o) / d;
                    let t2 = (hi - o) / d;
                    t_min = t_min.max(t1.min(t2));
                    t_max = t_max.min(t1.max(t2));
                    if t_min > t_max {
                        return None;
                    }
                }
                if t_max < 0.0 { None } else { Some(t_min.max(0.0)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndc_from_client_corners() {
        let rect = (10.0, 20.0, 200.0, 100.0);
        assert_eq!(NdcPoint::from_client(10.0, 20.0, rect), NdcPoint::new(-1.0, 1.0));
        assert_eq!(NdcPoint::from_client(210.0, 120.0, rect), NdcPoint::new(1.0, -1.0));
        assert_eq!(NdcPoint::from_client(110.0, 70.0, rect), NdcPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_sphere_hit_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let t = Bounds::sphere(Vec3::ZERO, 1.0).intersect(&ray).unwrap();
        assert!((t - 4.0).abs() < 1e-9);
        let miss = Bounds::sphere(Vec3::new(3.0, 0.0, 0.0), 1.0);
        assert!(miss.intersect(&ray).is_none());
    }

    #[test]
    fn test_aabb_hit_and_behind() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let boxed = Bounds::aabb_centered(Vec3::ZERO, Vec3::new(0.5, 0.5, 0.5));
        let t = boxed.intersect(&ray).unwrap();
        assert!((t - 4.5).abs() < 1e-9);
        let behind = Bounds::aabb_centered(Vec3::new(0.0, 0.0, 8.0), Vec3::new(0.5, 0.5, 0.5));
        assert!(behind.intersect(&ray).is_none());
    }

    #[test]
    fn test_viewport_ndc_to_screen() {
        let vp = Viewport::new(100.0, 50.0);
        assert_eq!(vp.ndc_to_screen(0.0, 0.0), ScreenPoint { x: 50.0, y: 25.0 });
        assert_eq!(vp.ndc_to_screen(-1.0, 1.0), ScreenPoint { x: 0.0, y: 0.0 });
    }
}
