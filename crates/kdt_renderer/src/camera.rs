//! Pinhole camera for ray generation.

use crate::Ray;
use kdt_math::{lerp, Vec3};

/// Pinhole camera described by its image plane.
///
/// `lower_left`, `horizontal` and `vertical` are directions relative to
/// `origin`: the ray through image coordinate (u, v) points along
/// `lower_left + u * horizontal + v * vertical`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub lower_left: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
}

impl Camera {
    /// Camera one unit in front of the origin looking down -Z with a 2x1
    /// image plane.
    pub fn new() -> Self {
        let horizontal = Vec3::new(2.0, 0.0, 0.0);
        let vertical = Vec3::new(0.0, 1.0, 0.0);
        Self {
            origin: Vec3::new(0.0, 0.0, 1.0),
            lower_left: Vec3::NEG_Z - horizontal / 2.0 - vertical / 2.0,
            horizontal,
            vertical,
        }
    }

    /// Camera at `look_from` aimed at `look_at`.
    ///
    /// - `vfov`: vertical field of view in degrees
    /// - `aspect`: image width / height
    pub fn look_at(look_from: Vec3, look_at: Vec3, vup: Vec3, vfov: f64, aspect: f64) -> Self {
        let half_height = (vfov.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;

        // Camera basis
        let w = (look_from - look_at).normalize();
        let u = vup.cross(w).normalize();
        let v = w.cross(u);

        Self {
            origin: look_from,
            lower_left: -w - half_width * u - half_height * v,
            horizontal: 2.0 * half_width * u,
            vertical: 2.0 * half_height * v,
        }
    }

    /// Turntable path around the scene center, `f` in [0, 1].
    ///
    /// The first half swings from +Z to -X, the second from -X to -Z, at a
    /// distance of three units.
    pub fn orbit(f: f64) -> Self {
        let f = f.clamp(0.0, 1.0);
        let (t, from, to, right_from, right_to) = if f < 0.5 {
            (f * 2.0, Vec3::Z, Vec3::NEG_X, Vec3::X, Vec3::Z)
        } else {
            (f * 2.0 - 1.0, Vec3::NEG_X, Vec3::NEG_Z, Vec3::Z, Vec3::NEG_X)
        };

        let vertical = Vec3::Y;
        let horizontal = lerp(t, right_from, right_to) * 2.0;
        // Looking back at the center: opposite of the camera position
        let forward = -lerp(t, from, to);

        Self {
            origin: lerp(t, from, to) * 3.0,
            lower_left: forward - horizontal / 2.0 - vertical / 2.0,
            horizontal,
            vertical,
        }
    }

    /// Ray through normalized image coordinates (u, v), both in [0, 1],
    /// (0, 0) at the lower left. The direction is unit length.
    pub fn get_ray(&self, u: f64, v: f64) -> Ray {
        let direction = self.lower_left + u * self.horizontal + v * self.vertical;
        Ray::new(self.origin, direction.normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_center_ray() {
        let camera = Camera::new();
        let ray = camera.get_ray(0.5, 0.5);

        assert_eq!(ray.origin(), Vec3::new(0.0, 0.0, 1.0));
        assert!((ray.direction() - Vec3::NEG_Z).length() < 1e-12);
    }

    #[test]
    fn test_rays_are_normalized() {
        let camera = Camera::new();
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (0.3, 0.9), (1.0, 1.0)] {
            assert!((camera.get_ray(u, v).direction().length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_look_at_center_and_corners() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, 2.0);

        let center = camera.get_ray(0.5, 0.5);
        assert!((center.direction() - Vec3::NEG_Z).length() < 1e-12);

        // Lower left corner points left and down
        let corner = camera.get_ray(0.0, 0.0).direction();
        assert!(corner.x < 0.0 && corner.y < 0.0 && corner.z < 0.0);
    }

    #[test]
    fn test_orbit_keyframes() {
        let start = Camera::orbit(0.0);
        assert!((start.origin - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-12);
        assert!((start.get_ray(0.5, 0.5).direction() - Vec3::NEG_Z).length() < 1e-12);

        let middle = Camera::orbit(0.5);
        assert!((middle.origin - Vec3::new(-3.0, 0.0, 0.0)).length() < 1e-12);
        assert!((middle.get_ray(0.5, 0.5).direction() - Vec3::X).length() < 1e-12);

        let end = Camera::orbit(1.0);
        assert!((end.origin - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-12);
        assert!((end.get_ray(0.5, 0.5).direction() - Vec3::Z).length() < 1e-12);
    }
}
