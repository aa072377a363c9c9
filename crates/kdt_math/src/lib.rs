//! Math types shared by the KDT renderer.
//!
//! Everything is double precision: the tracer compares hit distances across
//! acceleration strategies and needs more headroom than `f32` gives.

// Re-export glam for convenience
pub use glam;
pub use glam::{dvec3, DVec3 as Vec3};

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Reflect `v` about the normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Linear blend between two vectors, `f = 0` gives `a`.
#[inline]
pub fn lerp(f: f64, a: Vec3, b: Vec3) -> Vec3 {
    (1.0 - f) * a + f * b
}
