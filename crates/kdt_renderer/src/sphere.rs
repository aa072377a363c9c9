//! Sphere entity.

use crate::{HitRecord, Material, Ray};
use kdt_math::{Aabb, Interval, Vec3};
use std::sync::Arc;

/// Sphere with a shared material. Derived state is refreshed by `update`.
#[derive(Debug, Clone)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f64,
    pub material: Arc<Material>,
    bbox: Aabb,
    emissive: bool,
}

impl Sphere {
    /// Bounding box and emissive flag are computed immediately.
    pub fn new(center: Vec3, radius: f64, material: Arc<Material>) -> Self {
        let mut sphere = Self {
            center,
            radius,
            material,
            bbox: Aabb::EMPTY,
            emissive: false,
        };
        sphere.update();
        sphere
    }

    /// Refresh the bounding box and emissive flag after `center`, `radius` or
    /// `material` changed.
    pub fn update(&mut self) {
        self.bbox = Aabb::from_center(self.center, Vec3::splat(self.radius.abs()));
        self.emissive = self.material.is_emissive();
    }

    pub fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        // A point is not a surface
        if self.radius <= 0.0 {
            return false;
        }

        let oc = ray.origin() - self.center;
        let a = ray.direction().length_squared();
        let b = oc.dot(ray.direction());
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = b * b - a * c;
        if discriminant <= 0.0 || a == 0.0 {
            return false;
        }

        let half_chord = discriminant.sqrt() / a;
        let mid = -b / a;

        // Find the nearest root in the acceptable range
        let mut root = mid - half_chord;
        if !ray_t.surrounds(root) {
            root = mid + half_chord;
            if !ray_t.surrounds(root) {
                return false;
            }
        }

        rec.t = root;
        rec.p = ray.at(root);
        rec.normal = (rec.p - self.center) / self.radius;
        rec.material = self.material.as_ref();
        true
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive
    }
}
