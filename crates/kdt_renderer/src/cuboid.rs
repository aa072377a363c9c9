//! Axis-aligned box primitive.

use crate::{HitRecord, Material, Ray};
use kdt_math::{Aabb, Interval, Vec3};
use std::sync::Arc;

/// An axis-aligned box given by its center and full dimensions.
#[derive(Debug, Clone)]
pub struct Cuboid {
    pub center: Vec3,
    pub dimensions: Vec3,
    pub material: Arc<Material>,
    bbox: Aabb,
    emissive: bool,
}

impl Cuboid {
    pub fn new(center: Vec3, dimensions: Vec3, material: Arc<Material>) -> Self {
        let mut cuboid = Self {
            center,
            dimensions,
            material,
            bbox: Aabb::EMPTY,
            emissive: false,
        };
        cuboid.update();
        cuboid
    }

    pub fn update(&mut self) {
        self.bbox = Aabb::from_center(self.center, self.dimensions * 0.5);
        self.emissive = self.material.is_emissive();
    }

    pub fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        // Flat or inverted boxes have no faces to shade
        if self.dimensions.cmple(Vec3::ZERO).any() {
            return false;
        }

        let Some(span) = self.bbox.slab_interval(ray) else {
            return false;
        };

        // Entry point, or the exit point when the origin is inside
        let t = if span.min >= 0.0 { span.min } else { span.max };
        if !ray_t.surrounds(t) {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        rec.normal = self.face_normal(rec.p);
        rec.material = self.material.as_ref();
        true
    }

    /// Normal of the face whose axis dominates `p - center`, scaled so a
    /// point on that face gives a unit component.
    fn face_normal(&self, p: Vec3) -> Vec3 {
        let d = p - self.center;
        let a = d.abs();
        let axis = if a.x > a.y && a.x > a.z {
            0
        } else if a.y > a.z {
            1
        } else {
            2
        };

        let mut normal = Vec3::ZERO;
        normal[axis] = d[axis] / (self.dimensions[axis] * 0.5);
        normal
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive
    }
}
