//! Scene entities and the hit record they fill in.

use crate::material::Lambertian;
use crate::{Color, Cuboid, Material, Ray, Scene, Sphere};
use kdt_math::{Aabb, Interval, Vec3};

/// Placeholder for `HitRecord::default()`. Black, so a record that was never
/// filled in cannot add light.
static ABSORBER: Material = Material::Lambertian(Lambertian { albedo: Color::ZERO });

/// Record of a ray-entity intersection.
#[derive(Clone)]
pub struct HitRecord<'a> {
    /// Ray parameter of the hit
    pub t: f64,
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal. Not guaranteed to be unit length.
    pub normal: Vec3,
    /// Material at the intersection point
    pub material: &'a Material,
    /// Primitive that was hit, for identity checks only
    pub entity: Option<&'a Entity>,
}

impl<'a> Default for HitRecord<'a> {
    fn default() -> Self {
        Self {
            t: 0.0,
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            material: &ABSORBER,
            entity: None,
        }
    }
}

impl<'a> HitRecord<'a> {
    /// True if this record was produced by exactly `entity`.
    pub fn is_entity(&self, entity: &Entity) -> bool {
        self.entity.is_some_and(|hit| std::ptr::eq(hit, entity))
    }
}

/// Anything placed in a scene.
///
/// A nested [`Scene`] is an entity too; its hits report the primitive inside
/// it, never the nested scene itself.
#[derive(Debug, Clone)]
pub enum Entity {
    Sphere(Sphere),
    Cuboid(Cuboid),
    Scene(Box<Scene>),
}

impl Entity {
    /// Recompute derived geometry (bounding box, reference position,
    /// emissive flag).
    pub fn update(&mut self) {
        match self {
            Entity::Sphere(s) => s.update(),
            Entity::Cuboid(c) => c.update(),
            Entity::Scene(s) => s.update(),
        }
    }

    /// Closest hit strictly inside `ray_t`. `rec` is only written on success.
    pub fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        let hit = match self {
            Entity::Sphere(s) => s.hit(ray, ray_t, rec),
            Entity::Cuboid(c) => c.hit(ray, ray_t, rec),
            Entity::Scene(s) => return s.hit(ray, ray_t, rec),
        };
        if hit {
            rec.entity = Some(self);
        }
        hit
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Entity::Sphere(s) => s.bounding_box(),
            Entity::Cuboid(c) => c.bounding_box(),
            Entity::Scene(s) => s.bounding_box(),
        }
    }

    /// Reference position used for partitioning and light sampling.
    pub fn transform(&self) -> Vec3 {
        match self {
            Entity::Sphere(s) => s.center,
            Entity::Cuboid(c) => c.center,
            Entity::Scene(s) => s.transform(),
        }
    }

    pub fn is_emissive(&self) -> bool {
        match self {
            Entity::Sphere(s) => s.is_emissive(),
            Entity::Cuboid(c) => c.is_emissive(),
            Entity::Scene(_) => false,
        }
    }

    /// Emitted radiance of the entity's material.
    pub fn emission(&self) -> Color {
        match self {
            Entity::Sphere(s) => s.material.emission(),
            Entity::Cuboid(c) => c.material.emission(),
            Entity::Scene(_) => Color::ZERO,
        }
    }
}

impl From<Sphere> for Entity {
    fn from(sphere: Sphere) -> Self {
        Entity::Sphere(sphere)
    }
}

impl From<Cuboid> for Entity {
    fn from(cuboid: Cuboid) -> Self {
        Entity::Cuboid(cuboid)
    }
}

impl From<Scene> for Entity {
    fn from(scene: Scene) -> Self {
        Entity::Scene(Box::new(scene))
    }
}
