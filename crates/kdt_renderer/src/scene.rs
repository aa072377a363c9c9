//! Scene aggregate: owns the entities, the emissive subset and the k-d index.

use crate::kdtree::{KdTree, TreeProbe};
use crate::{Entity, HitRecord, Ray};
use kdt_math::{Aabb, Interval, Vec3};
use log::info;

/// Flat list of entities plus what is derived from it.
///
/// The entity list is the source of truth. [`Scene::update`] refreshes every
/// entity, recomputes the emissive subset and rebuilds the index from
/// scratch. Between an edit and the next `update`, hits fall back to a linear
/// scan so they never consult a stale tree.
#[derive(Debug, Clone)]
pub struct Scene {
    entities: Vec<Entity>,
    /// Indices into `entities`
    emissive: Vec<usize>,
    index: Option<KdTree>,
    accelerated: bool,
    bbox: Aabb,
    transform: Vec3,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene that builds a k-d tree on update.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            emissive: Vec::new(),
            index: None,
            accelerated: true,
            bbox: Aabb::EMPTY,
            transform: Vec3::ZERO,
        }
    }

    /// Create an empty scene that always scans its entities linearly.
    pub fn linear() -> Self {
        Self {
            accelerated: false,
            ..Self::new()
        }
    }

    /// Switch between k-d tree and linear lookup. Takes effect on the next
    /// [`Scene::update`]; until then lookups are linear.
    pub fn set_accelerated(&mut self, accelerated: bool) {
        self.accelerated = accelerated;
        self.index = None;
    }

    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }

    /// Add an entity. The emissive subset is kept in step; the index is
    /// dropped until the next [`Scene::update`].
    pub fn add(&mut self, entity: impl Into<Entity>) {
        let entity = entity.into();
        self.bbox.expand(&entity.bounding_box());
        if entity.is_emissive() {
            self.emissive.push(self.entities.len());
        }
        self.entities.push(entity);
        self.index = None;
    }

    /// Edit entities in place, then update.
    pub fn modify<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut [Entity]),
    {
        edit(&mut self.entities);
        self.update();
    }

    /// Update every entity, then recompute the emissive subset and (when
    /// accelerated) rebuild the index.
    pub fn update(&mut self) {
        self.bbox = Aabb::EMPTY;
        let mut position_sum = Vec3::ZERO;
        for entity in &mut self.entities {
            entity.update();
            self.bbox.expand(&entity.bounding_box());
            position_sum += entity.transform();
        }
        self.transform = if self.entities.is_empty() {
            Vec3::ZERO
        } else {
            position_sum / self.entities.len() as f64
        };

        self.emissive = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_emissive())
            .map(|(i, _)| i)
            .collect();

        self.index = self.accelerated.then(|| KdTree::build(&self.entities));

        info!(
            "Scene updated: {} entities, {} emissive, {}",
            self.entities.len(),
            self.emissive.len(),
            match &self.index {
                Some(tree) => format!("k-d tree with {} nodes (depth {})", tree.nodes().len(), tree.depth()),
                None => "linear lookup".to_string(),
            }
        );
    }

    /// Closest hit strictly inside `ray_t`.
    pub fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        match &self.index {
            Some(tree) => tree.hit(&self.entities, ray, ray_t, rec, None),
            None => self.hit_linear(ray, ray_t, rec),
        }
    }

    /// Like [`Scene::hit`], also collecting tree colors into `probe`. Without
    /// an index the probe stays empty.
    pub fn hit_with_probe<'a>(
        &'a self,
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord<'a>,
        probe: &mut TreeProbe,
    ) -> bool {
        match &self.index {
            Some(tree) => tree.hit(&self.entities, ray, ray_t, rec, Some(probe)),
            None => self.hit_linear(ray, ray_t, rec),
        }
    }

    /// Test every entity in order, keeping the closest.
    pub fn hit_linear<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool {
        let mut closest = ray_t.max;
        for entity in &self.entities {
            if entity.hit(ray, ray_t.with_max(closest), rec) {
                closest = rec.t;
            }
        }
        closest < ray_t.max
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Emissive entities with their index in [`Scene::entities`].
    pub fn emissive_entities(&self) -> impl Iterator<Item = (usize, &Entity)> + '_ {
        self.emissive.iter().map(move |&i| (i, &self.entities[i]))
    }

    pub fn emissive_indices(&self) -> &[usize] {
        &self.emissive
    }

    pub fn index(&self) -> Option<&KdTree> {
        self.index.as_ref()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Mean position of the entities as of the last update.
    pub fn transform(&self) -> Vec3 {
        self.transform
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
