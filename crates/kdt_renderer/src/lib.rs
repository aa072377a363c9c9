//! KDT renderer - CPU path tracing over a k-d tree.
//!
//! A scene is a flat list of entities (spheres, boxes, nested scenes) that is
//! indexed by a mean-split k-d tree on every [`Scene::update`]. Rendering runs
//! one rayon task per pixel; each sample goes through the integrator selected
//! by [`ShadingMode`].

mod camera;
mod cuboid;
mod entity;
mod integrator;
mod kdtree;
mod material;
mod progress;
mod renderer;
mod sampling;
mod scene;
mod sphere;

pub mod export;

pub use camera::Camera;
pub use cuboid::Cuboid;
pub use entity::{Entity, HitRecord};
pub use integrator::{
    background, classic_radiance, radiance, sky_gradient, trace, PathStats, ShadingMode, TraceSample,
    LIGHT_SAMPLES, MAX_BOUNCES,
};
pub use kdtree::{KdNode, KdTree, NodeId, Side, TreeProbe, LEAF_MAX_SIZE, MAX_TREE_DEPTH};
pub use material::{Color, Lambertian, Material, Metal, PhysicalMaterial, ScatterResult};
pub use progress::{ProgressReport, ProgressTracker};
pub use renderer::{render, render_pixel, Pixel, RenderConfig, RenderOutput, RenderStats};
pub use sampling::{gen_f64, random_in_unit_sphere, stratified_in_unit_sphere};
pub use scene::Scene;
pub use sphere::Sphere;

/// Re-export Vec3 and common math types from kdt_math
pub use kdt_math::{Aabb, Interval, Ray, Vec3};
