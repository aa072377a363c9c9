//! Radiance integrators.
//!
//! Three ways of turning a camera ray into a color:
//! - [`radiance`]: sky ambient, a shadowed sun, sampled emitters and mirror-like
//!   recursive bounces. Needs [`PhysicalMaterial`] everywhere it lands.
//! - [`classic_radiance`]: attenuation times recursive color, driven only by
//!   [`Material::scatter`](crate::Material::scatter).
//! - tree debug: the color of the k-d nodes the ray crosses at one depth.

use crate::kdtree::TreeProbe;
use crate::material::PhysicalMaterial;
use crate::sampling::stratified_in_unit_sphere;
use crate::{Color, HitRecord, Ray, RenderConfig, Scene};
use kdt_math::Vec3;
use rand::RngCore;

/// Default recursion cap for the physical integrator.
pub const MAX_BOUNCES: u32 = 5;

/// Shadow rays cast towards each emitter per shading point.
pub const LIGHT_SAMPLES: u32 = 8;

const SKY_AMBIENT: f64 = 0.1;
/// Sun contribution when the sun is blocked
const SUN_SHADOWED: f64 = 0.2;
const SURFACE_OFFSET: f64 = 1e-4;

fn sun_direction() -> Vec3 {
    Vec3::new(1.0, 2.0, 1.0).normalize()
}

/// How each sample is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingMode {
    #[default]
    Physical,
    Classic,
    /// Visualise k-d nodes at `depth`
    TreeDebug { depth: u32 },
}

/// Counters accumulated while tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStats {
    /// Camera and bounce rays
    pub rays: u64,
    pub shadow_rays: u64,
    /// Deepest recursion level reached
    pub deepest: u32,
}

impl PathStats {
    pub fn merge(self, other: Self) -> Self {
        Self {
            rays: self.rays + other.rays,
            shadow_rays: self.shadow_rays + other.shadow_rays,
            deepest: self.deepest.max(other.deepest),
        }
    }

    fn enter(&mut self, depth: u32) {
        self.rays += 1;
        self.deepest = self.deepest.max(depth);
    }
}

/// Color and primary hit distance of one camera sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub color: Color,
    /// Distance to the first hit, `t_max` of the config on a miss.
    pub distance: f64,
}

/// Vertical white to blue blend.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize_or_zero();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// What the physical integrator returns for rays that escape.
pub fn background(ray: &Ray) -> Color {
    sky_gradient(ray) * SKY_AMBIENT
}

/// Trace one camera ray with the integrator `config.shading` selects.
pub fn trace(ray: &Ray, scene: &Scene, config: &RenderConfig, rng: &mut dyn RngCore, stats: &mut PathStats) -> TraceSample {
    match config.shading {
        ShadingMode::Physical => physical(ray, scene, 0, config, rng, stats),
        ShadingMode::Classic => {
            let mut rec = HitRecord::default();
            let distance = if scene.hit(ray, config.ray_range(), &mut rec) {
                rec.t
            } else {
                config.t_max
            };
            TraceSample {
                color: classic_radiance(ray, scene, 0, config, rng, stats),
                distance,
            }
        }
        ShadingMode::TreeDebug { depth } => tree_debug(ray, scene, depth, config, stats),
    }
}

/// Physical radiance along `ray`, entered at recursion level `depth`.
///
/// # Panics
///
/// If the ray lands on a material other than [`Material::Physical`](crate::Material::Physical).
pub fn radiance(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
    stats: &mut PathStats,
) -> Color {
    physical(ray, scene, depth, config, rng, stats).color
}

fn physical(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
    stats: &mut PathStats,
) -> TraceSample {
    stats.enter(depth);

    let mut rec = HitRecord::default();
    if !scene.hit(ray, config.ray_range(), &mut rec) {
        return TraceSample {
            color: background(ray),
            distance: config.t_max,
        };
    }

    let Some(material) = rec.material.as_physical() else {
        panic!(
            "physical shading needs a physical material, hit a {} material",
            rec.material.kind()
        );
    };

    let normal = rec.normal.normalize_or_zero();
    let origin = rec.p + normal * SURFACE_OFFSET;

    let sun = sun_visibility(origin, scene, config, stats);
    let lights = sample_emitters(origin, &rec, material, scene, config, rng, stats);

    let mut color = material.ambient + material.diffuse * sun + lights;
    if material.is_emissive() {
        // Falls off with the distance the ray travelled to get here
        let travelled = rec.t * ray.direction().length();
        color += material.emissive / (travelled * travelled);
    }

    if depth < config.max_depth {
        if let Some(scatter) = rec.material.scatter(ray, &rec, rng) {
            let bounce = Ray::new(scatter.scattered.origin() + normal * SURFACE_OFFSET, scatter.scattered.direction());
            color += scatter.attenuation * radiance(&bounce, scene, depth + 1, config, rng, stats);
        }
    }

    TraceSample {
        color,
        distance: rec.t,
    }
}

fn sun_visibility(origin: Vec3, scene: &Scene, config: &RenderConfig, stats: &mut PathStats) -> f64 {
    stats.shadow_rays += 1;
    let shadow_ray = Ray::new(origin, sun_direction());
    let mut shadow = HitRecord::default();
    if scene.hit(&shadow_ray, config.ray_range(), &mut shadow) {
        SUN_SHADOWED
    } else {
        1.0
    }
}

/// Direct light from every emitter except the one `rec` lies on.
fn sample_emitters(
    origin: Vec3,
    rec: &HitRecord,
    material: &PhysicalMaterial,
    scene: &Scene,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
    stats: &mut PathStats,
) -> Color {
    let mut total = Color::ZERO;
    for (_, emitter) in scene.emissive_entities() {
        if rec.is_entity(emitter) {
            continue;
        }

        let center = emitter.transform();
        let half_extent = emitter.bounding_box().half_extent();
        let emission = emitter.emission();

        let mut received = Color::ZERO;
        for stratum in 0..LIGHT_SAMPLES {
            let target = center + stratified_in_unit_sphere(rng, stratum) * half_extent;
            let direction = target - origin;
            if direction.length_squared() == 0.0 {
                continue;
            }

            stats.shadow_rays += 1;
            let shadow_ray = Ray::new(origin, direction.normalize());
            let mut shadow = HitRecord::default();
            if scene.hit(&shadow_ray, config.ray_range(), &mut shadow) && shadow.is_entity(emitter) {
                received += emission / (shadow.t * shadow.t);
            }
        }
        total += received * material.diffuse / f64::from(LIGHT_SAMPLES);
    }
    total
}

/// Attenuation times recursive color; absorbed rays are black, escaped rays
/// see the full sky.
pub fn classic_radiance(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
    stats: &mut PathStats,
) -> Color {
    stats.enter(depth);

    let mut rec = HitRecord::default();
    if !scene.hit(ray, config.ray_range(), &mut rec) {
        return sky_gradient(ray);
    }

    match rec.material.scatter(ray, &rec, rng) {
        Some(scatter) if depth < config.max_depth => {
            scatter.attenuation * classic_radiance(&scatter.scattered, scene, depth + 1, config, rng, stats)
        }
        Some(scatter) => scatter.attenuation,
        None => Color::ZERO,
    }
}

fn tree_debug(ray: &Ray, scene: &Scene, depth: u32, config: &RenderConfig, stats: &mut PathStats) -> TraceSample {
    stats.enter(0);

    let mut probe = TreeProbe::new(depth);
    let mut rec = HitRecord::default();
    let hit = scene.hit_with_probe(ray, config.ray_range(), &mut rec, &mut probe);

    TraceSample {
        color: probe.average().unwrap_or_else(|| sky_gradient(ray)),
        distance: if hit { rec.t } else { config.t_max },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cuboid, Lambertian, Material, Metal, Sphere};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn matte(diffuse: f64) -> Arc<Material> {
        Arc::new(Material::from(PhysicalMaterial::new(Color::splat(diffuse), Color::ZERO, 0.0)))
    }

    #[test]
    fn test_sky_gradient_endpoints() {
        let up = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::Y));
        let down = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::NEG_Y));
        assert!(up.abs_diff_eq(Color::new(0.5, 0.7, 1.0), 1e-12));
        assert!(down.abs_diff_eq(Color::ONE, 1e-12));
        assert!(background(&Ray::new(Vec3::ZERO, Vec3::Y)).abs_diff_eq(Color::new(0.05, 0.07, 0.1), 1e-12));
    }

    #[test]
    fn test_unblocked_matte_surface() {
        // Sphere top faces straight up; nothing blocks the sun
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::ZERO, 1.0, matte(0.5)));
        scene.update();

        let config = RenderConfig {
            max_depth: 0,
            ..RenderConfig::default()
        };
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(1);
        let mut stats = PathStats::default();

        let color = radiance(&ray, &scene, 0, &config, &mut rng, &mut stats);
        // ambient 0.05 + diffuse 0.5 at full sun
        assert!(color.abs_diff_eq(Color::splat(0.55), 1e-9));
        assert_eq!(stats.rays, 1);
        assert_eq!(stats.shadow_rays, 1);
    }

    #[test]
    fn test_blocked_sun_is_attenuated() {
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::ZERO, 1.0, matte(0.5)));
        // Blocker along the sun direction, clear of the camera ray
        scene.add(Sphere::new(sun_direction() * 4.0, 1.0, matte(0.5)));
        scene.update();

        let config = RenderConfig {
            max_depth: 0,
            ..RenderConfig::default()
        };
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(2);
        let mut stats = PathStats::default();

        let color = radiance(&ray, &scene, 0, &config, &mut rng, &mut stats);
        assert!(color.abs_diff_eq(Color::splat(0.05 + 0.5 * SUN_SHADOWED), 1e-9));
    }

    #[test]
    fn test_emitter_lights_neighbor() {
        let lamp = Arc::new(Material::from(
            PhysicalMaterial::new(Color::ZERO, Color::ZERO, 0.0).with_emission(Color::splat(10.0)),
        ));
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::ZERO, 1.0, matte(0.5)));
        scene.add(Sphere::new(Vec3::new(-4.0, 0.0, 0.0), 0.5, lamp));
        scene.update();

        let config = RenderConfig {
            max_depth: 0,
            ..RenderConfig::default()
        };
        // Hit the side of the matte sphere facing the lamp
        let ray = Ray::new(Vec3::new(-2.0, 0.0, 5.0), (Vec3::new(-1.0, 0.0, 0.0) - Vec3::new(-2.0, 0.0, 5.0)).normalize());
        let mut rng = StdRng::seed_from_u64(3);
        let mut stats = PathStats::default();

        let lit = radiance(&ray, &scene, 0, &config, &mut rng, &mut stats);
        assert_eq!(stats.shadow_rays, 1 + u64::from(LIGHT_SAMPLES));

        // Without the lamp the same point only gets ambient and sun
        let mut dark_scene = Scene::new();
        dark_scene.add(Sphere::new(Vec3::ZERO, 1.0, matte(0.5)));
        dark_scene.update();
        let dark = radiance(&ray, &dark_scene, 0, &config, &mut rng, &mut PathStats::default());

        assert!(lit.x > dark.x);
        assert!(lit.is_finite());
    }

    #[test]
    fn test_emitter_does_not_light_itself() {
        let lamp = Arc::new(Material::from(
            PhysicalMaterial::new(Color::ZERO, Color::ZERO, 0.0).with_emission(Color::splat(4.0)),
        ));
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::ZERO, 1.0, lamp));
        scene.update();

        let config = RenderConfig {
            max_depth: 0,
            ..RenderConfig::default()
        };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let mut rng = StdRng::seed_from_u64(4);
        let mut stats = PathStats::default();

        let color = radiance(&ray, &scene, 0, &config, &mut rng, &mut stats);
        // Only the sun shadow ray; self-emission falls off with the 2 units travelled
        assert_eq!(stats.shadow_rays, 1);
        assert!(color.abs_diff_eq(Color::splat(1.0), 1e-9));
    }

    #[test]
    #[should_panic(expected = "lambertian")]
    fn test_physical_shading_rejects_other_materials() {
        let mut scene = Scene::new();
        scene.add(Sphere::new(
            Vec3::new(0.0, 0.0, -2.0),
            0.5,
            Arc::new(Material::from(Lambertian::new(Color::splat(0.5)))),
        ));
        scene.update();

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut rng = StdRng::seed_from_u64(5);
        radiance(&ray, &scene, 0, &RenderConfig::default(), &mut rng, &mut PathStats::default());
    }

    #[test]
    fn test_classic_mirror_pair_is_capped() {
        let mirror = Arc::new(Material::from(Metal::new(Color::splat(0.9))));
        let mut scene = Scene::new();
        scene.add(Cuboid::new(Vec3::new(0.0, 0.0, -2.0), Vec3::new(4.0, 4.0, 0.5), mirror.clone()));
        scene.add(Cuboid::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(4.0, 4.0, 0.5), mirror));
        scene.update();

        let config = RenderConfig {
            shading: ShadingMode::Classic,
            ..RenderConfig::default()
        };
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut rng = StdRng::seed_from_u64(6);
        let mut stats = PathStats::default();

        let color = classic_radiance(&ray, &scene, 0, &config, &mut rng, &mut stats);
        assert_eq!(stats.deepest, config.max_depth);
        // Never escapes, so the last bounce returns its bare attenuation
        assert!(color.abs_diff_eq(Color::splat(0.9f64.powi(6)), 1e-9));
    }

    #[test]
    fn test_tree_debug_colors() {
        let gray = Arc::new(Material::from(Lambertian::new(Color::splat(0.5))));
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, gray));
        scene.update();

        let config = RenderConfig {
            shading: ShadingMode::TreeDebug { depth: 0 },
            ..RenderConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut stats = PathStats::default();

        let through = trace(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), &scene, &config, &mut rng, &mut stats);
        assert_eq!(through.color, Color::new(0.0, 0.0, 1.0));
        assert!((through.distance - 2.0).abs() < 1e-12);

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        let missed = trace(&away, &scene, &config, &mut rng, &mut stats);
        assert_eq!(missed.color, sky_gradient(&away));
        assert_eq!(missed.distance, config.t_max);
    }
}
