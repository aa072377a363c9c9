//! The demo scene rendered by the driver.

use kdt_math::{dvec3, Vec3};
use kdt_renderer::{Color, Cuboid, Lambertian, Material, Metal, PhysicalMaterial, Scene, Sphere};
use log::info;
use std::sync::Arc;

/// Which material family the scene is built from.
///
/// The physical integrator only understands [`PhysicalMaterial`]; the classic
/// one works with anything that scatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialStyle {
    Classic,
    Physical,
}

struct Palette {
    steel: Arc<Material>,
    iron: Arc<Material>,
    felt: Arc<Material>,
    red_felt: Arc<Material>,
    lamp: Arc<Material>,
}

impl Palette {
    fn new(style: MaterialStyle) -> Self {
        let steel = Color::new(0.8, 0.83, 0.8);
        let iron = Color::new(0.1, 0.1, 0.8);
        let felt = Color::new(0.8, 0.83, 0.8);
        let red_felt = Color::new(0.8, 0.2, 0.2);

        let shared = |m: Material| Arc::new(m);
        let lamp = shared(PhysicalMaterial::new(Color::ONE, Color::ZERO, 0.0).with_emission(Color::splat(3.0)).into());

        match style {
            MaterialStyle::Classic => Self {
                steel: shared(Metal::new(steel).into()),
                iron: shared(Metal::new(iron).into()),
                felt: shared(Lambertian::new(felt).into()),
                red_felt: shared(Lambertian::new(red_felt).into()),
                lamp,
            },
            MaterialStyle::Physical => Self {
                steel: shared(PhysicalMaterial::new(steel * 0.1, steel, 0.02).into()),
                iron: shared(PhysicalMaterial::new(iron * 0.5, iron, 0.1).into()),
                felt: shared(PhysicalMaterial::new(felt, Color::splat(0.05), 1.0).into()),
                red_felt: shared(PhysicalMaterial::new(red_felt, Color::splat(0.05), 1.0).into()),
                lamp,
            },
        }
    }
}

/// 5x5 grid of small steel spheres in front of the center sphere.
fn sphere_grid(material: &Arc<Material>) -> Scene {
    let mut grid = Scene::new();
    for i in 0..25u32 {
        let cell = dvec3(f64::from(i / 5), f64::from(i % 5), 0.0) / 5.0 - Vec3::splat(0.4);
        let center = dvec3(cell.x, cell.y, 0.25);
        grid.add(Sphere::new(center, 0.09, material.clone()));
    }
    grid
}

/// Ground, four feature spheres, the sphere grid, three boxes and a lamp.
/// The scene is updated and ready to render.
pub fn demo_scene(style: MaterialStyle, accelerated: bool) -> Scene {
    let palette = Palette::new(style);
    let mut scene = if accelerated { Scene::new() } else { Scene::linear() };

    scene.add(Sphere::new(dvec3(0.0, -100.5, 0.0), 100.0, palette.felt.clone()));

    scene.add(Sphere::new(dvec3(0.5, 0.5, 0.0), 0.25, palette.iron.clone()));
    scene.add(Sphere::new(dvec3(-1.0, 0.0, 0.0), 0.5, palette.steel.clone()));
    scene.add(Sphere::new(dvec3(0.0, 0.0, 0.0), 0.25, palette.red_felt.clone()));
    scene.add(Sphere::new(dvec3(1.0, 0.0, 0.0), 0.5, palette.steel.clone()));

    scene.add(sphere_grid(&palette.steel));

    scene.add(Cuboid::new(dvec3(0.0, 0.0, -1.0), Vec3::ONE, palette.iron.clone()));
    scene.add(Cuboid::new(dvec3(0.0, 1.0, -3.0), Vec3::ONE, palette.red_felt.clone()));
    scene.add(Cuboid::new(dvec3(0.0, 2.0, -1.0), Vec3::ONE, palette.iron));

    scene.add(Sphere::new(dvec3(1.2, 1.2, 0.8), 0.15, palette.lamp));

    scene.update();
    info!(
        "Demo scene: {} entities ({:?} materials, {})",
        scene.len(),
        style,
        if accelerated { "k-d tree" } else { "linear" }
    );
    scene
}
