//! Parallel per-pixel render scheduler.
//!
//! One rayon task per pixel, each with its own seeded generator and its own
//! slot in the output buffer. The only shared mutable state is the progress
//! tracker.

use crate::integrator::{trace, PathStats, ShadingMode, MAX_BOUNCES};
use crate::progress::ProgressTracker;
use crate::{Camera, Color, Scene};
use kdt_math::Interval;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Jittered camera rays per pixel
    pub samples_per_pixel: u32,
    /// Recursion cap of the integrators
    pub max_depth: u32,
    pub shading: ShadingMode,
    /// Base seed; each pixel derives its own stream from it
    pub seed: u64,
    pub t_min: f64,
    pub t_max: f64,
    /// Minimum time between progress reports
    pub progress_interval: Duration,
    /// Weight of the newest throughput measurement
    pub ema_smoothing: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1,
            max_depth: MAX_BOUNCES,
            shading: ShadingMode::Physical,
            seed: 0,
            t_min: 0.001,
            t_max: 1000.0,
            progress_interval: Duration::from_millis(100),
            ema_smoothing: 0.1,
        }
    }
}

impl RenderConfig {
    /// Valid hit distances for every ray of the pass.
    pub fn ray_range(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }
}

/// One rendered pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    /// Mean radiance, linear and unclamped
    pub color: Color,
    /// Mean primary hit distance
    pub depth: f64,
    /// Wall time spent on this pixel
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderStats {
    pub elapsed: Duration,
    pub rays: u64,
    pub shadow_rays: u64,
    pub deepest_bounce: u32,
    pub pixels_per_second: f64,
}

/// Row-major pixels, top row first.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
    pub stats: RenderStats,
}

impl RenderOutput {
    pub fn get(&self, x: u32, y: u32) -> &Pixel {
        &self.pixels[(y * self.width + x) as usize]
    }
}

/// Seed of the generator for the pixel at `index`.
fn pixel_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Average `config.samples_per_pixel` jittered samples of pixel (x, y), with
/// y = 0 the top row.
#[allow(clippy::too_many_arguments)]
pub fn render_pixel(
    camera: &Camera,
    scene: &Scene,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    config: &RenderConfig,
    rng: &mut StdRng,
    stats: &mut PathStats,
) -> Pixel {
    let started = Instant::now();
    let samples = config.samples_per_pixel.max(1);

    let mut color = Color::ZERO;
    let mut depth = 0.0;
    for _ in 0..samples {
        let u = (f64::from(x) + rng.gen::<f64>()) / f64::from(width);
        let v = 1.0 - (f64::from(y) + rng.gen::<f64>()) / f64::from(height);
        let ray = camera.get_ray(u, v);

        let sample = trace(&ray, scene, config, rng, stats);
        color += sample.color;
        depth += sample.distance;
    }

    let samples = f64::from(samples);
    Pixel {
        color: color / samples,
        depth: depth / samples,
        elapsed: started.elapsed(),
    }
}

/// Render the scene as seen from `camera` on all available cores.
pub fn render(camera: &Camera, scene: &Scene, width: u32, height: u32, config: &RenderConfig) -> RenderOutput {
    let mut config = config.clone();
    if config.samples_per_pixel == 0 {
        warn!("samples_per_pixel is 0, rendering with 1 sample");
        config.samples_per_pixel = 1;
    }

    let pixel_count = width as usize * height as usize;
    let mut pixels = vec![Pixel::default(); pixel_count];
    let tracker = ProgressTracker::new(pixel_count, config.progress_interval, config.ema_smoothing);

    info!(
        "Rendering {}x{} at {} spp ({:?}, max depth {}) on {} threads",
        width,
        height,
        config.samples_per_pixel,
        config.shading,
        config.max_depth,
        rayon::current_num_threads()
    );
    let started = Instant::now();

    let totals = pixels
        .par_iter_mut()
        .enumerate()
        .map(|(index, pixel)| {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            let mut rng = StdRng::seed_from_u64(pixel_seed(config.seed, index));
            let mut stats = PathStats::default();

            *pixel = render_pixel(camera, scene, x, y, width, height, &config, &mut rng, &mut stats);

            if let Some(report) = tracker.complete_one() {
                info!("{}", report);
            }
            stats
        })
        .reduce(PathStats::default, PathStats::merge);

    let elapsed = started.elapsed();
    let seconds = elapsed.as_secs_f64();
    let stats = RenderStats {
        elapsed,
        rays: totals.rays,
        shadow_rays: totals.shadow_rays,
        deepest_bounce: totals.deepest,
        pixels_per_second: if seconds > 0.0 { pixel_count as f64 / seconds } else { 0.0 },
    };

    info!(
        "Render finished in {:.2}s: {} rays, {} shadow rays, {:.0} px/s",
        seconds, stats.rays, stats.shadow_rays, stats.pixels_per_second
    );

    RenderOutput {
        width,
        height,
        pixels,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{background, Material, PhysicalMaterial, Sphere, Vec3};
    use std::sync::Arc;

    fn gray() -> Arc<Material> {
        Arc::new(Material::from(PhysicalMaterial::new(Color::splat(0.5), Color::ZERO, 0.0)))
    }

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.samples_per_pixel, 1);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.shading, ShadingMode::Physical);
        assert_eq!(config.ray_range(), Interval::new(0.001, 1000.0));
    }

    #[test]
    fn test_pixel_seeds_differ() {
        assert_ne!(pixel_seed(0, 0), pixel_seed(0, 1));
        assert_ne!(pixel_seed(42, 7), pixel_seed(43, 7));
    }

    #[test]
    fn test_render_is_deterministic_for_a_seed() {
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, gray()));
        scene.update();
        let camera = Camera::new();
        let config = RenderConfig {
            samples_per_pixel: 2,
            seed: 9,
            ..RenderConfig::default()
        };

        let a = render(&camera, &scene, 16, 8, &config);
        let b = render(&camera, &scene, 16, 8, &config);

        let colors = |out: &RenderOutput| out.pixels.iter().map(|p| p.color).collect::<Vec<_>>();
        assert_eq!(colors(&a), colors(&b));
    }

    #[test]
    fn test_top_row_comes_first() {
        let mut scene = Scene::new();
        scene.update();
        let camera = Camera::new();

        let out = render(&camera, &scene, 4, 4, &RenderConfig::default());
        assert_eq!(out.pixels.len(), 16);

        // The sky is bluer towards the top of the image
        assert!(out.get(0, 0).color.x < out.get(0, 3).color.x);
        for pixel in &out.pixels {
            assert_eq!(pixel.depth, 1000.0);
        }
    }

    #[test]
    fn test_zero_samples_clamped() {
        let mut scene = Scene::new();
        scene.update();
        let camera = Camera::new();
        let config = RenderConfig {
            samples_per_pixel: 0,
            ..RenderConfig::default()
        };

        let out = render(&camera, &scene, 2, 2, &config);
        // One camera ray per pixel, each escaping to the sky
        assert_eq!(out.stats.rays, 4);
        assert!(out.pixels.iter().all(|p| p.color.is_finite() && p.color != Color::ZERO));
    }

    #[test]
    fn test_render_pixel_averages_samples() {
        let mut scene = Scene::new();
        scene.update();
        let camera = Camera::new();
        let config = RenderConfig {
            samples_per_pixel: 4,
            ..RenderConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut stats = PathStats::default();

        // 1x1 image: every sample lands somewhere on the sky
        let pixel = render_pixel(&camera, &scene, 0, 0, 1, 1, &config, &mut rng, &mut stats);
        assert_eq!(stats.rays, 4);
        let low = background(&camera.get_ray(0.5, 0.0));
        let high = background(&camera.get_ray(0.5, 1.0));
        assert!(pixel.color.x <= low.x + 1e-12 && pixel.color.x >= high.x - 1e-12);
    }

    #[test]
    fn test_stats_count_rays() {
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, gray()));
        scene.update();
        let camera = Camera::new();
        let config = RenderConfig {
            samples_per_pixel: 3,
            ..RenderConfig::default()
        };

        let out = render(&camera, &scene, 8, 4, &config);
        assert!(out.stats.rays >= 8 * 4 * 3);
        assert!(out.stats.deepest_bounce <= config.max_depth);
    }
}
