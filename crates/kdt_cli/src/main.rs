mod config;
mod scene_builder;

use anyhow::{Context, Result};
use config::{ConfigError, Settings, USAGE};
use kdt_renderer::{export, render, Camera};
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings = match Settings::from_args(std::env::args().skip(1)) {
        Ok(settings) => settings,
        Err(ConfigError::HelpRequested) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Err(err) => return Err(err).context("Failed to read settings"),
    };

    info!(
        "Rendering {} frame(s) at {}x{}, {} spp into {}",
        settings.frames,
        settings.width,
        settings.height,
        settings.samples,
        settings.out.display()
    );

    let scene = scene_builder::demo_scene(settings.material_style(), settings.accelerated);

    std::fs::create_dir_all(&settings.out)
        .with_context(|| format!("Failed to create output directory {}", settings.out.display()))?;

    for frame in 0..settings.frames {
        let camera = Camera::orbit(settings.orbit_fraction(frame));
        let config = settings.render_config(frame);
        info!("Frame {}/{} ({:?})", frame + 1, settings.frames, config.shading);

        let output = render(&camera, &scene, settings.width, settings.height, &config);

        let color_path = settings.out.join(format!("{:03}.png", frame));
        export::write_color_png(&output, &color_path)
            .with_context(|| format!("Failed to write {}", color_path.display()))?;

        if settings.time_image {
            let time_path = settings.out.join(format!("{:03}_time.png", frame));
            export::write_time_png(&output, &time_path, settings.outlier_percentage)
                .with_context(|| format!("Failed to write {}", time_path.display()))?;
        }

        if settings.depth_image {
            let depth_path = settings.out.join(format!("{:03}_depth.png", frame));
            export::write_depth_png(&output, &depth_path)
                .with_context(|| format!("Failed to write {}", depth_path.display()))?;
        }

        info!(
            "Wrote {} in {:.2}s ({} rays)",
            color_path.display(),
            output.stats.elapsed.as_secs_f64(),
            output.stats.rays
        );
    }

    Ok(())
}
