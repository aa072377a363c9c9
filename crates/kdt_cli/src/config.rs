//! Command line and JSON configuration.
//!
//! Settings start from [`Settings::default`], are replaced by the JSON file
//! given with `--config` (missing keys keep their defaults), and are finally
//! overridden by the remaining flags.

use crate::scene_builder::MaterialStyle;
use kdt_renderer::{RenderConfig, ShadingMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const USAGE: &str = "\
Usage: kdt [OPTIONS]

Options:
  --config <PATH>       JSON settings file, applied before the other flags
  --width <N>           Image width in pixels
  --height <N>          Image height in pixels
  --samples <N>         Samples per pixel
  --frames <N>          Number of frames along the camera orbit
  --max-depth <N>       Recursion cap of the integrator
  --seed <N>            Base random seed
  --out <DIR>           Output directory
  --classic             Shade with the attenuation-only integrator
  --debug-depth <N>     Visualise k-d tree nodes at depth N
  --tree-debug          Visualise k-d tree nodes, depth following the frame
  --linear              Disable the k-d tree
  --time-image          Also write per-pixel render time images
  --depth-image         Also write depth images
  -h, --help            Print this help";

/// Errors that can occur while reading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Help requested")]
    HelpRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingKind {
    #[default]
    Physical,
    Classic,
    TreeDebug,
}

/// Everything the driver needs to know.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub frames: u32,
    pub max_depth: u32,
    pub seed: u64,
    pub out: PathBuf,
    pub shading: ShadingKind,
    /// Fixed debug depth; without it the frame index picks the depth
    pub debug_depth: Option<u32>,
    pub accelerated: bool,
    pub time_image: bool,
    pub depth_image: bool,
    /// Percent of pixels ignored at each end of the time image range
    pub outlier_percentage: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 480,
            height: 240,
            samples: 4,
            frames: 2,
            max_depth: kdt_renderer::MAX_BOUNCES,
            seed: 0,
            out: PathBuf::from("out"),
            shading: ShadingKind::Physical,
            debug_depth: None,
            accelerated: true,
            time_image: false,
            depth_image: false,
            outlier_percentage: 5.0,
        }
    }
}

fn value_for<'a>(flag: &str, args: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, ConfigError> {
    args.next().ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build settings from command line arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();

        let mut settings = match args.iter().position(|a| a == "--config") {
            Some(i) => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| ConfigError::MissingValue("--config".to_string()))?;
                Self::load(path)?
            }
            None => Self::default(),
        };

        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "-h" | "--help" => return Err(ConfigError::HelpRequested),
                "--config" => {
                    value_for(flag, &mut iter)?;
                }
                "--width" => settings.width = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--height" => settings.height = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--samples" => settings.samples = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--frames" => settings.frames = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--max-depth" => settings.max_depth = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--seed" => settings.seed = parse_value(flag, value_for(flag, &mut iter)?)?,
                "--out" => settings.out = PathBuf::from(value_for(flag, &mut iter)?),
                "--classic" => settings.shading = ShadingKind::Classic,
                "--debug-depth" => {
                    settings.shading = ShadingKind::TreeDebug;
                    settings.debug_depth = Some(parse_value(flag, value_for(flag, &mut iter)?)?);
                }
                "--tree-debug" => settings.shading = ShadingKind::TreeDebug,
                "--linear" => settings.accelerated = false,
                "--time-image" => settings.time_image = true,
                "--depth-image" => settings.depth_image = true,
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.frames == 0 {
            return Err(ConfigError::Invalid("frames must be at least 1".to_string()));
        }
        if !(0.0..50.0).contains(&self.outlier_percentage) {
            return Err(ConfigError::Invalid(format!(
                "outlier_percentage must be in [0, 50), got {}",
                self.outlier_percentage
            )));
        }
        Ok(())
    }

    /// Materials that suit the selected integrator.
    pub fn material_style(&self) -> MaterialStyle {
        match self.shading {
            ShadingKind::Physical => MaterialStyle::Physical,
            ShadingKind::Classic | ShadingKind::TreeDebug => MaterialStyle::Classic,
        }
    }

    /// Position of `frame` along the camera orbit, in [0, 1].
    pub fn orbit_fraction(&self, frame: u32) -> f64 {
        if self.frames < 2 {
            0.0
        } else {
            f64::from(frame) / f64::from(self.frames - 1)
        }
    }

    /// Render configuration for one frame.
    pub fn render_config(&self, frame: u32) -> RenderConfig {
        let shading = match self.shading {
            ShadingKind::Physical => ShadingMode::Physical,
            ShadingKind::Classic => ShadingMode::Classic,
            ShadingKind::TreeDebug => ShadingMode::TreeDebug {
                depth: self
                    .debug_depth
                    .unwrap_or(frame % (kdt_renderer::MAX_TREE_DEPTH + 1)),
            },
        };

        RenderConfig {
            samples_per_pixel: self.samples,
            max_depth: self.max_depth,
            shading,
            seed: self.seed.wrapping_add(u64::from(frame)),
            ..RenderConfig::default()
        }
    }
}
