//! Configuration and engine defaults for PCBKit
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into one section per engine:
//! - Isolation routing defaults
//! - Cutout defaults (tool, margin, bridges)
//! - Pocket clearing defaults
//! - Mirror axis and alignment drill
//! - G-code output (depths, feeds, tool change, decimals)

use crate::error::{ConfigError, SettingsError, SettingsResult};
use pcbkit_camtools::{
    CutoutParameters, IsolationParameters, MirrorAxis, PaintParameters, ToolpathParameters,
};
use pcbkit_core::{Point, Units};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the platform config directory.
pub const APP_DIR: &str = "pcbkit";

/// Config file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Mirror and alignment-hole defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    /// Axis to mirror the bottom layer about
    pub axis: MirrorAxis,
    /// Diameter of generated alignment holes
    pub alignment_drill_diameter: f64,
    /// Alignment hole positions; mirrored copies are added automatically
    pub alignment_holes: Vec<Point>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            axis: MirrorAxis::Y,
            alignment_drill_diameter: 3.0,
            alignment_holes: Vec::new(),
        }
    }
}

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )
        .into()),
    }
}

/// Complete application configuration
///
/// Aggregates every engine's defaults and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Unit the lengths below are expressed in
    pub units: Units,
    /// Text copied verbatim before every program
    pub preamble: Option<String>,
    /// Text copied verbatim after every program
    pub postamble: Option<String>,
    pub isolation: IsolationParameters,
    pub cutout: CutoutParameters,
    pub paint: PaintParameters,
    pub mirror: MirrorSettings,
    pub gcode: ToolpathParameters,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config_dir>/pcbkit/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// A file that exists but does not parse or validate is an error.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> SettingsResult<()> {
        self.isolation
            .validate()
            .map_err(|e| SettingsError::invalid("isolation", e))?;
        self.cutout
            .validate()
            .map_err(|e| SettingsError::invalid("cutout", e))?;
        self.paint
            .validate()
            .map_err(|e| SettingsError::invalid("paint", e))?;
        self.gcode
            .validate()
            .map_err(|e| SettingsError::invalid("gcode", e))?;

        let drill = self.mirror.alignment_drill_diameter;
        if !drill.is_finite() || drill <= 0.0 {
            return Err(SettingsError::InvalidSetting {
                key: "mirror.alignment_drill_diameter".to_string(),
                reason: format!("must be positive, got {}", drill),
            });
        }
        if let Some(p) = self.mirror.alignment_holes.iter().find(|p| !p.is_finite()) {
            return Err(SettingsError::InvalidSetting {
                key: "mirror.alignment_holes".to_string(),
                reason: format!("non-finite position ({}, {})", p.x, p.y),
            });
        }
        Ok(())
    }

    /// Rescale every length into `units`. No-op if already there.
    pub fn convert_units(&mut self, units: Units) {
        if self.units == units {
            return;
        }
        let f = self.units.factor_to(units);

        self.isolation.tool_diameter *= f;

        self.cutout.tool_diameter *= f;
        self.cutout.margin *= f;
        self.cutout.gap_size *= f;

        self.paint.tool_diameter *= f;
        self.paint.margin *= f;

        self.mirror.alignment_drill_diameter *= f;
        for hole in &mut self.mirror.alignment_holes {
            *hole = Point::new(hole.x * f, hole.y * f);
        }

        let g = &mut self.gcode;
        g.cut_z *= f;
        g.travel_z *= f;
        g.feed_rate *= f;
        g.plunge_rate = g.plunge_rate.map(|rate| rate * f);
        g.tool_diameter *= f;
        g.toolchange_z *= f;
        g.depth_per_pass *= f;

        info!("Converted config from {} to {}", self.units, units);
        self.units = units;
    }
}
