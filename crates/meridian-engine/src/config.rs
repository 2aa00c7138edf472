//! Engine configuration.
//!
//! One TOML file holds the terrain settings, the scripted viewpoint run and
//! the preview export options. Missing or unparsable files fall back to the
//! defaults.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use meridian_world::{ColorRamp, PreviewMode, TerrainSettings, NUM_SUPPORTED_LODS};

/// Configuration file name.
pub const CONFIG_FILE: &str = "meridian.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Terrain generation and streaming
    pub terrain: TerrainSettings,
    /// Scripted viewpoint run
    pub simulation: SimulationConfig,
    /// Preview export
    pub preview: PreviewConfig,
}

/// Viewpoint path and tick pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks to run along the path
    pub ticks: u32,
    /// Ticks per simulated second
    pub target_fps: u32,
    /// Pace ticks in wall-clock time instead of running flat out
    pub realtime: bool,
    /// Viewpoint speed in world units per second
    pub speed: f32,
    /// Heading in degrees, clockwise from +Z
    pub heading_degrees: f32,
    /// Starting viewpoint
    pub start: Vec3,
    /// Extra ticks allowed at the end for outstanding work to land
    pub settle_ticks: u32,
    /// Ticks between statistics log lines
    pub stats_interval: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            target_fps: 60,
            realtime: false,
            speed: 40.0,
            heading_degrees: 45.0,
            start: Vec3::new(0.0, 50.0, 0.0),
            settle_ticks: 600,
            stats_interval: 120,
        }
    }
}

/// Map preview export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Export previews before the run
    pub enabled: bool,
    /// Output directory
    pub output_dir: PathBuf,
    /// Modes to export
    pub modes: Vec<PreviewMode>,
    /// LOD for mesh and normal map previews
    pub lod: u32,
    /// Colour bands for the colour map
    pub ramp: ColorRamp,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("preview"),
            modes: PreviewMode::ALL.to_vec(),
            lod: 0,
            ramp: ColorRamp::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp run parameters to sensible ranges.
    ///
    /// Terrain settings are not touched here; the streamer rejects invalid
    /// ones when it is created.
    pub fn validate(&mut self) {
        let sim = &mut self.simulation;
        sim.ticks = sim.ticks.clamp(1, 1_000_000);
        sim.target_fps = sim.target_fps.clamp(1, 240);
        sim.speed = if sim.speed.is_finite() {
            sim.speed.clamp(0.0, 10_000.0)
        } else {
            0.0
        };
        if !sim.heading_degrees.is_finite() {
            sim.heading_degrees = 0.0;
        }
        if !sim.start.is_finite() {
            sim.start = Vec3::ZERO;
        }
        sim.stats_interval = sim.stats_interval.max(1);

        self.preview.lod = self.preview.lod.min(NUM_SUPPORTED_LODS - 1);
    }
}
