//! Terrain configuration surface.
//!
//! Settings are plain serde values. Changing them at runtime goes through an
//! explicit [`SettingsChange`] event; the streamer regenerates every resident
//! chunk once per event.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use meridian_common::ConfigError;

use crate::curve::HeightCurve;
use crate::lod::LodTable;
use crate::noise::NoiseParameters;

/// Supported un-bordered tile sizes (vertices per side at LOD 0).
///
/// Each is odd so the tile has a centre vertex, and `size + 1` is divisible by
/// every supported LOD stride so the bordered grid's outer ring is always hit.
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [47, 71, 95, 119, 143, 167, 191, 215, 239];

/// Smallest noise scale used when sampling.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

/// Noise sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Noise seed
    pub seed: i32,
    /// Base frequency
    pub frequency: f32,
    /// Octave count
    pub octaves: u32,
    /// Frequency multiplier per octave
    pub lacunarity: f32,
    /// Amplitude multiplier per octave
    pub persistence: f32,
    /// Sample coordinate divisor (clamped to [`MIN_NOISE_SCALE`])
    pub scale: f32,
    /// Offset added to every tile's sample origin
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        let params = NoiseParameters::default();
        Self {
            seed: params.seed,
            frequency: params.frequency,
            octaves: params.octaves,
            lacunarity: params.lacunarity,
            persistence: params.persistence,
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Fractal parameters for [`crate::noise::NoiseField`].
    #[must_use]
    pub const fn parameters(&self) -> NoiseParameters {
        NoiseParameters {
            seed: self.seed,
            frequency: self.frequency,
            octaves: self.octaves,
            lacunarity: self.lacunarity,
            persistence: self.persistence,
        }
    }

    /// Scale as used when sampling.
    #[must_use]
    pub fn effective_scale(&self) -> f32 {
        if self.scale <= 0.0 {
            MIN_NOISE_SCALE
        } else {
            self.scale
        }
    }
}

/// Height shaping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapSettings {
    /// Noise settings
    pub noise: NoiseSettings,
    /// World height multiplier
    pub multiplier: f32,
    /// Curve applied to normalized noise before multiplying
    pub curve: HeightCurve,
    /// Subtract the radial falloff mask
    pub use_falloff: bool,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            multiplier: 30.0,
            curve: HeightCurve::default(),
            use_falloff: false,
        }
    }
}

impl HeightMapSettings {
    /// Lowest height the settings can produce.
    #[must_use]
    pub fn min_height(&self) -> f32 {
        self.multiplier * self.curve.min_value()
    }

    /// Highest height the settings can produce.
    #[must_use]
    pub fn max_height(&self) -> f32 {
        self.multiplier * self.curve.max_value()
    }
}

/// Mesh settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World units per grid cell
    pub mesh_scale: f32,
    /// Index into [`SUPPORTED_CHUNK_SIZES`]
    pub chunk_size_index: usize,
    /// Emit flat-shaded meshes
    pub flat_shading: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: 2.5,
            chunk_size_index: 2,
            flat_shading: false,
        }
    }
}

impl MeshSettings {
    /// Un-bordered tile size in vertices.
    #[must_use]
    pub fn mesh_size(&self) -> usize {
        let index = self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1);
        SUPPORTED_CHUNK_SIZES[index]
    }

    /// Tile size including the one-cell border ring.
    #[must_use]
    pub fn bordered_size(&self) -> usize {
        self.mesh_size() + 2
    }

    /// Side length of one tile in world units.
    #[must_use]
    pub fn world_size(&self) -> f32 {
        (self.mesh_size() - 1) as f32 * self.mesh_scale
    }
}

/// Largest chunk radius the streamer scans around the viewer.
pub const MAX_CHUNKS_IN_VIEW: i32 = 32;

/// Complete terrain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Height synthesis
    pub height: HeightMapSettings,
    /// Meshing
    pub mesh: MeshSettings,
    /// LOD table
    pub lods: LodTable,
    /// LOD table index whose mesh backs collision (`None` = first marked row)
    pub collider_lod_index: Option<usize>,
    /// Viewer travel (world units) that forces a full rescan
    pub movement_threshold: f32,
    /// Collision activation distance, in unscaled units like LOD thresholds
    pub collision_distance: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            height: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            lods: LodTable::default(),
            collider_lod_index: None,
            movement_threshold: 25.0,
            collision_distance: 5.0,
        }
    }
}

impl TerrainSettings {
    /// Validates every setting, failing on the first error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.height.noise.parameters().validate()?;
        if self.height.noise.scale.is_nan() {
            return Err(ConfigError::NonPositiveScale {
                name: "noise scale",
                value: self.height.noise.scale,
            });
        }
        if self.mesh.chunk_size_index >= SUPPORTED_CHUNK_SIZES.len() {
            return Err(ConfigError::ChunkSizeIndexOutOfRange {
                index: self.mesh.chunk_size_index,
                max: SUPPORTED_CHUNK_SIZES.len() - 1,
            });
        }
        if self.mesh.mesh_scale.is_nan() || self.mesh.mesh_scale <= 0.0 {
            return Err(ConfigError::NonPositiveScale {
                name: "mesh scale",
                value: self.mesh.mesh_scale,
            });
        }
        self.lods.validate()?;
        for (name, value) in [
            ("movement threshold", self.movement_threshold),
            ("collision distance", self.collision_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDistance { name, value });
            }
        }
        let radius = self.view_radius();
        if radius > MAX_CHUNKS_IN_VIEW as f32 {
            return Err(ConfigError::ViewRadiusTooLarge {
                chunks: radius,
                max: MAX_CHUNKS_IN_VIEW,
            });
        }
        if let Some(index) = self.collider_lod_index {
            if index >= self.lods.len() {
                return Err(ConfigError::ColliderLodOutOfRange {
                    index,
                    len: self.lods.len(),
                });
            }
        }
        Ok(())
    }

    /// LOD table index used for collision meshes.
    #[must_use]
    pub fn collider_index(&self) -> usize {
        let fallback = 1.min(self.lods.len().saturating_sub(1));
        self.collider_lod_index
            .or_else(|| self.lods.collision_index())
            .unwrap_or(fallback)
    }

    /// Maximum view distance in world units.
    #[must_use]
    pub fn max_view_distance(&self) -> f32 {
        self.lods.max_view_distance() * self.mesh.mesh_scale
    }

    /// Collision activation distance in world units.
    #[must_use]
    pub fn collision_activation_distance(&self) -> f32 {
        self.collision_distance * self.mesh.mesh_scale
    }

    /// Chunk radius scanned around the viewer, capped at [`MAX_CHUNKS_IN_VIEW`].
    #[must_use]
    pub fn chunks_in_view(&self) -> i32 {
        let radius = self.view_radius();
        if radius.is_nan() {
            return 0;
        }
        radius.min(MAX_CHUNKS_IN_VIEW as f32) as i32
    }

    fn view_radius(&self) -> f32 {
        (self.max_view_distance() / self.mesh.world_size()).ceil()
    }
}

/// A configuration change notification.
#[derive(Debug, Clone)]
pub enum SettingsChange {
    /// Height, noise or falloff settings changed
    HeightMap(HeightMapSettings),
    /// Mesh scale, tile size or shading changed
    Mesh(MeshSettings),
    /// Anything, replaced wholesale
    All(Box<TerrainSettings>),
}

impl SettingsChange {
    /// Applies the change to a copy of `current`.
    #[must_use]
    pub fn apply_to(self, current: &TerrainSettings) -> TerrainSettings {
        match self {
            Self::HeightMap(height) => TerrainSettings {
                height,
                ..current.clone()
            },
            Self::Mesh(mesh) => TerrainSettings {
                mesh,
                ..current.clone()
            },
            Self::All(settings) => *settings,
        }
    }
}
