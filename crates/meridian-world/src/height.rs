//! Height field synthesis.
//!
//! Noise samples are shaped by a curve and multiplier into world heights. The
//! produced grid is always one cell larger than requested on each side so
//! meshing can compute edge normals without looking outside the tile.

use glam::DVec2;
use tracing::trace;

use meridian_common::{ChunkCoord, ConfigError, TerrainResult};

use crate::falloff::{falloff_mask, FalloffMask};
use crate::noise::NoiseField;
use crate::settings::HeightMapSettings;

/// A bordered grid of heights plus the range tracked while filling it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightFieldSample {
    width: usize,
    height: usize,
    values: Vec<f32>,
    min_height: f32,
    max_height: f32,
}

impl HeightFieldSample {
    /// Wraps an existing row-major grid, computing its range.
    ///
    /// # Panics
    /// Panics if `values.len() != width * height`.
    #[must_use]
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Self {
        assert_eq!(
            values.len(),
            width * height,
            "height grid is {} values, expected {width}x{height}",
            values.len()
        );
        let (min_height, max_height) = values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self {
            width,
            height,
            values,
            min_height,
            max_height,
        }
    }

    /// Grid width including the border.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Grid height including the border.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Height at `(x, z)`.
    #[must_use]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[z * self.width + x]
    }

    /// Row-major heights.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Lowest height in the grid (border included).
    #[must_use]
    pub const fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Highest height in the grid (border included).
    #[must_use]
    pub const fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Subtracts `mask * (max - min)` from every cell, clamped to the range.
    pub fn apply_falloff(&mut self, mask: &FalloffMask) -> Result<(), ConfigError> {
        if mask.size() != self.width || mask.size() != self.height {
            return Err(ConfigError::FalloffSizeMismatch {
                mask: mask.size(),
                width: self.width,
                height: self.height,
            });
        }
        let range = self.max_height - self.min_height;
        for (value, weight) in self.values.iter_mut().zip(mask.values()) {
            *value = (*value - weight * range).clamp(self.min_height, self.max_height);
        }
        Ok(())
    }
}

/// Noise-space sample origin of a chunk.
///
/// Adjacent tiles overlap by their border ring, so tiles are spaced
/// `mesh_size - 1` samples apart. Integer spacing keeps the overlap exact.
#[must_use]
pub fn chunk_noise_offset(coord: ChunkCoord, mesh_size: usize) -> DVec2 {
    let spacing = (mesh_size - 1) as i64;
    DVec2::new(
        (i64::from(coord.x) * spacing) as f64,
        (i64::from(coord.z) * spacing) as f64,
    )
}

/// Generates a bordered height field of `(width + 2) x (height + 2)` cells.
///
/// `offset` is the tile's noise-space origin (see [`chunk_noise_offset`]).
pub fn generate(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    offset: DVec2,
) -> TerrainResult<HeightFieldSample> {
    let bordered_width = width + 2;
    let bordered_height = height + 2;
    let noise = NoiseField::new(&settings.noise.parameters());
    let scale = f64::from(settings.noise.effective_scale());
    let origin = offset + settings.noise.offset.as_dvec2();
    let half_width = bordered_width as f64 / 2.0;
    let half_height = bordered_height as f64 / 2.0;

    let mut values = Vec::with_capacity(bordered_width * bordered_height);
    let mut min_height = f32::MAX;
    let mut max_height = f32::MIN;
    for z in 0..bordered_height {
        let sample_z = (z as f64 - half_height + origin.y) / scale;
        for x in 0..bordered_width {
            let sample_x = (x as f64 - half_width + origin.x) / scale;
            let noise_value = noise.sample(sample_x, sample_z);
            let value = settings.multiplier * settings.curve.sample(noise_value);
            min_height = min_height.min(value);
            max_height = max_height.max(value);
            values.push(value);
        }
    }

    let mut sample = HeightFieldSample {
        width: bordered_width,
        height: bordered_height,
        values,
        min_height,
        max_height,
    };
    if settings.use_falloff {
        sample.apply_falloff(&falloff_mask(bordered_width))?;
    }
    trace!(
        "Generated {bordered_width}x{bordered_height} height field at {origin} ({min_height}..{max_height})"
    );
    Ok(sample)
}

/// Generates the bordered height field for a chunk.
pub fn generate_chunk(
    coord: ChunkCoord,
    mesh_size: usize,
    settings: &HeightMapSettings,
) -> TerrainResult<HeightFieldSample> {
    generate(
        mesh_size,
        mesh_size,
        settings,
        chunk_noise_offset(coord, mesh_size),
    )
}
