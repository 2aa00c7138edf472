//! Deterministic 2D fractal noise.
//!
//! Layers of simplex noise are summed with per-octave frequency and amplitude
//! scaling, then remapped from `[-1, 1]` to `[0, 1]`. A [`NoiseField`] has no
//! hidden state, so any number of threads can sample the same parameters and
//! get bit-identical results.

use ::noise::{Fbm, MultiFractal, NoiseFn, Simplex};
use serde::{Deserialize, Serialize};

use meridian_common::ConfigError;

/// Smallest frequency a field will sample with.
pub const MIN_FREQUENCY: f64 = 1.0e-6;

/// Largest supported octave count.
pub const MAX_OCTAVES: u32 = 16;

/// Parameters of one fractal noise field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    /// Seed for the base simplex primitive
    pub seed: i32,
    /// Base frequency (clamped to [`MIN_FREQUENCY`] when sampling)
    pub frequency: f32,
    /// Number of summed layers
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f32,
    /// Amplitude multiplier between octaves
    pub persistence: f32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 0.0075,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

impl NoiseParameters {
    /// Checks the parameters against their documented ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency.is_nan() || self.frequency <= 0.0 {
            return Err(ConfigError::NonPositiveFrequency(self.frequency));
        }
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(ConfigError::InvalidOctaves {
                octaves: self.octaves,
                max: MAX_OCTAVES,
            });
        }
        if self.lacunarity.is_nan() || self.lacunarity <= 0.0 {
            return Err(ConfigError::InvalidLacunarity(self.lacunarity));
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            return Err(ConfigError::PersistenceOutOfRange(self.persistence));
        }
        Ok(())
    }
}

/// A ready-to-sample fractal noise field.
pub struct NoiseField {
    params: NoiseParameters,
    fbm: Fbm<Simplex>,
}

impl NoiseField {
    /// Builds the field for the given parameters.
    ///
    /// A non-positive frequency is clamped to [`MIN_FREQUENCY`]; use
    /// [`NoiseParameters::validate`] to reject it instead.
    #[must_use]
    pub fn new(params: &NoiseParameters) -> Self {
        let frequency = f64::from(params.frequency).max(MIN_FREQUENCY);
        let octaves = params.octaves.clamp(1, MAX_OCTAVES) as usize;
        let fbm = Fbm::<Simplex>::new(params.seed as u32)
            .set_octaves(octaves)
            .set_frequency(frequency)
            .set_lacunarity(f64::from(params.lacunarity))
            .set_persistence(f64::from(params.persistence));
        Self {
            params: *params,
            fbm,
        }
    }

    /// Samples the field at `(x, z)`, returning a value in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, z: f64) -> f32 {
        let raw = self.fbm.get([x, z]).clamp(-1.0, 1.0);
        ((raw + 1.0) / 2.0) as f32
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Samples a one-off field. Equivalent to `NoiseField::new(params).sample(x, z)`.
#[must_use]
pub fn sample(params: &NoiseParameters, x: f64, z: f64) -> f32 {
    NoiseField::new(params).sample(x, z)
}
