//! Error types for Project Meridian.

use thiserror::Error;

/// Top-level error type for terrain operations.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors (e.g. a worker thread could not be spawned)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
///
/// These indicate a caller or settings bug and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Noise frequency must be positive
    #[error("Noise frequency must be positive, got {0}")]
    NonPositiveFrequency(f32),

    /// Octave count out of range
    #[error("Octave count must be between 1 and {max}, got {octaves}")]
    InvalidOctaves {
        /// Requested octaves
        octaves: u32,
        /// Maximum supported
        max: u32,
    },

    /// Lacunarity must be positive
    #[error("Lacunarity must be positive, got {0}")]
    InvalidLacunarity(f32),

    /// Persistence outside [0, 1]
    #[error("Persistence must be within [0, 1], got {0}")]
    PersistenceOutOfRange(f32),

    /// A scale factor must be positive
    #[error("{name} must be positive, got {value}")]
    NonPositiveScale {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// Falloff mask does not match the height field
    #[error("Falloff mask is {mask}x{mask} but height field is {width}x{height}")]
    FalloffSizeMismatch {
        /// Mask side length
        mask: usize,
        /// Height field width
        width: usize,
        /// Height field height
        height: usize,
    },

    /// LOD table has no entries
    #[error("LOD table must contain at least one entry")]
    EmptyLodTable,

    /// LOD thresholds are not ascending
    #[error("LOD threshold at index {index} is lower than its predecessor")]
    UnsortedLodTable {
        /// First offending index
        index: usize,
    },

    /// LOD level outside the supported range
    #[error("LOD {lod} is not supported (max {max})")]
    UnsupportedLod {
        /// Requested LOD
        lod: u32,
        /// Highest supported LOD
        max: u32,
    },

    /// Collider LOD index does not name a table entry
    #[error("Collider LOD index {index} is out of range for {len} LOD entries")]
    ColliderLodOutOfRange {
        /// Requested index
        index: usize,
        /// Table length
        len: usize,
    },

    /// Chunk size index outside the supported size table
    #[error("Chunk size index {index} is out of range (max {max})")]
    ChunkSizeIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Highest valid index
        max: usize,
    },

    /// A distance setting is negative or not finite
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidDistance {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// View distance spans more chunks than the streamer will scan
    #[error("View distance covers {chunks} chunks per side (max {max})")]
    ViewRadiusTooLarge {
        /// Requested chunk radius
        chunks: f32,
        /// Largest accepted radius
        max: i32,
    },

    /// Curve has no control points
    #[error("Curve must contain at least one control point")]
    EmptyCurve,

    /// Curve is not monotonic
    #[error("Curve control point {index} breaks monotonic ordering")]
    NonMonotonicCurve {
        /// First offending point
        index: usize,
    },
}

/// Result type alias for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
