//! # Meridian Common
//!
//! Common types shared by every Meridian crate:
//! - Chunk grid coordinates and world-space bounds
//! - Identifier types (generation tags, collision handles)
//! - The configuration/terrain error taxonomy
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bounds_round_trip() {
        let coord = ChunkCoord::new(3, -2);
        let bounds = WorldBounds::for_chunk(coord, 100.0);
        assert_eq!(ChunkCoord::containing(bounds.center(), 100.0), coord);
    }

    #[test]
    fn test_generation_tags_increase() {
        let tag = GenerationTag::INITIAL;
        assert!(tag.next() > tag);
        assert_ne!(tag.next(), tag.next().next());
    }

    #[test]
    fn test_config_error_converts() {
        let err: TerrainError = ConfigError::EmptyLodTable.into();
        assert!(matches!(err, TerrainError::Config(_)));
    }
}
