//! Coordinate types for the chunk grid and world-space bounds.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Chunk grid coordinate (identifies a terrain tile).
///
/// Equality is exact integer equality on both components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space (world Z, the ground plane's second axis)
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the chunk containing a ground-plane position.
    ///
    /// Chunk `c` is centred on `c * tile_world_size`, so the viewer's own tile
    /// is found with `floor((p - half) / size) + 1` per axis.
    #[must_use]
    pub fn containing(position: Vec2, tile_world_size: f32) -> Self {
        let half = tile_world_size / 2.0;
        Self {
            x: (((position.x - half) / tile_world_size).floor() as i32).saturating_add(1),
            z: (((position.y - half) / tile_world_size).floor() as i32).saturating_add(1),
        }
    }

    /// Returns this coordinate shifted by a grid offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// Iterates the square neighbourhood of the given radius, row by row.
    pub fn neighborhood(self, radius: i32) -> impl Iterator<Item = ChunkCoord> {
        (-radius..=radius)
            .flat_map(move |dz| (-radius..=radius).map(move |dx| self.offset(dx, dz)))
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Axis-aligned square on the ground plane (X/Z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Minimum corner
    pub min: Vec2,
    /// Side length
    pub size: f32,
}

impl WorldBounds {
    /// Creates bounds from a minimum corner and side length.
    #[must_use]
    pub const fn new(min: Vec2, size: f32) -> Self {
        Self { min, size }
    }

    /// Bounds of a chunk centred on `coord * tile_world_size`.
    #[must_use]
    pub fn for_chunk(coord: ChunkCoord, tile_world_size: f32) -> Self {
        let half = tile_world_size / 2.0;
        Self {
            min: Vec2::new(
                coord.x as f32 * tile_world_size - half,
                coord.z as f32 * tile_world_size - half,
            ),
            size: tile_world_size,
        }
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.min + Vec2::splat(self.size)
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min + Vec2::splat(self.size / 2.0)
    }

    /// Closest point inside the bounds to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max())
    }

    /// Euclidean distance from `point` to the bounds (zero inside).
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        (self.closest_point(point) - point).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_viewer_at_origin_maps_to_center_tile() {
        assert_eq!(
            ChunkCoord::containing(Vec2::ZERO, 100.0),
            ChunkCoord::new(0, 0)
        );
    }

    #[test]
    fn test_viewer_past_half_tile_maps_to_next_tile() {
        assert_eq!(
            ChunkCoord::containing(Vec2::new(149.0, 0.0), 100.0),
            ChunkCoord::new(1, 0)
        );
        assert_eq!(
            ChunkCoord::containing(Vec2::new(151.0, 0.0), 100.0),
            ChunkCoord::new(2, 0)
        );
        assert_eq!(
            ChunkCoord::containing(Vec2::new(-51.0, -49.0), 100.0),
            ChunkCoord::new(-1, 0)
        );
    }

    #[test]
    fn test_neighborhood_size() {
        let coords: Vec<_> = ChunkCoord::new(4, -1).neighborhood(2).collect();
        assert_eq!(coords.len(), 25);
        assert!(coords.contains(&ChunkCoord::new(2, -3)));
        assert!(coords.contains(&ChunkCoord::new(6, 1)));
    }

    #[test]
    fn test_distance_to_bounds() {
        let bounds = WorldBounds::for_chunk(ChunkCoord::new(0, 0), 100.0);
        assert_eq!(bounds.min, Vec2::new(-50.0, -50.0));
        assert_eq!(bounds.distance_to(Vec2::new(10.0, -20.0)), 0.0);
        assert_eq!(bounds.distance_to(Vec2::new(80.0, 0.0)), 30.0);
        assert_eq!(bounds.distance_to(Vec2::new(53.0, 54.0)), 5.0);
    }

    #[test]
    fn test_far_positions_saturate() {
        let far = ChunkCoord::containing(Vec2::new(1e12, -1e12), 235.0);
        assert_eq!(far, ChunkCoord::new(i32::MAX, i32::MIN + 1));
        assert_eq!(far.offset(5, -5), ChunkCoord::new(i32::MAX, i32::MIN));
        assert_eq!(far.neighborhood(1).count(), 9);
    }

    proptest! {
        #[test]
        fn prop_chunk_center_maps_back(
            x in -10_000i32..10_000,
            z in -10_000i32..10_000,
            size in 8.0f32..600.0,
        ) {
            let coord = ChunkCoord::new(x, z);
            let bounds = WorldBounds::for_chunk(coord, size);
            prop_assert_eq!(ChunkCoord::containing(bounds.center(), size), coord);
            prop_assert_eq!(bounds.distance_to(bounds.center()), 0.0);
        }
    }
}
