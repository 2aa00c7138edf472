//! Level-of-detail table and distance-based selection.

use serde::{Deserialize, Serialize};

use meridian_common::ConfigError;

/// Number of supported LOD levels (`0..NUM_SUPPORTED_LODS`).
pub const NUM_SUPPORTED_LODS: u32 = 5;

/// One row of the LOD table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelOfDetailSetting {
    /// Mesh LOD (0 = full resolution, otherwise vertex stride `lod * 2`)
    pub lod: u32,
    /// Distance up to which this entry is used, in unscaled units
    pub distance_threshold: f32,
    /// Whether this entry's mesh may back a collision shape
    #[serde(default)]
    pub usable_for_collision: bool,
}

impl LevelOfDetailSetting {
    /// Creates a table row.
    #[must_use]
    pub const fn new(lod: u32, distance_threshold: f32, usable_for_collision: bool) -> Self {
        Self {
            lod,
            distance_threshold,
            usable_for_collision,
        }
    }
}

/// LOD table ordered by ascending distance threshold.
///
/// The last entry's threshold is the maximum view distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LodTable(Vec<LevelOfDetailSetting>);

impl Default for LodTable {
    fn default() -> Self {
        Self(vec![
            LevelOfDetailSetting::new(0, 100.0, false),
            LevelOfDetailSetting::new(1, 250.0, true),
            LevelOfDetailSetting::new(4, 400.0, false),
        ])
    }
}

impl LodTable {
    /// Builds and validates a table.
    pub fn new(entries: Vec<LevelOfDetailSetting>) -> Result<Self, ConfigError> {
        let table = Self(entries);
        table.validate()?;
        Ok(table)
    }

    /// Checks ordering and supported LOD levels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::EmptyLodTable);
        }
        for (index, entry) in self.0.iter().enumerate() {
            if entry.lod >= NUM_SUPPORTED_LODS {
                return Err(ConfigError::UnsupportedLod {
                    lod: entry.lod,
                    max: NUM_SUPPORTED_LODS - 1,
                });
            }
            if !entry.distance_threshold.is_finite() || entry.distance_threshold < 0.0 {
                return Err(ConfigError::InvalidDistance {
                    name: "LOD distance threshold",
                    value: entry.distance_threshold,
                });
            }
            if index > 0 && entry.distance_threshold < self.0[index - 1].distance_threshold {
                return Err(ConfigError::UnsortedLodTable { index });
            }
        }
        Ok(())
    }

    /// Table rows.
    #[must_use]
    pub fn entries(&self) -> &[LevelOfDetailSetting] {
        &self.0
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Row at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LevelOfDetailSetting> {
        self.0.get(index)
    }

    /// Maximum view distance in unscaled units.
    #[must_use]
    pub fn max_view_distance(&self) -> f32 {
        self.0.last().map_or(0.0, |entry| entry.distance_threshold)
    }

    /// Index of the first row marked usable for collision.
    #[must_use]
    pub fn collision_index(&self) -> Option<usize> {
        self.0.iter().position(|entry| entry.usable_for_collision)
    }

    /// Selects the row for `distance` (inclusive thresholds).
    ///
    /// Falls back to the last, coarsest row when no threshold matches.
    #[must_use]
    pub fn select(&self, distance: f32) -> usize {
        self.select_scaled(distance, 1.0)
    }

    /// Like [`LodTable::select`], with every threshold multiplied by `scale`.
    #[must_use]
    pub fn select_scaled(&self, distance: f32, scale: f32) -> usize {
        let last = self.0.len().saturating_sub(1);
        self.0[..last]
            .iter()
            .position(|entry| distance <= entry.distance_threshold * scale)
            .unwrap_or(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_select_matches_thresholds() {
        let table = LodTable::default();
        assert_eq!(table.select(0.0), 0);
        assert_eq!(table.select(100.0), 0);
        assert_eq!(table.select(150.0), 1);
        assert_eq!(table.select(250.0), 1);
        assert_eq!(table.select(399.0), 2);
        assert_eq!(table.select(1000.0), 2);
    }

    #[test]
    fn test_select_scaled() {
        let table = LodTable::default();
        assert_eq!(table.select_scaled(240.0, 2.5), 0);
        assert_eq!(table.select_scaled(260.0, 2.5), 1);
    }

    #[test]
    fn test_single_entry_table() {
        let table =
            LodTable::new(vec![LevelOfDetailSetting::new(2, 50.0, true)]).expect("valid table");
        assert_eq!(table.select(0.0), 0);
        assert_eq!(table.select(500.0), 0);
        assert_eq!(table.max_view_distance(), 50.0);
    }

    #[test]
    fn test_validation() {
        assert_eq!(LodTable::new(vec![]), Err(ConfigError::EmptyLodTable));
        assert_eq!(
            LodTable::new(vec![
                LevelOfDetailSetting::new(0, 200.0, false),
                LevelOfDetailSetting::new(1, 100.0, false),
            ]),
            Err(ConfigError::UnsortedLodTable { index: 1 })
        );
        assert_eq!(
            LodTable::new(vec![LevelOfDetailSetting::new(7, 100.0, false)]),
            Err(ConfigError::UnsupportedLod { lod: 7, max: 4 })
        );
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        for bad in [f32::NAN, f32::INFINITY, -1.0] {
            let result = LodTable::new(vec![
                LevelOfDetailSetting::new(0, 100.0, false),
                LevelOfDetailSetting::new(1, bad, false),
            ]);
            assert!(
                matches!(result, Err(ConfigError::InvalidDistance { .. })),
                "threshold {bad} accepted"
            );
        }
    }

    #[test]
    fn test_collision_index() {
        assert_eq!(LodTable::default().collision_index(), Some(1));
    }

    proptest! {
        #[test]
        fn prop_selection_is_monotonic(a in 0.0f32..2000.0, b in 0.0f32..2000.0) {
            let table = LodTable::default();
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.select(near) <= table.select(far));
        }
    }
}
