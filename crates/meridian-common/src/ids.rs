//! Identifier types for chunk generations and external handles.

use serde::{Deserialize, Serialize};

/// Monotonically increasing per-chunk generation number.
///
/// Every async request is tagged with the chunk's tag at submission time.
/// Results whose tag no longer matches are stale and get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenerationTag(u64);

impl GenerationTag {
    /// Tag of a freshly created chunk.
    pub const INITIAL: Self = Self(0);

    /// Returns the following tag.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GenerationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Opaque handle returned by the physics collaborator for a collision shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionHandle(u64);

impl CollisionHandle {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
