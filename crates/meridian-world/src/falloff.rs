//! Radial falloff mask.
//!
//! The mask fades terrain toward the edges of a tile, turning each tile into
//! an island. It depends only on its size, so one mask is cached process-wide
//! and rebuilt when a different size is requested.

use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use tracing::debug;

use crate::curve::HeightCurve;

/// Square grid of falloff weights in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FalloffMask {
    size: usize,
    values: Vec<f32>,
}

impl FalloffMask {
    /// Generates a mask of `size` x `size` using the default falloff curve.
    #[must_use]
    pub fn generate(size: usize) -> Self {
        let curve = HeightCurve::falloff_default();
        let mut values = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let nx = x as f32 / size as f32 * 2.0 - 1.0;
                let ny = y as f32 / size as f32 * 2.0 - 1.0;
                let value = nx.abs().max(ny.abs());
                values.push(curve.sample(value).clamp(0.0, 1.0));
            }
        }
        Self { size, values }
    }

    /// Side length of the mask.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Weight at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }

    /// All weights, row-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

static FALLOFF_CACHE: Mutex<Option<Arc<FalloffMask>>> = const_mutex(None);

/// Returns the shared mask for `size`, generating it if the cached mask has a
/// different size.
#[must_use]
pub fn falloff_mask(size: usize) -> Arc<FalloffMask> {
    let mut cache = FALLOFF_CACHE.lock();
    if let Some(mask) = cache.as_ref() {
        if mask.size() == size {
            return Arc::clone(mask);
        }
    }
    debug!("Generating {size}x{size} falloff mask");
    let mask = Arc::new(FalloffMask::generate(size));
    *cache = Some(Arc::clone(&mask));
    mask
}
