//! # Meridian World
//!
//! Procedural terrain for Meridian.
//!
//! This crate handles:
//! - Fractal noise sampling and height-field synthesis
//! - Seam-free LOD mesh generation
//! - Chunk lifecycle and streaming around a viewpoint
//! - Background generation with owner-thread completion
//! - Map previews for inspecting settings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod curve;
pub mod falloff;
pub mod height;
pub mod lod;
pub mod mesh;
pub mod noise;
pub mod preview;
pub mod settings;
pub mod sinks;
pub mod streaming;
pub mod work_queue;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::curve::*;
    pub use crate::falloff::{falloff_mask, FalloffMask};
    pub use crate::height::{chunk_noise_offset, HeightFieldSample};
    pub use crate::lod::*;
    pub use crate::mesh::{lod_stride, vertices_per_line, MeshBuffers};
    pub use crate::noise::{NoiseField, NoiseParameters};
    pub use crate::preview::*;
    pub use crate::settings::*;
    pub use crate::sinks::*;
    pub use crate::streaming::*;
    pub use crate::work_queue::*;
}

pub use prelude::*;
