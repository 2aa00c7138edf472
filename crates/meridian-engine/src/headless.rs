//! Headless collaborators that record what the streamer hands off.

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use tracing::{debug, trace};

use meridian_common::{ChunkCoord, CollisionHandle};
use meridian_world::{CollisionSink, MeshBuffers, RenderSink, Texture};

/// Counters shared by the headless renderer and physics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandoffStats {
    /// Meshes drawn (including LOD swaps)
    pub meshes_drawn: usize,
    /// Triangles across all drawn meshes
    pub triangles_drawn: usize,
    /// Chunks currently shown
    pub shown: HashSet<ChunkCoord>,
    /// Collision shapes built
    pub collision_shapes: usize,
    /// Triangles across all collision shapes
    pub collision_triangles: usize,
}

/// Shared handle to [`HandoffStats`].
pub type SharedStats = Arc<Mutex<HandoffStats>>;

/// Render sink that only records draws.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    stats: SharedStats,
}

impl HeadlessRenderer {
    /// Creates a new renderer writing into `stats`.
    #[must_use]
    pub fn new(stats: SharedStats) -> Self {
        Self { stats }
    }
}

impl RenderSink for HeadlessRenderer {
    fn draw_mesh(
        &mut self,
        coord: ChunkCoord,
        mesh: &Arc<MeshBuffers>,
        world_scale: f32,
        position: Vec2,
    ) {
        trace!(
            "draw {coord}: {} vertices, {} triangles at {position} x{world_scale}",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        let mut stats = self.stats.lock();
        stats.meshes_drawn += 1;
        stats.triangles_drawn += mesh.triangle_count();
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        let mut stats = self.stats.lock();
        if visible {
            stats.shown.insert(coord);
        } else {
            stats.shown.remove(&coord);
        }
    }

    fn draw_texture(&mut self, texture: &Texture) {
        debug!("Ignoring {}x{} preview texture", texture.width(), texture.height());
    }
}

/// Collision sink that hands out sequential handles.
#[derive(Debug, Clone)]
pub struct HeadlessPhysics {
    stats: SharedStats,
    next_handle: u64,
}

impl HeadlessPhysics {
    /// Creates a new physics sink writing into `stats`.
    #[must_use]
    pub fn new(stats: SharedStats) -> Self {
        Self {
            stats,
            next_handle: 1,
        }
    }
}

impl CollisionSink for HeadlessPhysics {
    fn build_collision_shape(&mut self, coord: ChunkCoord, mesh: &MeshBuffers) -> CollisionHandle {
        let handle = CollisionHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        debug!("collision shape {} for {coord}: {} triangles", handle.raw(), mesh.triangle_count());
        let mut stats = self.stats.lock();
        stats.collision_shapes += 1;
        stats.collision_triangles += mesh.triangle_count();
        handle
    }
}
