//! Terrain chunk lifecycle.
//!
//! A chunk owns one tile's height field, a lazily filled mesh cache with one
//! slot per configured LOD, and its collision state. Async results are applied
//! through free functions keyed by coordinate and [`GenerationTag`], so results
//! requested before a reset are recognised and dropped.

use std::sync::Arc;

use ahash::AHashMap;
use crossbeam_channel::Sender;
use glam::Vec2;
use tracing::{debug, error, info, trace};

use meridian_common::{ChunkCoord, CollisionHandle, GenerationTag, TerrainResult, WorldBounds};

use crate::height::{self, HeightFieldSample};
use crate::mesh::{self, MeshBuffers};
use crate::settings::TerrainSettings;
use crate::sinks::Collaborators;
use crate::work_queue::WorkQueue;

/// Resident chunks keyed by grid coordinate; also the async completion context.
pub type ChunkMap = AHashMap<ChunkCoord, TerrainChunk>;

/// Mesh cache entry for one LOD.
#[derive(Debug, Clone, Default)]
pub enum LodSlot {
    /// No build issued
    #[default]
    NotRequested,
    /// Build in flight
    Requested,
    /// Mesh available
    Ready(Arc<MeshBuffers>),
}

impl LodSlot {
    /// Returns the mesh if it is ready.
    #[must_use]
    pub fn mesh(&self) -> Option<&Arc<MeshBuffers>> {
        match self {
            Self::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum HeightState {
    Pending { requested: bool },
    Ready(Arc<HeightFieldSample>),
    Failed,
}

/// Height-data phase of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Waiting for a height field (requested or about to be)
    AwaitingHeightData,
    /// Height field available; meshes can be built
    HeightDataReady,
    /// Height generation failed; waits for the next reset
    Failed,
}

/// Collision phase of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionState {
    /// No shape built yet
    Unbuilt,
    /// Shape built from the collision LOD
    Ready(CollisionHandle),
}

/// Emitted when a chunk becomes visible or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    /// Chunk coordinate
    pub coord: ChunkCoord,
    /// New visibility
    pub visible: bool,
}

/// Everything a chunk needs from its owner during an update.
pub struct ChunkContext<'a> {
    /// Active settings
    pub settings: &'a Arc<TerrainSettings>,
    /// Async work queue completing into the chunk map
    pub queue: &'a WorkQueue<ChunkMap>,
    /// Rendering and physics collaborators
    pub sinks: &'a mut Collaborators,
    /// Visibility notifications
    pub events: &'a Sender<VisibilityEvent>,
}

/// One streamed terrain tile.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    bounds: WorldBounds,
    generation: GenerationTag,
    height: HeightState,
    lods: Vec<LodSlot>,
    displayed_lod: Option<usize>,
    collision: CollisionState,
    visible: bool,
    dirty: bool,
}

impl TerrainChunk {
    /// Creates a new chunk awaiting its height data.
    #[must_use]
    pub fn new(coord: ChunkCoord, settings: &TerrainSettings) -> Self {
        Self {
            coord,
            bounds: WorldBounds::for_chunk(coord, settings.mesh.world_size()),
            generation: GenerationTag::INITIAL,
            height: HeightState::Pending { requested: false },
            lods: vec![LodSlot::NotRequested; settings.lods.len()],
            displayed_lod: None,
            collision: CollisionState::Unbuilt,
            visible: false,
            dirty: false,
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the world-space bounds.
    #[must_use]
    pub const fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Returns the current generation tag.
    #[must_use]
    pub const fn generation(&self) -> GenerationTag {
        self.generation
    }

    /// Returns the height-data phase.
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        match self.height {
            HeightState::Pending { .. } => ChunkState::AwaitingHeightData,
            HeightState::Ready(_) => ChunkState::HeightDataReady,
            HeightState::Failed => ChunkState::Failed,
        }
    }

    /// Whether a height request has been issued for the current generation.
    #[must_use]
    pub const fn height_requested(&self) -> bool {
        matches!(self.height, HeightState::Pending { requested: true })
    }

    /// Returns the height field, if loaded.
    #[must_use]
    pub fn height_field(&self) -> Option<&Arc<HeightFieldSample>> {
        match &self.height {
            HeightState::Ready(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the mesh cache slot for a LOD index.
    #[must_use]
    pub fn lod_slot(&self, index: usize) -> Option<&LodSlot> {
        self.lods.get(index)
    }

    /// Returns the LOD index currently shown, if any.
    #[must_use]
    pub const fn displayed_lod(&self) -> Option<usize> {
        self.displayed_lod
    }

    /// Returns the collision phase.
    #[must_use]
    pub const fn collision(&self) -> CollisionState {
        self.collision
    }

    /// Whether the chunk is visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether new async results arrived since the last full pass.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Discards all generated data so it is rebuilt from `settings`.
    ///
    /// The height request is issued on the next update, so consecutive resets
    /// produce a single request.
    pub fn reset(&mut self, settings: &TerrainSettings) {
        self.generation = self.generation.next();
        self.bounds = WorldBounds::for_chunk(self.coord, settings.mesh.world_size());
        self.height = HeightState::Pending { requested: false };
        self.lods = vec![LodSlot::NotRequested; settings.lods.len()];
        self.displayed_lod = None;
        self.collision = CollisionState::Unbuilt;
        self.dirty = true;
        debug!("Reset chunk {} ({})", self.coord, self.generation);
    }

    /// Issues the height request for the current generation if not yet done.
    pub fn ensure_height_requested(&mut self, ctx: &ChunkContext<'_>) {
        if !matches!(self.height, HeightState::Pending { requested: false }) {
            return;
        }
        let coord = self.coord;
        let tag = self.generation;
        let mesh_size = ctx.settings.mesh.mesh_size();
        let height_settings = ctx.settings.height.clone();
        let submitted = ctx.queue.submit(
            move || height::generate_chunk(coord, mesh_size, &height_settings),
            move |chunks: &mut ChunkMap, result| on_height_generated(chunks, coord, tag, result),
        );
        match submitted {
            Ok(()) => {
                self.height = HeightState::Pending { requested: true };
                trace!("Requested height data for chunk {coord} ({tag})");
            },
            Err(e) => error!("Failed to request height data for chunk {coord}: {e}"),
        }
    }

    /// Chooses visibility and LOD for the viewpoint, requesting a mesh if the
    /// desired LOD is not cached yet.
    pub fn update_visibility_lod(&mut self, viewpoint: Vec2, ctx: &mut ChunkContext<'_>) {
        self.ensure_height_requested(ctx);
        let HeightState::Ready(field) = &self.height else {
            return;
        };
        let field = Arc::clone(field);

        let settings = ctx.settings;
        let distance = self.bounds.distance_to(viewpoint);
        let was_visible = self.visible;
        let visible = distance <= settings.max_view_distance();

        if visible {
            let index = settings.lods.select_scaled(distance, settings.mesh.mesh_scale);
            if self.displayed_lod != Some(index) {
                match self.lods.get(index).cloned().unwrap_or_default() {
                    LodSlot::Ready(mesh) => {
                        debug!(
                            "Chunk {} LOD {:?} -> {index}",
                            self.coord, self.displayed_lod
                        );
                        ctx.sinks.draw_mesh(
                            self.coord,
                            &mesh,
                            settings.mesh.mesh_scale,
                            self.bounds.min,
                        );
                        self.displayed_lod = Some(index);
                    },
                    LodSlot::Requested => {},
                    LodSlot::NotRequested => self.request_mesh(index, &field, ctx),
                }
            }
        }

        if was_visible != visible {
            self.visible = visible;
            ctx.sinks.set_visible(self.coord, visible);
            // The receiver lives as long as the streamer that owns this chunk.
            let _ = ctx.events.send(VisibilityEvent {
                coord: self.coord,
                visible,
            });
        }
    }

    /// Builds the collision shape once the viewpoint is close enough and the
    /// collision LOD mesh is available.
    pub fn update_collision(&mut self, viewpoint: Vec2, ctx: &mut ChunkContext<'_>) {
        if matches!(self.collision, CollisionState::Ready(_)) || !self.visible {
            return;
        }
        let HeightState::Ready(field) = &self.height else {
            return;
        };
        let field = Arc::clone(field);

        let settings = ctx.settings;
        if self.bounds.distance_to(viewpoint) > settings.collision_activation_distance() {
            return;
        }

        let index = settings.collider_index();
        match self.lods.get(index) {
            Some(LodSlot::Ready(mesh)) => {
                if let Some(handle) = ctx.sinks.build_collision_shape(self.coord, mesh) {
                    info!("Built collision shape for chunk {} from LOD index {index}", self.coord);
                    self.collision = CollisionState::Ready(handle);
                }
            },
            Some(LodSlot::NotRequested) => self.request_mesh(index, &field, ctx),
            Some(LodSlot::Requested) | None => {},
        }
    }

    fn request_mesh(
        &mut self,
        index: usize,
        field: &Arc<HeightFieldSample>,
        ctx: &ChunkContext<'_>,
    ) {
        let (Some(setting), Some(_)) = (ctx.settings.lods.get(index), self.lods.get(index))
        else {
            return;
        };
        let lod = setting.lod;
        let flat_shading = ctx.settings.mesh.flat_shading;
        let coord = self.coord;
        let tag = self.generation;
        let field = Arc::clone(field);
        let submitted = ctx.queue.submit(
            move || mesh::build(&field, lod, flat_shading),
            move |chunks: &mut ChunkMap, mesh| on_mesh_built(chunks, coord, tag, index, mesh),
        );
        match submitted {
            Ok(()) => {
                self.lods[index] = LodSlot::Requested;
                trace!("Requested LOD {lod} mesh for chunk {coord} ({tag})");
            },
            Err(e) => error!("Failed to request LOD {lod} mesh for chunk {coord}: {e}"),
        }
    }

    fn complete_height(&mut self, tag: GenerationTag, result: TerrainResult<HeightFieldSample>) {
        if tag != self.generation {
            debug!(
                "Discarding stale height data for chunk {} ({tag}, current {})",
                self.coord, self.generation
            );
            return;
        }
        match result {
            Ok(field) => {
                self.height = HeightState::Ready(Arc::new(field));
                self.lods.iter_mut().for_each(|slot| *slot = LodSlot::NotRequested);
                self.displayed_lod = None;
                self.collision = CollisionState::Unbuilt;
                self.dirty = true;
            },
            Err(e) => {
                error!("Height generation failed for chunk {}: {e}", self.coord);
                self.height = HeightState::Failed;
            },
        }
    }

    fn complete_mesh(&mut self, tag: GenerationTag, index: usize, mesh: MeshBuffers) {
        if tag != self.generation {
            debug!(
                "Discarding stale LOD index {index} mesh for chunk {} ({tag}, current {})",
                self.coord, self.generation
            );
            return;
        }
        if let Some(slot) = self.lods.get_mut(index) {
            *slot = LodSlot::Ready(Arc::new(mesh));
            self.dirty = true;
        }
    }
}

/// Applies a finished height field to the chunk it was requested for.
fn on_height_generated(
    chunks: &mut ChunkMap,
    coord: ChunkCoord,
    tag: GenerationTag,
    result: TerrainResult<HeightFieldSample>,
) {
    match chunks.get_mut(&coord) {
        Some(chunk) => chunk.complete_height(tag, result),
        None => debug!("Height data for unknown chunk {coord} dropped"),
    }
}

/// Applies a finished mesh to the chunk it was requested for.
fn on_mesh_built(
    chunks: &mut ChunkMap,
    coord: ChunkCoord,
    tag: GenerationTag,
    index: usize,
    mesh: MeshBuffers,
) {
    match chunks.get_mut(&coord) {
        Some(chunk) => chunk.complete_mesh(tag, index, mesh),
        None => debug!("Mesh for unknown chunk {coord} dropped"),
    }
}
