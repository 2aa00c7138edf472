//! Interfaces to the rendering, physics and viewpoint collaborators.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use tracing::{trace, warn};

use meridian_common::{ChunkCoord, CollisionHandle};

use crate::mesh::MeshBuffers;
use crate::preview::Texture;

/// Receives renderable geometry and textures.
pub trait RenderSink {
    /// Shows `mesh` for the chunk at `coord`, placed with its footprint's
    /// minimum corner at `position` and scaled uniformly by `world_scale`.
    fn draw_mesh(
        &mut self,
        coord: ChunkCoord,
        mesh: &Arc<MeshBuffers>,
        world_scale: f32,
        position: Vec2,
    );

    /// Shows or hides the chunk's renderable object.
    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);

    /// Displays a preview texture.
    fn draw_texture(&mut self, texture: &Texture);
}

/// Builds physical collision shapes from triangle meshes.
pub trait CollisionSink {
    /// Derives a collision shape from the chunk's collision-LOD mesh.
    fn build_collision_shape(&mut self, coord: ChunkCoord, mesh: &MeshBuffers) -> CollisionHandle;
}

/// Supplies the viewpoint once per tick.
pub trait ViewpointSource {
    /// Returns the current viewpoint in world space.
    fn viewpoint(&mut self) -> Vec3;
}

impl<F: FnMut() -> Vec3> ViewpointSource for F {
    fn viewpoint(&mut self) -> Vec3 {
        self()
    }
}

/// Attached collaborators. Calls to a missing collaborator are skipped with a
/// warning the first time and a trace afterwards.
#[derive(Default)]
pub struct Collaborators {
    render: Option<Box<dyn RenderSink>>,
    collision: Option<Box<dyn CollisionSink>>,
    warned_render: bool,
    warned_collision: bool,
}

impl Collaborators {
    /// Creates an empty set of collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the rendering collaborator.
    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.render = Some(sink);
        self.warned_render = false;
    }

    /// Attaches the physics collaborator.
    pub fn set_collision_sink(&mut self, sink: Box<dyn CollisionSink>) {
        self.collision = Some(sink);
        self.warned_collision = false;
    }

    /// Whether a rendering collaborator is attached.
    #[must_use]
    pub fn has_render_sink(&self) -> bool {
        self.render.is_some()
    }

    /// Whether a physics collaborator is attached.
    #[must_use]
    pub fn has_collision_sink(&self) -> bool {
        self.collision.is_some()
    }

    pub(crate) fn draw_mesh(
        &mut self,
        coord: ChunkCoord,
        mesh: &Arc<MeshBuffers>,
        world_scale: f32,
        position: Vec2,
    ) {
        match self.render.as_mut() {
            Some(sink) => sink.draw_mesh(coord, mesh, world_scale, position),
            None => self.missing_render(coord, "draw_mesh"),
        }
    }

    pub(crate) fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        match self.render.as_mut() {
            Some(sink) => sink.set_visible(coord, visible),
            None => self.missing_render(coord, "set_visible"),
        }
    }

    pub(crate) fn build_collision_shape(
        &mut self,
        coord: ChunkCoord,
        mesh: &MeshBuffers,
    ) -> Option<CollisionHandle> {
        if let Some(sink) = self.collision.as_mut() {
            return Some(sink.build_collision_shape(coord, mesh));
        }
        if self.warned_collision {
            trace!("No collision sink attached; skipping shape for chunk {coord}");
        } else {
            warn!("No collision sink attached; collision shapes will not be built");
            self.warned_collision = true;
        }
        None
    }

    fn missing_render(&mut self, coord: ChunkCoord, call: &str) {
        if self.warned_render {
            trace!("No render sink attached; skipping {call} for chunk {coord}");
        } else {
            warn!("No render sink attached; terrain will not be drawn");
            self.warned_render = true;
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("render", &self.render.is_some())
            .field("collision", &self.collision.is_some())
            .finish()
    }
}
