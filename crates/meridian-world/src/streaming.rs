//! Endless terrain streaming around a moving viewpoint.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::{Vec2, Vec3};
use tracing::{debug, error, info};

use meridian_common::{ChunkCoord, TerrainResult};

use crate::chunk::{ChunkContext, ChunkMap, CollisionState, TerrainChunk, VisibilityEvent};
use crate::settings::{SettingsChange, TerrainSettings};
use crate::sinks::{Collaborators, CollisionSink, RenderSink, ViewpointSource};
use crate::work_queue::WorkQueue;

/// Streaming diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamerStats {
    /// Chunks in the map (visible or hidden)
    pub resident: usize,
    /// Chunks in the visible set
    pub visible: usize,
    /// Async requests not yet applied
    pub in_flight: usize,
    /// Chunks with a collision shape
    pub collision_shapes: usize,
    /// Full neighbourhood passes run so far
    pub full_passes: u64,
}

/// Creates, updates and hides terrain chunks around the viewpoint.
pub struct Streamer {
    /// Active settings
    settings: Arc<TerrainSettings>,
    /// Every chunk created so far
    chunks: ChunkMap,
    /// Coordinates of visible chunks, maintained from visibility events
    visible: AHashSet<ChunkCoord>,
    /// Height and mesh generation
    queue: WorkQueue<ChunkMap>,
    /// Rendering and physics collaborators
    sinks: Collaborators,
    events_tx: Sender<VisibilityEvent>,
    events_rx: Receiver<VisibilityEvent>,
    settings_tx: Sender<SettingsChange>,
    settings_rx: Receiver<SettingsChange>,
    /// Viewpoint of the previous tick
    last_viewpoint: Option<Vec3>,
    /// Viewpoint of the last full pass (`None` forces one)
    last_full_pass: Option<Vec3>,
    full_passes: u64,
}

impl Streamer {
    /// Creates a new streamer with validated settings.
    ///
    /// # Errors
    /// Returns an error if the settings are invalid.
    pub fn new(settings: TerrainSettings) -> TerrainResult<Self> {
        settings.validate()?;
        let (events_tx, events_rx) = unbounded();
        let (settings_tx, settings_rx) = unbounded();
        info!(
            "Terrain streamer ready: tile {} ({} world units), view distance {}, radius {}",
            settings.mesh.mesh_size(),
            settings.mesh.world_size(),
            settings.max_view_distance(),
            settings.chunks_in_view()
        );
        Ok(Self {
            settings: Arc::new(settings),
            chunks: ChunkMap::default(),
            visible: AHashSet::new(),
            queue: WorkQueue::new("terrain"),
            sinks: Collaborators::new(),
            events_tx,
            events_rx,
            settings_tx,
            settings_rx,
            last_viewpoint: None,
            last_full_pass: None,
            full_passes: 0,
        })
    }

    /// Attaches the rendering collaborator.
    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.sinks.set_render_sink(sink);
    }

    /// Attaches the physics collaborator.
    pub fn set_collision_sink(&mut self, sink: Box<dyn CollisionSink>) {
        self.sinks.set_collision_sink(sink);
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Returns a sender for settings change notifications, applied at the
    /// start of the next tick.
    #[must_use]
    pub fn settings_sender(&self) -> Sender<SettingsChange> {
        self.settings_tx.clone()
    }

    /// Returns the chunk at `coord`, if resident.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Iterates over resident chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Returns the visible set.
    #[must_use]
    pub fn visible_chunks(&self) -> &AHashSet<ChunkCoord> {
        &self.visible
    }

    /// Chunk coordinate containing a viewpoint.
    #[must_use]
    pub fn viewer_coord(&self, viewpoint: Vec3) -> ChunkCoord {
        ChunkCoord::containing(Vec2::new(viewpoint.x, viewpoint.z), self.settings.mesh.world_size())
    }

    /// Whether any resident chunk has unapplied async results.
    #[must_use]
    pub fn has_dirty_chunks(&self) -> bool {
        self.chunks.values().any(TerrainChunk::is_dirty)
    }

    /// Returns streaming statistics.
    #[must_use]
    pub fn stats(&self) -> StreamerStats {
        StreamerStats {
            resident: self.chunks.len(),
            visible: self.visible.len(),
            in_flight: self.queue.in_flight(),
            collision_shapes: self
                .chunks
                .values()
                .filter(|c| matches!(c.collision(), CollisionState::Ready(_)))
                .count(),
            full_passes: self.full_passes,
        }
    }

    /// Blocks until async results are ready or `timeout` elapses.
    ///
    /// For headless drivers; the regular tick never waits.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        self.queue.wait_for_completions(timeout)
    }

    /// Validates and applies new settings, resetting every resident chunk once.
    ///
    /// # Errors
    /// Returns an error and keeps the current settings if `settings` is invalid.
    pub fn apply_settings(&mut self, settings: TerrainSettings) -> TerrainResult<()> {
        if let Err(e) = settings.validate() {
            error!("Rejected terrain settings: {e}");
            return Err(e.into());
        }
        self.settings = Arc::new(settings);
        for chunk in self.chunks.values_mut() {
            chunk.reset(&self.settings);
        }
        self.last_full_pass = None;
        info!("Applied terrain settings; reset {} chunks", self.chunks.len());
        Ok(())
    }

    /// Applies a single change notification.
    ///
    /// # Errors
    /// Returns an error if the resulting settings are invalid.
    pub fn apply_change(&mut self, change: SettingsChange) -> TerrainResult<()> {
        let next = change.apply_to(&self.settings);
        self.apply_settings(next)
    }

    /// Advances streaming by one tick, reading the viewpoint from `source` once.
    pub fn tick_with(&mut self, source: &mut impl ViewpointSource) {
        let viewpoint = source.viewpoint();
        self.tick(viewpoint);
    }

    /// Advances streaming by one tick.
    pub fn tick(&mut self, viewpoint: Vec3) {
        self.process_settings_changes();
        self.queue.drain(&mut self.chunks);

        let ground = Vec2::new(viewpoint.x, viewpoint.z);
        let moved = self.last_viewpoint != Some(viewpoint);
        let dirty = self.has_dirty_chunks();
        if moved || dirty {
            self.update_collisions(ground);
        }

        let full_pass = match self.last_full_pass {
            None => true,
            Some(previous) => {
                dirty || previous.distance(viewpoint) > self.settings.movement_threshold
            },
        };
        if full_pass {
            self.last_full_pass = Some(viewpoint);
            self.update_visible_chunks(ground);
        }
        self.last_viewpoint = Some(viewpoint);
    }

    fn process_settings_changes(&mut self) {
        while let Ok(change) = self.settings_rx.try_recv() {
            // Rejections are logged by apply_settings; the old settings stay active.
            let _ = self.apply_change(change);
        }
    }

    fn update_collisions(&mut self, viewpoint: Vec2) {
        let mut ctx = ChunkContext {
            settings: &self.settings,
            queue: &self.queue,
            sinks: &mut self.sinks,
            events: &self.events_tx,
        };
        for coord in &self.visible {
            if let Some(chunk) = self.chunks.get_mut(coord) {
                chunk.update_collision(viewpoint, &mut ctx);
            }
        }
    }

    /// Rechecks visible chunks, then creates and updates the neighbourhood.
    fn update_visible_chunks(&mut self, viewpoint: Vec2) {
        self.full_passes += 1;
        self.chunks.values_mut().for_each(TerrainChunk::clear_dirty);

        let settings = &self.settings;
        let center = ChunkCoord::containing(viewpoint, settings.mesh.world_size());
        let radius = settings.chunks_in_view();
        let mut ctx = ChunkContext {
            settings,
            queue: &self.queue,
            sinks: &mut self.sinks,
            events: &self.events_tx,
        };

        for coord in &self.visible {
            if let Some(chunk) = self.chunks.get_mut(coord) {
                chunk.update_visibility_lod(viewpoint, &mut ctx);
            }
        }

        let mut created = 0_usize;
        for coord in center.neighborhood(radius) {
            let chunk = self.chunks.entry(coord).or_insert_with(|| {
                created += 1;
                TerrainChunk::new(coord, settings)
            });
            chunk.update_visibility_lod(viewpoint, &mut ctx);
        }
        if created > 0 {
            debug!("Created {created} chunks around {center}");
        }

        while let Ok(event) = self.events_rx.try_recv() {
            if event.visible {
                self.visible.insert(event.coord);
            } else {
                self.visible.remove(&event.coord);
            }
        }
    }
}

impl std::fmt::Debug for Streamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Streamer")
            .field("stats", &self.stats())
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::{LevelOfDetailSetting, LodTable};
    use meridian_common::{CollisionHandle, GenerationTag, TerrainError};
    use parking_lot::Mutex;

    use crate::mesh::MeshBuffers;
    use crate::preview::Texture;

    #[derive(Default)]
    struct Log {
        draws: usize,
        shown: AHashSet<ChunkCoord>,
        shapes: Vec<ChunkCoord>,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Log>>);

    impl RenderSink for Recorder {
        fn draw_mesh(&mut self, _: ChunkCoord, _: &Arc<MeshBuffers>, _: f32, _: Vec2) {
            self.0.lock().draws += 1;
        }

        fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
            let mut log = self.0.lock();
            if visible {
                log.shown.insert(coord);
            } else {
                log.shown.remove(&coord);
            }
        }

        fn draw_texture(&mut self, _: &Texture) {}
    }

    impl CollisionSink for Recorder {
        fn build_collision_shape(&mut self, coord: ChunkCoord, _: &MeshBuffers) -> CollisionHandle {
            let mut log = self.0.lock();
            log.shapes.push(coord);
            CollisionHandle::from_raw(log.shapes.len() as u64)
        }
    }

    fn small_settings() -> TerrainSettings {
        let mut settings = TerrainSettings::default();
        settings.mesh.chunk_size_index = 0;
        settings.mesh.mesh_scale = 1.0;
        settings.lods = LodTable::new(vec![
            LevelOfDetailSetting::new(0, 20.0, false),
            LevelOfDetailSetting::new(1, 50.0, true),
        ])
        .expect("lods");
        settings
    }

    fn streamer_with_recorder() -> (Streamer, Recorder) {
        let mut streamer = Streamer::new(small_settings()).expect("streamer");
        let recorder = Recorder::default();
        streamer.set_render_sink(Box::new(recorder.clone()));
        streamer.set_collision_sink(Box::new(recorder.clone()));
        (streamer, recorder)
    }

    fn settle(streamer: &mut Streamer, viewpoint: Vec3) {
        for _ in 0..200 {
            streamer.tick(viewpoint);
            if streamer.stats().in_flight == 0 && !streamer.has_dirty_chunks() {
                return;
            }
            streamer.wait_for_work(Duration::from_secs(1));
        }
        panic!("streamer did not settle: {:?}", streamer.stats());
    }

    #[test]
    fn test_first_tick_creates_neighborhood() {
        let mut streamer = Streamer::new(small_settings()).expect("streamer");
        assert_eq!(streamer.settings().chunks_in_view(), 2);
        streamer.tick(Vec3::ZERO);
        let stats = streamer.stats();
        assert_eq!(stats.resident, 25);
        assert_eq!(stats.full_passes, 1);
        assert_eq!(stats.visible, 0);
        assert!(streamer.chunks().all(TerrainChunk::height_requested));
    }

    #[test]
    fn test_viewer_coord_centres_own_tile() {
        let streamer = Streamer::new(small_settings()).expect("streamer");
        let size = streamer.settings().mesh.world_size();
        assert_eq!(streamer.viewer_coord(Vec3::ZERO), ChunkCoord::new(0, 0));
        assert_eq!(
            streamer.viewer_coord(Vec3::new(size * 0.5 + 1.0, 10.0, 0.0)),
            ChunkCoord::new(1, 0)
        );
    }

    #[test]
    fn test_settled_streamer_shows_nearby_chunks() {
        let (mut streamer, recorder) = streamer_with_recorder();
        settle(&mut streamer, Vec3::ZERO);

        let origin = streamer.chunk(ChunkCoord::new(0, 0)).expect("origin chunk");
        assert!(origin.is_visible());
        assert_eq!(origin.displayed_lod(), Some(0));
        assert!(matches!(origin.collision(), CollisionState::Ready(_)));

        let flagged: AHashSet<ChunkCoord> = streamer
            .chunks()
            .filter(|c| c.is_visible())
            .map(TerrainChunk::coord)
            .collect();
        assert_eq!(&flagged, streamer.visible_chunks());

        let log = recorder.0.lock();
        assert_eq!(&log.shown, streamer.visible_chunks());
        assert!(log.draws >= streamer.visible_chunks().len());
        assert_eq!(log.shapes, vec![ChunkCoord::new(0, 0)]);
    }

    #[test]
    fn test_moving_away_hides_without_evicting() {
        let (mut streamer, _recorder) = streamer_with_recorder();
        settle(&mut streamer, Vec3::ZERO);
        let resident = streamer.stats().resident;

        settle(&mut streamer, Vec3::new(400.0, 0.0, 0.0));
        let origin = streamer.chunk(ChunkCoord::new(0, 0)).expect("origin chunk");
        assert!(!origin.is_visible());
        assert!(!streamer.visible_chunks().contains(&ChunkCoord::new(0, 0)));
        assert!(streamer.stats().resident > resident);
    }

    #[test]
    fn test_small_moves_skip_full_pass() {
        let (mut streamer, _recorder) = streamer_with_recorder();
        settle(&mut streamer, Vec3::ZERO);
        let passes = streamer.stats().full_passes;

        streamer.tick(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(streamer.stats().full_passes, passes);

        streamer.tick(Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(streamer.stats().full_passes, passes + 1);
    }

    #[test]
    fn test_settings_change_resets_each_chunk_once() {
        let (mut streamer, _recorder) = streamer_with_recorder();
        settle(&mut streamer, Vec3::ZERO);
        let resident = streamer.stats().resident;

        let mut height = streamer.settings().height.clone();
        height.multiplier = 12.0;
        let sender = streamer.settings_sender();
        sender.send(SettingsChange::HeightMap(height)).expect("send");
        streamer.tick(Vec3::ZERO);

        assert_eq!(streamer.settings().height.multiplier, 12.0);
        assert!(streamer
            .chunks()
            .all(|c| c.generation() == GenerationTag::INITIAL.next()));
        assert_eq!(streamer.stats().in_flight, resident);

        settle(&mut streamer, Vec3::ZERO);
        let origin = streamer.chunk(ChunkCoord::new(0, 0)).expect("origin chunk");
        assert_eq!(origin.displayed_lod(), Some(0));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut streamer = Streamer::new(small_settings()).expect("streamer");
        let mut bad = small_settings();
        bad.height.noise.octaves = 0;
        let err = streamer.apply_settings(bad.clone()).expect_err("invalid");
        assert!(matches!(err, TerrainError::Config(_)));
        assert_eq!(streamer.settings().height.noise.octaves, 4);
        assert!(Streamer::new(bad).is_err());
    }

    #[test]
    fn test_tick_with_reads_viewpoint_once() {
        let mut streamer = Streamer::new(small_settings()).expect("streamer");
        let mut reads = 0;
        let mut source = || {
            reads += 1;
            Vec3::ZERO
        };
        streamer.tick_with(&mut source);
        drop(source);
        assert_eq!(reads, 1);
        assert_eq!(streamer.stats().full_passes, 1);
    }
}
