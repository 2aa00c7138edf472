//! Headless run loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::{info, warn};

use meridian_world::{Streamer, StreamerStats};

use crate::config::EngineConfig;
use crate::export;
use crate::headless::{HandoffStats, HeadlessPhysics, HeadlessRenderer, SharedStats};
use crate::path::ViewpointPath;
use crate::timing::TickTiming;

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Streamer statistics after the last tick
    pub streamer: StreamerStats,
    /// What the collaborators received
    pub handoff: HandoffStats,
    /// Whether all outstanding work landed before the settle budget ran out
    pub settled: bool,
}

/// Runs the configured simulation.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    if config.preview.enabled {
        export::export_previews(&config.terrain, &config.preview)
            .context("preview export failed")?;
    }

    let mut streamer =
        Streamer::new(config.terrain.clone()).context("invalid terrain settings")?;
    let handoff = SharedStats::default();
    streamer.set_render_sink(Box::new(HeadlessRenderer::new(Arc::clone(&handoff))));
    streamer.set_collision_sink(Box::new(HeadlessPhysics::new(Arc::clone(&handoff))));

    let sim = &config.simulation;
    let mut path = ViewpointPath::new(sim.start, sim.heading_degrees, sim.speed);
    let mut timing = TickTiming::new(sim.target_fps, sim.realtime);
    info!(
        "Running {} ticks at {} ticks/s from {} (speed {}, heading {})",
        sim.ticks,
        timing.target_fps(),
        sim.start,
        sim.speed,
        sim.heading_degrees
    );

    for tick in 1..=sim.ticks {
        let dt = timing.begin_tick();
        path.advance(dt);
        streamer.tick_with(&mut path);
        timing.end_tick();

        if tick % sim.stats_interval == 0 {
            let stats = streamer.stats();
            info!(
                "tick {tick}: at {} chunk {}, resident {}, visible {}, in flight {}, colliders {}, {:.2} ms avg ({:.2} ms worst)",
                path.position(),
                streamer.viewer_coord(path.position()),
                stats.resident,
                stats.visible,
                stats.in_flight,
                stats.collision_shapes,
                timing.average_tick_ms(),
                timing.worst_tick_ms()
            );
        }
    }

    let settled = settle(&mut streamer, path.position(), sim.settle_ticks);
    let summary = RunSummary {
        streamer: streamer.stats(),
        handoff: handoff.lock().clone(),
        settled,
    };
    if !settled {
        warn!(
            "{} requests still in flight after {} settle ticks",
            summary.streamer.in_flight, sim.settle_ticks
        );
    }
    info!(
        "Finished: {} chunks resident, {} shown, {} full passes, {} meshes drawn ({} triangles), {} collision shapes ({} triangles)",
        summary.streamer.resident,
        summary.handoff.shown.len(),
        summary.streamer.full_passes,
        summary.handoff.meshes_drawn,
        summary.handoff.triangles_drawn,
        summary.handoff.collision_shapes,
        summary.handoff.collision_triangles
    );
    Ok(summary)
}

/// Ticks in place until no work is outstanding or `max_ticks` run out.
fn settle(streamer: &mut Streamer, viewpoint: Vec3, max_ticks: u32) -> bool {
    for _ in 0..max_ticks {
        streamer.tick(viewpoint);
        if streamer.stats().in_flight == 0 && !streamer.has_dirty_chunks() {
            return true;
        }
        streamer.wait_for_work(Duration::from_millis(100));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_world::{LevelOfDetailSetting, LodTable};

    fn quick_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.terrain.mesh.chunk_size_index = 0;
        config.terrain.mesh.mesh_scale = 1.0;
        config.terrain.lods = LodTable::new(vec![
            LevelOfDetailSetting::new(0, 25.0, false),
            LevelOfDetailSetting::new(2, 60.0, true),
        ])
        .expect("lods");
        config.simulation.ticks = 20;
        config.simulation.speed = 120.0;
        config.simulation.start = Vec3::ZERO;
        config.simulation.stats_interval = 10;
        config
    }

    #[test]
    fn test_run_settles_and_hands_off() {
        let summary = run(&quick_config()).expect("run");
        assert!(summary.settled);
        assert_eq!(summary.streamer.in_flight, 0);
        assert!(summary.streamer.visible > 0);
        assert_eq!(summary.handoff.shown.len(), summary.streamer.visible);
        assert!(summary.handoff.meshes_drawn >= summary.streamer.visible);
        assert_eq!(summary.handoff.collision_shapes, summary.streamer.collision_shapes);
    }

    #[test]
    fn test_run_rejects_invalid_terrain() {
        let mut config = quick_config();
        config.terrain.height.noise.frequency = -1.0;
        assert!(run(&config).is_err());
    }
}
