//! Tick timing.
//!
//! Provides the per-tick time step for the viewpoint path, optional
//! wall-clock pacing, and averaged tick cost for the statistics log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tick timing manager.
#[derive(Debug)]
pub struct TickTiming {
    /// Target ticks per second
    target_fps: u32,
    /// Time budget per tick
    tick_budget: Duration,
    /// Start of the current tick
    tick_start: Instant,
    /// Pace ticks in wall-clock time
    realtime: bool,
    /// Maximum time step, guards against long stalls
    max_dt: f32,
    /// Recent tick costs in seconds
    tick_costs: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for TickTiming {
    fn default() -> Self {
        Self::new(60, false)
    }
}

impl TickTiming {
    /// Create a new tick timer.
    ///
    /// # Arguments
    /// * `target_fps` - Ticks per simulated second
    /// * `realtime` - Sleep out the remainder of each tick's budget
    #[must_use]
    pub fn new(target_fps: u32, realtime: bool) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            tick_start: Instant::now(),
            realtime,
            max_dt: 0.25,
            tick_costs: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Marks the start of a tick and returns its time step in seconds.
    ///
    /// Flat-out runs use the fixed budget; realtime runs use the measured
    /// interval, clamped to `max_dt`.
    pub fn begin_tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = (now - self.tick_start).as_secs_f32();
        self.tick_start = now;
        if self.realtime {
            elapsed.min(self.max_dt)
        } else {
            self.fixed_dt()
        }
    }

    /// Records how long the tick's work took and, in realtime mode, sleeps
    /// for the rest of the budget.
    pub fn end_tick(&mut self) {
        let cost = self.tick_start.elapsed();
        self.tick_costs.push_back(cost.as_secs_f32());
        if self.tick_costs.len() > self.max_samples {
            self.tick_costs.pop_front();
        }

        if self.realtime && cost < self.tick_budget {
            std::thread::sleep(self.tick_budget - cost);
        }
    }

    /// Fixed time step for one tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.target_fps as f32
    }

    /// Average tick cost in milliseconds.
    #[must_use]
    pub fn average_tick_ms(&self) -> f32 {
        if self.tick_costs.is_empty() {
            return 0.0;
        }

        (self.tick_costs.iter().sum::<f32>() / self.tick_costs.len() as f32) * 1000.0
    }

    /// Slowest recorded tick in milliseconds.
    #[must_use]
    pub fn worst_tick_ms(&self) -> f32 {
        self.tick_costs.iter().copied().fold(0.0, f32::max) * 1000.0
    }

    /// Get the target tick rate.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_timing_creation() {
        let timing = TickTiming::new(60, false);
        assert_eq!(timing.target_fps(), 60);
        assert!((timing.fixed_dt() - 1.0 / 60.0).abs() < 0.001);
        assert_eq!(TickTiming::new(0, false).target_fps(), 1);
    }

    #[test]
    fn test_flat_out_uses_fixed_step() {
        let mut timing = TickTiming::new(50, false);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(timing.begin_tick(), 0.02);
    }

    #[test]
    fn test_realtime_step_is_measured_and_clamped() {
        let mut timing = TickTiming::new(60, true);
        std::thread::sleep(Duration::from_millis(16));
        let dt = timing.begin_tick();
        assert!(dt >= 0.015);
        assert!(dt < 0.25);

        std::thread::sleep(Duration::from_millis(300));
        assert!(timing.begin_tick() <= timing.max_dt);
    }

    #[test]
    fn test_realtime_end_tick_fills_budget() {
        let mut timing = TickTiming::new(100, true);
        timing.begin_tick();
        let start = Instant::now();
        timing.end_tick();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_tick_costs_are_averaged() {
        let mut timing = TickTiming::new(60, false);
        for _ in 0..3 {
            timing.begin_tick();
            timing.end_tick();
        }
        assert_eq!(timing.tick_costs.len(), 3);
        assert!(timing.average_tick_ms() >= 0.0);
        assert!(timing.worst_tick_ms() >= timing.average_tick_ms());
    }
}
