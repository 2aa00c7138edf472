//! Scripted viewpoint movement.

use glam::Vec3;

use meridian_world::ViewpointSource;

/// Viewpoint moving along a straight line at constant speed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewpointPath {
    position: Vec3,
    velocity: Vec3,
}

impl ViewpointPath {
    /// Creates a path starting at `start`, heading clockwise from +Z in degrees.
    #[must_use]
    pub fn new(start: Vec3, heading_degrees: f32, speed: f32) -> Self {
        let (sin, cos) = heading_degrees.to_radians().sin_cos();
        Self {
            position: start,
            velocity: Vec3::new(sin, 0.0, cos) * speed,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the viewpoint forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }
}

impl ViewpointSource for ViewpointPath {
    fn viewpoint(&mut self) -> Vec3 {
        self.position
    }
}
