//! Piecewise-linear shaping curves.
//!
//! Used to reshape normalized noise before it is multiplied into world height,
//! and to shape the radial falloff mask.

use serde::{Deserialize, Serialize};

use meridian_common::ConfigError;

/// A control point on a [`HeightCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Input value (normalized noise)
    pub x: f32,
    /// Output value
    pub y: f32,
}

impl CurvePoint {
    /// Creates a control point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Monotonic piecewise-linear curve.
///
/// Points are ordered by ascending `x` with non-decreasing `y`. Inputs outside
/// the first/last point clamp to the end values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct HeightCurve {
    points: Vec<CurvePoint>,
}

impl HeightCurve {
    /// Builds a curve, rejecting empty or non-monotonic point lists.
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::EmptyCurve);
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ConfigError::NonMonotonicCurve { index });
        }
        for (index, pair) in points.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            if b.x <= a.x || b.y < a.y {
                return Err(ConfigError::NonMonotonicCurve { index: index + 1 });
            }
        }
        Ok(Self { points })
    }

    /// The identity curve on `[0, 1]`.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
        }
    }

    /// Default terrain shaping: flattens the lowlands into plains and water.
    #[must_use]
    pub fn terrain_default() -> Self {
        Self {
            points: vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(0.35, 0.02),
                CurvePoint::new(0.5, 0.12),
                CurvePoint::new(0.75, 0.5),
                CurvePoint::new(1.0, 1.0),
            ],
        }
    }

    /// Default falloff shaping: no falloff in the middle, steep at the rim.
    #[must_use]
    pub fn falloff_default() -> Self {
        Self {
            points: vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(0.55, 0.02),
                CurvePoint::new(0.8, 0.35),
                CurvePoint::new(1.0, 1.0),
            ],
        }
    }

    /// Returns the control points.
    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluates the curve at `x`.
    #[must_use]
    pub fn sample(&self, x: f32) -> f32 {
        let first = self.points[0];
        if x <= first.x {
            return first.y;
        }
        let last = self.points[self.points.len() - 1];
        if x >= last.x {
            return last.y;
        }
        // First point strictly right of x; guaranteed to exist past the clamps.
        let upper = self.points.partition_point(|p| p.x <= x);
        let (a, b) = (self.points[upper - 1], self.points[upper]);
        let t = (x - a.x) / (b.x - a.x);
        a.y + (b.y - a.y) * t
    }

    /// Lowest output value.
    #[must_use]
    pub fn min_value(&self) -> f32 {
        self.points[0].y
    }

    /// Highest output value.
    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.points[self.points.len() - 1].y
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::terrain_default()
    }
}

impl TryFrom<Vec<CurvePoint>> for HeightCurve {
    type Error = ConfigError;

    fn try_from(points: Vec<CurvePoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<HeightCurve> for Vec<CurvePoint> {
    fn from(curve: HeightCurve) -> Self {
        curve.points
    }
}
