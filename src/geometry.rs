//! 2D vector primitives and segment intersection.
//!
//! All geometry in this crate runs in a local metric plane (meters), never in
//! angular degrees. The one non-trivial primitive is [`segment_intersection`]:
//! it is shared by lap splitting and sector-point injection, so every crossing
//! decision in the pipeline goes through the same math.

use serde::{Deserialize, Serialize};

/// Determinant magnitude below which two segments are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Slack allowed at the ends of the `[0, 1]` parameter range.
///
/// Crossings frequently land exactly on a sample, which puts the intersection
/// parameter at 0.0 or 1.0 up to floating-point rounding. Without the slack
/// those legitimate crossings would be rejected.
const RANGE_EPSILON: f64 = 1e-9;

/// A 2D vector in the local metric plane (meters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Return this vector scaled to unit length.
    ///
    /// A zero vector normalizes to the zero vector. Callers must tolerate a
    /// degenerate zero direction (stationary samples produce one).
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            return Vec2::default();
        }
        Vec2::new(self.x / len, self.y / len)
    }

    /// 90° counterclockwise rotation: `(-y, x)`.
    ///
    /// Turns a travel direction into the direction of a detection line.
    pub fn perpendicular(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn scaled(&self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn add(&self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    /// 2D cross product (z component of the 3D cross product).
    fn cross(&self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

/// Intersection of two finite 2D segments `p1→p2` and `q1→q2`.
///
/// Returns the interpolation parameter `t ∈ [0, 1]` along `p1→p2` at the
/// intersection point, or `None` when the segments are parallel or the
/// intersection falls outside either segment.
///
/// Standard Cramer's-rule line-segment intersection: with `r = p2 - p1` and
/// `s = q2 - q1`, solve `p1 + t·r = q1 + u·s` and require both `t` and `u`
/// inside `[0, 1]`.
///
/// # Example
/// ```
/// use laptrace::geometry::{segment_intersection, Vec2};
///
/// let t = segment_intersection(
///     Vec2::new(0.0, 0.0),
///     Vec2::new(10.0, 0.0),
///     Vec2::new(4.0, -5.0),
///     Vec2::new(4.0, 5.0),
/// );
/// assert_eq!(t, Some(0.4));
/// ```
pub fn segment_intersection(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Option<f64> {
    let r = p2.sub(p1);
    let s = q2.sub(q1);

    let denom = r.cross(s);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let qp = q1.sub(p1);
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;

    let in_range = |v: f64| v >= -RANGE_EPSILON && v <= 1.0 + RANGE_EPSILON;
    if !in_range(t) || !in_range(u) {
        return None;
    }

    Some(t.clamp(0.0, 1.0))
}
