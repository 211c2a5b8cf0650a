//! Plain 2D geometry used throughout the document model.
//!
//! Everything here is a small value type: points, axis-aligned rectangles,
//! and the two metric helpers the spatial query engine is built on.

use serde::{Deserialize, Serialize};

/// A point (or displacement) in diagram coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// This point translated by `delta`.
    pub fn translated(&self, delta: Point) -> Point {
        Point::new(self.x + delta.x, self.y + delta.y)
    }

    /// The displacement that carries `self` onto `target`.
    pub fn delta_to(&self, target: Point) -> Point {
        Point::new(target.x - self.x, target.y - self.y)
    }

    /// This point rotated by `angle` radians around `center`.
    pub fn rotated_around(&self, center: Point, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        )
    }

    /// This point scaled by `factor` about `center`.
    pub fn scaled_about(&self, center: Point, factor: f64) -> Point {
        Point::new(
            center.x + (self.x - center.x) * factor,
            center.y + (self.y - center.y) * factor,
        )
    }
}

/// An axis-aligned rectangle with `min.x <= max.x` and `min.y <= max.y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build a normalized rectangle from two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// The degenerate rectangle covering a single point.
    pub fn at_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// The square of half-width `radius` centered on `center`.
    pub fn around(center: Point, radius: f64) -> Self {
        Self {
            min: Point::new(center.x - radius, center.y - radius),
            max: Point::new(center.x + radius, center.y + radius),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Smallest rectangle covering `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn inflated(&self, margin: f64) -> Rect {
        Rect {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Extend the rectangle to cover `p`.
    pub fn expanded_to(&self, p: Point) -> Rect {
        self.union(&Rect::at_point(p))
    }
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
///
/// The segment is deliberately not clamped: hit-testing measures against the
/// whole carrier line. A degenerate line (`a == b`) falls back to the
/// point distance.
pub fn infinite_line_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return p.distance_to(&a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / len
}

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let a = angle.rem_euclid(tau);
    // rem_euclid can land exactly on τ for inputs like -1e-17.
    if a >= tau { 0.0 } else { a }
}
