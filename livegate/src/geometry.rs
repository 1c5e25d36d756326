//! Affine transforms and tolerant point equality in root drawing coordinates.

use serde::{Deserialize, Serialize};

/// Default L1 distance below which two points are the same location.
///
/// Coordinates pass through several nested transforms before they are
/// compared, so nominally identical endpoints rarely match bit-for-bit.
pub const POINT_TOLERANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// 2-D affine matrix in SVG order:
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees` around the origin (clockwise on screen, as SVG).
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// `self × other`: apply `other` first, then `self`.
    ///
    /// Accumulating from the root down is `parent.multiply(&child)`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Map an absolute point.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Map a displacement (ignores the translation column).
    pub fn apply_vector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.a * dx + self.c * dy, self.b * dx + self.d * dy)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// Point in absolute (root) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn l1_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Same location under [`POINT_TOLERANCE`].
    pub fn coincides(&self, other: &Point) -> bool {
        self.coincides_within(other, POINT_TOLERANCE)
    }

    pub fn coincides_within(&self, other: &Point, tolerance: f64) -> bool {
        self.l1_distance(other) < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(p: Point, x: f64, y: f64) {
        assert!(
            (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9,
            "expected ({x}, {y}), got ({}, {})",
            p.x,
            p.y
        );
    }

    #[test]
    fn identity_leaves_points_alone() {
        let p = Point::new(3.5, -2.0);
        assert_eq!(Matrix::IDENTITY.apply(p), p);
        assert!(Matrix::default().is_identity());
    }

    #[test]
    fn parent_applies_after_child() {
        let parent = Matrix::translate(10.0, 0.0);
        let child = Matrix::scale(2.0, 2.0);
        let m = parent.multiply(&child);
        assert_point(m.apply(Point::new(1.0, 1.0)), 12.0, 2.0);
    }

    #[test]
    fn rotate_quarter_turn() {
        let m = Matrix::rotate(90.0);
        assert_point(m.apply(Point::new(1.0, 0.0)), 0.0, 1.0);
    }

    #[test]
    fn vectors_ignore_translation() {
        let m = Matrix::translate(100.0, 100.0).multiply(&Matrix::scale(3.0, 1.0));
        assert_eq!(m.apply_vector(1.0, 1.0), (3.0, 1.0));
    }

    #[test]
    fn tolerance_boundary() {
        let origin = Point::new(0.0, 0.0);
        assert!(origin.coincides(&Point::new(0.0, 0.0009)));
        assert!(!origin.coincides(&Point::new(0.0, 0.0011)));
        // L1, not Euclidean: 0.0006 + 0.0006 is already too far.
        assert!(!origin.coincides(&Point::new(0.0006, 0.0006)));
    }
}
