//! The footprint/shape/stackup data model.
//!
//! Footprints are stored by id in a [`FootprintRegistry`] and
//! referenced by id everywhere, never embedded, so a footprint can be
//! reused recursively without copying.

mod footprint;
mod shape;
mod stackup;

pub use footprint::{Footprint, FootprintRegistry};
pub use shape::{
    BoardOutlineShape, CapsuleShape, CircleShape, FootprintRefShape, LayerAssignment,
    PolygonShape, RoundedRectShape, Shape, ShapeKind, UnionShape,
};
pub use stackup::{CarveSide, LayerKind, StackupLayer};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a [`Footprint`] in the registry.
pub type FootprintId = Uuid;
/// Identifier of a [`Shape`] within its footprint.
pub type ShapeId = Uuid;
/// Identifier of a [`StackupLayer`].
pub type LayerId = Uuid;

/// A 2D point with X and Y coordinates in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given X and Y coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Squared distance to another point.
    pub fn distance_sq(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }
}

/// Rotates a point about a center, angle in degrees.
pub fn rotate_point(p: Point, center: Point, angle_deg: f64) -> Point {
    if angle_deg.abs() < 1e-6 {
        return p;
    }
    let angle_rad = angle_deg.to_radians();
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point {
        x: center.x + dx * cos_a - dy * sin_a,
        y: center.y + dx * sin_a + dy * cos_a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_point_quarter_turn() {
        let p = rotate_point(Point::new(1.0, 0.0), Point::new(0.0, 0.0), 90.0);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.distance_sq(&b), 25.0);
    }
}
