//! Shape variants and per-layer assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{FootprintId, LayerId, Point, ShapeId};
use crate::expr::Expr;

/// Depth/tool assignment of a shape on one stackup layer.
///
/// Absent entry means the shape is not present on that layer. The
/// depth is clamped into `[0, layer_thickness]` before use; a missing
/// endmill radius means a flat-bottomed (square) cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerAssignment {
    pub depth: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endmill_radius: Option<Expr>,
}

impl LayerAssignment {
    pub fn new(depth: impl Into<Expr>) -> Self {
        Self {
            depth: depth.into(),
            endmill_radius: None,
        }
    }

    pub fn with_endmill_radius(mut self, radius: impl Into<Expr>) -> Self {
        self.endmill_radius = Some(radius.into());
        self
    }
}

/// A circle, dimensioned by diameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleShape {
    pub diameter: Expr,
}

/// A rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundedRectShape {
    pub width: Expr,
    pub height: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<Expr>,
}

/// A stroked polyline with semicircular end caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    /// Spine points, local coordinates.
    pub points: Vec<Point>,
    pub thickness: Expr,
}

/// A closed polygon, local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    pub points: Vec<Point>,
}

/// A placement of another footprint, resolved through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRefShape {
    pub target: FootprintId,
}

/// A group of child shapes sharing this shape's placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionShape {
    pub children: Vec<Shape>,
}

/// The board's outline polygon authored as a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardOutlineShape {
    pub points: Vec<Point>,
}

/// The polymorphic shape payload.
///
/// Exhaustively matched at every consumption site (flattening,
/// contouring, tool building) so a new variant fails to compile until
/// every site handles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    Circle(CircleShape),
    RoundedRect(RoundedRectShape),
    Capsule(CapsuleShape),
    Polygon(PolygonShape),
    FootprintRef(FootprintRefShape),
    /// Virtual routing aid; never physically realized.
    WireGuide,
    Union(UnionShape),
    BoardOutline(BoardOutlineShape),
}

/// One authored shape instance inside a footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub name: String,
    /// Local X position expression.
    pub x: Expr,
    /// Local Y position expression.
    pub y: Expr,
    /// Local rotation expression in degrees; meaningful for rects and
    /// footprint references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<Expr>,
    pub kind: ShapeKind,
    #[serde(default)]
    pub assigned_layers: BTreeMap<LayerId, LayerAssignment>,
}

impl Shape {
    pub fn new(name: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            x: Expr::number(0.0),
            y: Expr::number(0.0),
            angle: None,
            kind,
            assigned_layers: BTreeMap::new(),
        }
    }

    pub fn at(mut self, x: impl Into<Expr>, y: impl Into<Expr>) -> Self {
        self.x = x.into();
        self.y = y.into();
        self
    }

    pub fn rotated(mut self, angle: impl Into<Expr>) -> Self {
        self.angle = Some(angle.into());
        self
    }

    pub fn assign_layer(mut self, layer: LayerId, assignment: LayerAssignment) -> Self {
        self.assigned_layers.insert(layer, assignment);
        self
    }

    /// Assignment for a layer, if the shape participates in it.
    pub fn assignment(&self, layer: &LayerId) -> Option<&LayerAssignment> {
        self.assigned_layers.get(layer)
    }

    pub fn circle(name: impl Into<String>, diameter: impl Into<Expr>) -> Self {
        Self::new(
            name,
            ShapeKind::Circle(CircleShape {
                diameter: diameter.into(),
            }),
        )
    }

    pub fn rounded_rect(
        name: impl Into<String>,
        width: impl Into<Expr>,
        height: impl Into<Expr>,
        corner_radius: Option<Expr>,
    ) -> Self {
        Self::new(
            name,
            ShapeKind::RoundedRect(RoundedRectShape {
                width: width.into(),
                height: height.into(),
                corner_radius,
            }),
        )
    }

    pub fn capsule(
        name: impl Into<String>,
        points: Vec<Point>,
        thickness: impl Into<Expr>,
    ) -> Self {
        Self::new(
            name,
            ShapeKind::Capsule(CapsuleShape {
                points,
                thickness: thickness.into(),
            }),
        )
    }

    pub fn footprint_ref(name: impl Into<String>, target: FootprintId) -> Self {
        Self::new(name, ShapeKind::FootprintRef(FootprintRefShape { target }))
    }

    pub fn wire_guide(name: impl Into<String>) -> Self {
        Self::new(name, ShapeKind::WireGuide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_lookup() {
        let layer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let shape = Shape::circle("hole", 4.0).assign_layer(layer, LayerAssignment::new(1.5));

        assert!(shape.assignment(&layer).is_some());
        assert!(shape.assignment(&other).is_none());
    }

    #[test]
    fn test_shape_serde_round_trip() {
        let shape = Shape::rounded_rect("pocket", "w", "h", Some(Expr::new("r")))
            .at(10.0, 20.0)
            .rotated(45.0);
        let json = serde_json::to_string(&shape).unwrap();
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(shape, back);
    }
}
