//! Shape flattening: recursive footprint expansion into world-space
//! instances.
//!
//! Flattening resolves every dimension expression, composes 2D
//! transforms down the reference tree, and emits one [`FlatShape`]
//! per physical shape. It is a pure function of its inputs: no
//! mutation, identical output for identical input.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use stackcarve_core::expr::Expr;
use stackcarve_core::model::{
    rotate_point, Footprint, FootprintId, FootprintRegistry, LayerAssignment, LayerId, Point,
    Shape, ShapeId, ShapeKind,
};
use stackcarve_core::params::ParamSet;

/// Hard recursion cap; guards against reference cycles that escaped
/// edit-time validation.
pub const MAX_FLATTEN_DEPTH: usize = 10;

/// A 2D rotation-then-translate transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
}

impl Transform2D {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation_deg: 0.0,
        }
    }

    /// Maps a local point into this transform's frame.
    pub fn apply(&self, p: Point) -> Point {
        let rotated = rotate_point(p, Point::new(0.0, 0.0), self.rotation_deg);
        Point::new(rotated.x + self.x, rotated.y + self.y)
    }

    /// Composes a child placement (local x/y/angle) under this
    /// transform.
    pub fn compose(&self, x: f64, y: f64, angle_deg: f64) -> Self {
        let origin = self.apply(Point::new(x, y));
        Self {
            x: origin.x,
            y: origin.y,
            rotation_deg: self.rotation_deg + angle_deg,
        }
    }
}

/// World-space, fully numeric geometry of one flattened shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatGeometry {
    Circle {
        center: Point,
        diameter: f64,
    },
    RoundedRect {
        center: Point,
        width: f64,
        height: f64,
        corner_radius: f64,
        rotation_deg: f64,
    },
    Capsule {
        /// World-space spine points.
        spine: Vec<Point>,
        thickness: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    BoardOutline {
        points: Vec<Point>,
    },
}

/// One physical shape instance with resolved world placement.
///
/// Produced fresh on every flatten; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatShape {
    /// The originating shape id.
    pub shape_id: ShapeId,
    /// The footprint the shape was authored in (its evaluation
    /// context).
    pub footprint_id: FootprintId,
    pub world: Transform2D,
    pub geometry: FlatGeometry,
    pub assigned_layers: BTreeMap<LayerId, LayerAssignment>,
}

impl FlatShape {
    /// Assignment for a layer, if the shape participates in it.
    pub fn assignment(&self, layer: &LayerId) -> Option<&LayerAssignment> {
        self.assigned_layers.get(layer)
    }
}

/// Flattens a footprint's shape list from the identity transform.
pub fn flatten_footprint(
    footprint: &Footprint,
    registry: &FootprintRegistry,
    params: &ParamSet,
) -> Vec<FlatShape> {
    flatten(
        footprint,
        &footprint.shapes,
        registry,
        params,
        Transform2D::identity(),
        0,
    )
}

/// Recursively expands `shapes` under `transform`.
///
/// Wire-guides are skipped, dangling footprint references dropped,
/// and branches beyond [`MAX_FLATTEN_DEPTH`] return empty rather than
/// erroring.
pub fn flatten(
    context: &Footprint,
    shapes: &[Shape],
    registry: &FootprintRegistry,
    params: &ParamSet,
    transform: Transform2D,
    depth: usize,
) -> Vec<FlatShape> {
    if depth > MAX_FLATTEN_DEPTH {
        warn!(
            footprint = %context.name,
            depth,
            "flatten recursion cap reached; dropping branch"
        );
        return Vec::new();
    }

    let mut flat = Vec::new();
    for shape in shapes {
        let Some(placement) = eval_placement(shape, params) else {
            continue;
        };
        let world = transform.compose(placement.0, placement.1, placement.2);

        match &shape.kind {
            ShapeKind::WireGuide => {}
            ShapeKind::FootprintRef(reference) => match registry.get(&reference.target) {
                Some(target) => {
                    flat.extend(flatten(
                        target,
                        &target.shapes,
                        registry,
                        params,
                        world,
                        depth + 1,
                    ));
                }
                None => {
                    // Dangling references are an edit-time concern,
                    // not a build failure.
                    debug!(shape = %shape.name, "dropping dangling footprint reference");
                }
            },
            ShapeKind::Union(group) => {
                flat.extend(flatten(
                    context,
                    &group.children,
                    registry,
                    params,
                    world,
                    depth,
                ));
            }
            _ => {
                if let Some(geometry) = resolve_geometry(shape, world, params) {
                    flat.push(FlatShape {
                        shape_id: shape.id,
                        footprint_id: context.id,
                        world,
                        geometry,
                        assigned_layers: shape.assigned_layers.clone(),
                    });
                }
            }
        }
    }
    flat
}

fn eval_placement(shape: &Shape, params: &ParamSet) -> Option<(f64, f64, f64)> {
    let x = eval_or_skip(&shape.x, shape, params)?;
    let y = eval_or_skip(&shape.y, shape, params)?;
    let angle = match &shape.angle {
        Some(expr) => eval_or_skip(expr, shape, params)?,
        None => 0.0,
    };
    Some((x, y, angle))
}

fn eval_or_skip(expr: &Expr, shape: &Shape, params: &ParamSet) -> Option<f64> {
    match expr.eval(params) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(shape = %shape.name, %expr, %err, "skipping shape with failing expression");
            None
        }
    }
}

fn resolve_geometry(shape: &Shape, world: Transform2D, params: &ParamSet) -> Option<FlatGeometry> {
    let center = Point::new(world.x, world.y);
    match &shape.kind {
        ShapeKind::Circle(circle) => Some(FlatGeometry::Circle {
            center,
            diameter: eval_or_skip(&circle.diameter, shape, params)?,
        }),
        ShapeKind::RoundedRect(rect) => Some(FlatGeometry::RoundedRect {
            center,
            width: eval_or_skip(&rect.width, shape, params)?,
            height: eval_or_skip(&rect.height, shape, params)?,
            corner_radius: match &rect.corner_radius {
                Some(expr) => eval_or_skip(expr, shape, params)?,
                None => 0.0,
            },
            rotation_deg: world.rotation_deg,
        }),
        ShapeKind::Capsule(capsule) => Some(FlatGeometry::Capsule {
            spine: capsule.points.iter().map(|p| world.apply(*p)).collect(),
            thickness: eval_or_skip(&capsule.thickness, shape, params)?,
        }),
        ShapeKind::Polygon(polygon) => Some(FlatGeometry::Polygon {
            points: polygon.points.iter().map(|p| world.apply(*p)).collect(),
        }),
        ShapeKind::BoardOutline(outline) => Some(FlatGeometry::BoardOutline {
            points: outline.points.iter().map(|p| world.apply(*p)).collect(),
        }),
        // Handled by the caller before geometry resolution.
        ShapeKind::FootprintRef(_) | ShapeKind::WireGuide | ShapeKind::Union(_) => None,
    }
}
