//! # StackCarve Core
//!
//! Core types for modelling multi-layer fabrication footprints:
//! the footprint/shape graph, stackup layers, named parameters, and
//! the arithmetic expression evaluator that resolves dimension
//! strings to millimeters.
//!
//! The solid-construction engine itself lives in `stackcarve-solid`;
//! this crate owns everything it consumes.

pub mod error;
pub mod expr;
pub mod model;
pub mod params;
pub mod units;

pub use error::{CoreError, ExprError, Result};
pub use expr::Expr;
pub use model::{
    CarveSide, Footprint, FootprintId, FootprintRegistry, LayerAssignment, LayerId, LayerKind,
    Point, Shape, ShapeId, ShapeKind, StackupLayer,
};
pub use params::{ParamSet, Parameter};
pub use units::Unit;
