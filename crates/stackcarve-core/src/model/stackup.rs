//! Stackup layers: the physical material sheets of the fabricated part.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LayerId;
use crate::expr::Expr;

/// How a layer is fabricated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Profile-cut stock: every assigned shape cuts full thickness.
    Cut,
    /// CNC-carved or printed stock: shapes cut to their assigned depth.
    Carved,
}

/// Which face a partial-depth cut is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarveSide {
    Top,
    Bottom,
}

impl Default for CarveSide {
    fn default() -> Self {
        Self::Top
    }
}

/// One physical layer of the stackup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackupLayer {
    pub id: LayerId,
    /// Ordered position in the stack, bottom-up.
    pub position: u32,
    pub thickness: Expr,
    pub kind: LayerKind,
    #[serde(default)]
    pub carve_side: CarveSide,
    /// Display color, `#rrggbb`.
    pub color: String,
}

impl StackupLayer {
    pub fn new(position: u32, thickness: impl Into<Expr>, kind: LayerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            thickness: thickness.into(),
            kind,
            carve_side: CarveSide::Top,
            color: "#b0b0b0".to_string(),
        }
    }

    pub fn with_carve_side(mut self, side: CarveSide) -> Self {
        self.carve_side = side;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_defaults() {
        let layer = StackupLayer::new(0, 2.0, LayerKind::Carved);
        assert_eq!(layer.carve_side, CarveSide::Top);
        assert_eq!(layer.kind, LayerKind::Carved);
    }

    #[test]
    fn test_layer_serde_round_trip() {
        let layer = StackupLayer::new(1, "t", LayerKind::Cut)
            .with_carve_side(CarveSide::Bottom)
            .with_color("#224488");
        let json = serde_json::to_string(&layer).unwrap();
        let back: StackupLayer = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }
}
