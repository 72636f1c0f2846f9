//! Footprints and the process-wide footprint registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{FootprintId, Point, Shape};

/// A named, reusable 2D design unit composed of shapes.
///
/// Footprints may place other footprints through
/// [`ShapeKind::FootprintRef`](super::ShapeKind::FootprintRef); the
/// registry breaks that recursion into id lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub id: FootprintId,
    pub name: String,
    /// Authoring order encodes priority: earlier shapes win where
    /// cuts/fills overlap.
    pub shapes: Vec<Shape>,
    /// Outline polygon for standalone boards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<Point>>,
    #[serde(default)]
    pub is_board: bool,
}

impl Footprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            shapes: Vec::new(),
            outline: None,
            is_board: false,
        }
    }

    pub fn board(name: impl Into<String>, outline: Vec<Point>) -> Self {
        let mut fp = Self::new(name);
        fp.outline = Some(outline);
        fp.is_board = true;
        fp
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }
}

/// Owner of every footprint in the process, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FootprintRegistry {
    footprints: HashMap<FootprintId, Footprint>,
}

impl FootprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a footprint, returning its id.
    pub fn insert(&mut self, footprint: Footprint) -> FootprintId {
        let id = footprint.id;
        self.footprints.insert(id, footprint);
        id
    }

    pub fn get(&self, id: &FootprintId) -> Option<&Footprint> {
        self.footprints.get(id)
    }

    pub fn remove(&mut self, id: &FootprintId) -> Option<Footprint> {
        self.footprints.remove(id)
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Footprint> {
        self.footprints.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_insert_and_lookup() {
        let mut registry = FootprintRegistry::new();
        let fp = Footprint::new("connector");
        let id = fp.id;
        registry.insert(fp);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).unwrap().name, "connector");
        assert!(registry.get(&Uuid::new_v4()).is_none());
    }
}
