//! Shape registry - the single source of truth for live shapes.
//!
//! The registry itself is not synchronised; `Canvas` owns it behind a mutex so
//! each mutating operation is atomic end-to-end.

use std::collections::BTreeMap;

use crate::shapes::{ActorId, Shape, ShapeId, ShapeSpec, ShapeStyle};

/// Live shapes keyed by ID, plus the ID generator
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: BTreeMap<ShapeId, Shape>,
    /// Last ID handed out; IDs start at 1 and are never reused
    last_id: u64,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID and insert a new shape
    pub fn insert(&mut self, owner: ActorId, spec: ShapeSpec) -> ShapeId {
        self.last_id += 1;
        let id = ShapeId(self.last_id);
        self.shapes.insert(id, Shape::new(id, owner, spec));
        id
    }

    /// Replace owner and style in place, keeping ID and position
    ///
    /// Returns the previous owner, or `None` if the shape does not exist.
    pub fn edit(&mut self, id: ShapeId, new_owner: ActorId, style: ShapeStyle) -> Option<ActorId> {
        let shape = self.shapes.get_mut(&id)?;
        let previous = std::mem::replace(&mut shape.owner, new_owner);
        shape.style = style;
        Some(previous)
    }

    /// Set or clear the highlight flag; false if the shape is gone
    pub fn set_highlight(&mut self, id: ShapeId, on: bool) -> bool {
        match self.shapes.get_mut(&id) {
            Some(shape) => {
                shape.highlighted = on;
                true
            }
            None => false,
        }
    }

    /// Remove every shape owned by `owner`, returning how many went
    pub fn remove_by_owner(&mut self, owner: ActorId) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(|_, shape| shape.owner != owner);
        before - self.shapes.len()
    }

    /// Remove everything, returning how many shapes went
    pub fn clear(&mut self) -> usize {
        let removed = self.shapes.len();
        self.shapes.clear();
        removed
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Shapes in ID order
    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Independent copy of every record, in ID order
    pub fn to_vec(&self) -> Vec<Shape> {
        self.shapes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
