//! Per-actor marker bookkeeping.
//!
//! A marker is the highlight on the shape an actor touched most recently. Each
//! marker carries a token so an expiry timer can tell whether it still owns the
//! marker when it fires. Timers are never cancelled; a superseded one finds its
//! token gone and leaves the newer marker alone.

use std::collections::HashMap;

use crate::shapes::{ActorId, ShapeId};

/// Identifies one highlight, unique for the lifetime of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerToken(u64);

/// An actor's current highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub shape: ShapeId,
    pub token: MarkerToken,
}

/// At most one marker per actor
#[derive(Debug, Default)]
pub struct MarkerBoard {
    markers: HashMap<ActorId, Marker>,
    last_token: u64,
}

impl MarkerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_token(&mut self) -> MarkerToken {
        self.last_token += 1;
        MarkerToken(self.last_token)
    }

    /// Install a marker for `actor`, returning the one it replaces
    pub fn set(&mut self, actor: ActorId, shape: ShapeId, token: MarkerToken) -> Option<Marker> {
        self.markers.insert(actor, Marker { shape, token })
    }

    /// Remove the actor's marker; its timer will find the token stale
    pub fn take(&mut self, actor: ActorId) -> Option<Marker> {
        self.markers.remove(&actor)
    }

    /// Drop markers other actors hold on `shape` (ownership moved to `keep`)
    pub fn release_shape(&mut self, shape: ShapeId, keep: ActorId) -> Vec<ActorId> {
        let released: Vec<ActorId> = self
            .markers
            .iter()
            .filter(|(actor, marker)| **actor != keep && marker.shape == shape)
            .map(|(actor, _)| *actor)
            .collect();
        for actor in &released {
            self.markers.remove(actor);
        }
        released
    }

    /// Called by the expiry timer; true if `token` was still the actor's marker
    pub fn expire(&mut self, actor: ActorId, token: MarkerToken) -> bool {
        match self.markers.get(&actor) {
            Some(marker) if marker.token == token => {
                self.markers.remove(&actor);
                true
            }
            _ => false,
        }
    }

    pub fn marker_of(&self, actor: ActorId) -> Option<ShapeId> {
        self.markers.get(&actor).map(|m| m.shape)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
