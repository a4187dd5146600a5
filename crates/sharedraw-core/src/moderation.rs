//! Banned-actor set consulted before every mutation

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::shapes::ActorId;

#[derive(Debug, Default)]
pub struct ModerationGate {
    banned: RwLock<BTreeSet<ActorId>>,
}

impl ModerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the actor was already banned
    pub fn ban(&self, actor: ActorId) -> bool {
        let added = self
            .banned
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor);
        info!(%actor, "banned actor");
        added
    }

    /// Returns false if the actor was not banned
    pub fn unban(&self, actor: ActorId) -> bool {
        let removed = self
            .banned
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor);
        info!(%actor, "unbanned actor");
        removed
    }

    pub fn is_banned(&self, actor: ActorId) -> bool {
        self.banned
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&actor)
    }

    /// Banned actors in ascending order
    pub fn banned(&self) -> Vec<ActorId> {
        self.banned
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }
}
