//! Simulated clients for load and demo runs.
//!
//! A ghost registers like any other actor and goes through the same canvas
//! calls, so bans and validation apply to it too.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sharedraw_core::{ActorId, Canvas, Position, ShapeColor, ShapeSpec, ShapeStyle, ShapeType};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What a ghost did on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostAction {
    Add(ShapeSpec),
    RemoveMine,
    RemoveAll,
}

pub struct GhostClient {
    canvas: Canvas,
    actor: ActorId,
    busy: bool,
    rng: StdRng,
}

impl GhostClient {
    /// `activity` above 50 percent means short pauses between actions
    pub fn new(canvas: Canvas, activity: u8) -> Self {
        Self::with_rng(canvas, activity, StdRng::from_entropy())
    }

    pub fn with_rng(canvas: Canvas, activity: u8, rng: StdRng) -> Self {
        let actor = canvas.register_actor();
        Self {
            canvas,
            actor,
            busy: activity > 50,
            rng,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// 3-5 s when busy, 8-10 s otherwise
    pub fn next_delay(&mut self) -> Duration {
        let base = if self.busy { 3 } else { 8 };
        Duration::from_secs(base + self.rng.gen_range(0..=2))
    }

    /// Add 75%, remove own 15%, clear canvas 10%
    pub fn choose_action(&mut self) -> GhostAction {
        match self.rng.gen_range(0..100) {
            0..=74 => GhostAction::Add(self.random_spec()),
            75..=89 => GhostAction::RemoveMine,
            _ => GhostAction::RemoveAll,
        }
    }

    fn random_spec(&mut self) -> ShapeSpec {
        let limits = &self.canvas.options().limits;
        let kind = ShapeType::ALL[self.rng.gen_range(0..ShapeType::ALL.len())];
        let color = ShapeColor::ALL[self.rng.gen_range(0..ShapeColor::ALL.len())];
        let width = self.rng.gen_range(limits.dimensions.clone());
        let height = self.rng.gen_range(limits.dimensions.clone());
        let x = self.rng.gen_range(0..=limits.width);
        let y = self.rng.gen_range(0..=limits.height);
        ShapeSpec::new(ShapeStyle::new(kind, color, width, height), Position::new(x, y))
    }

    /// Pick an action and apply it
    pub fn act(&mut self) -> GhostAction {
        let action = self.choose_action();
        match action {
            GhostAction::Add(spec) => {
                self.canvas.add(self.actor, spec);
            }
            GhostAction::RemoveMine => {
                self.canvas.remove_by_owner(self.actor);
            }
            GhostAction::RemoveAll => {
                self.canvas.remove_all(self.actor);
            }
        }
        debug!(actor = %self.actor, ?action, "ghost acted");
        action
    }

    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let stop = shutdown.notified();
        tokio::pin!(stop);
        loop {
            let delay = self.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.act();
                }
                _ = &mut stop => break,
            }
        }
        debug!(actor = %self.actor, "ghost stopped");
    }
}

/// Start `count` ghosts on the current runtime
pub fn spawn_ghosts(
    canvas: &Canvas,
    count: usize,
    activity: u8,
    shutdown: &Arc<Notify>,
) -> Vec<JoinHandle<()>> {
    if count > 0 {
        info!(count, activity, "starting ghost clients");
    }
    (0..count)
        .map(|_| {
            let ghost = GhostClient::new(canvas.clone(), activity);
            debug!(actor = %ghost.actor(), "ghost registered");
            tokio::spawn(ghost.run(shutdown.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharedraw_core::{CanvasOptions, SnapshotStore};
    use tokio::runtime::Handle;

    fn canvas() -> Canvas {
        let options = CanvasOptions {
            marker_duration: Duration::from_secs(3600),
            ..Default::default()
        };
        Canvas::new(options, SnapshotStore::in_memory(), Handle::current())
    }

    fn ghost(canvas: &Canvas, activity: u8, seed: u64) -> GhostClient {
        GhostClient::with_rng(canvas.clone(), activity, StdRng::seed_from_u64(seed))
    }

    #[tokio::test]
    async fn test_delays_follow_activity() {
        let canvas = canvas();
        let mut busy = ghost(&canvas, 75, 1);
        let mut idle = ghost(&canvas, 50, 2);
        for _ in 0..100 {
            let d = busy.next_delay();
            assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(5), "{d:?}");
            let d = idle.next_delay();
            assert!(d >= Duration::from_secs(8) && d <= Duration::from_secs(10), "{d:?}");
        }
    }

    #[tokio::test]
    async fn test_every_action_is_accepted() {
        let canvas = canvas();
        let mut ghost = ghost(&canvas, 75, 7);
        let mut adds = 0;
        for _ in 0..300 {
            if let GhostAction::Add(spec) = ghost.act() {
                assert!(spec.validate(&canvas.options().limits).is_ok());
                adds += 1;
            }
        }
        // Generated shapes are always valid, so every tick bumps the version.
        assert_eq!(canvas.version(), 300);
        assert!(adds > 150, "adds = {adds}");
    }

    #[tokio::test]
    async fn test_banned_ghost_is_inert() {
        let canvas = canvas();
        let mut ghost = ghost(&canvas, 75, 3);
        canvas.ban(ghost.actor());
        for _ in 0..50 {
            ghost.act();
        }
        assert_eq!(canvas.version(), 0);
        assert!(canvas.shapes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_ghosts_stop_on_shutdown() {
        let canvas = canvas();
        let shutdown = Arc::new(Notify::new());
        let handles = spawn_ghosts(&canvas, 3, 90, &shutdown);
        assert_eq!(handles.len(), 3);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(canvas.version() >= 3);

        shutdown.notify_waiters();
        for handle in handles {
            tokio_test::assert_ok!(handle.await);
        }
    }
}
