//! The Canvas - the only surface the transports talk to.
//!
//! Every mutating operation runs under the registry lock from the ban check
//! through event enqueue, so operations on the same shape are serialised and
//! events enter the drain in the same order the registry changed. The version
//! bump happens right after, as its own atomic step; pollers should treat the
//! version as a change hint rather than a consistent snapshot token.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::broadcast::{BroadcastDrain, Subscription};
use crate::error::CanvasError;
use crate::markers::{MarkerBoard, MarkerToken};
use crate::moderation::ModerationGate;
use crate::protocol::Event;
use crate::registry::ShapeRegistry;
use crate::shapes::{ActorId, CanvasLimits, Shape, ShapeId, ShapeSpec, ShapeStyle};
use crate::snapshots::SnapshotStore;

/// How long a marker stays highlighted unless replaced
pub const DEFAULT_MARKER_DURATION: Duration = Duration::from_millis(3000);

/// Tunables fixed at construction
#[derive(Debug, Clone)]
pub struct CanvasOptions {
    pub marker_duration: Duration,
    pub limits: CanvasLimits,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            marker_duration: DEFAULT_MARKER_DURATION,
            limits: CanvasLimits::default(),
        }
    }
}

/// Point-in-time counters for operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasStats {
    pub version: u64,
    pub shapes: usize,
    pub markers: usize,
    pub subscribers: usize,
    pub banned: usize,
    pub snapshots: usize,
}

/// Shared canvas state (cheap to clone, all clones see the same canvas)
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

struct CanvasInner {
    options: CanvasOptions,
    registry: Mutex<ShapeRegistry>,
    markers: Mutex<MarkerBoard>,
    gate: ModerationGate,
    version: AtomicU64,
    last_actor: AtomicU64,
    drain: BroadcastDrain,
    snapshots: SnapshotStore,
    runtime: Handle,
}

impl Canvas {
    /// Build a canvas whose drain and marker timers run on `runtime`
    pub fn new(options: CanvasOptions, snapshots: SnapshotStore, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CanvasInner {
                options,
                registry: Mutex::new(ShapeRegistry::new()),
                markers: Mutex::new(MarkerBoard::new()),
                gate: ModerationGate::new(),
                version: AtomicU64::new(0),
                last_actor: AtomicU64::new(0),
                drain: BroadcastDrain::new(runtime.clone()),
                snapshots,
                runtime,
            }),
        }
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.inner.options
    }

    // --- Identity & versioning ---

    /// Hand out a fresh actor ID (starting at 1)
    pub fn register_actor(&self) -> ActorId {
        ActorId(self.inner.last_actor.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    fn bump_version(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    // --- Mutations ---

    /// Add a shape. Banned owners and invalid specs are dropped silently (`None`).
    pub fn add(&self, owner: ActorId, spec: ShapeSpec) -> Option<ShapeId> {
        if self.inner.gate.is_banned(owner) {
            debug!(%owner, "add from banned actor dropped");
            return None;
        }
        if let Err(e) = spec.validate(&self.inner.options.limits) {
            debug!(%owner, "add rejected: {e}");
            return None;
        }

        let mut registry = self.lock_registry();
        let shape_id = registry.insert(owner, spec);
        self.highlight(&mut registry, owner, shape_id, Event::Added);
        drop(registry);

        let version = self.bump_version();
        debug!(%owner, %shape_id, version, "shape added");
        Some(shape_id)
    }

    /// Replace a shape's owner and style, keeping its ID and position.
    ///
    /// A banned `new_owner` is dropped silently and reported as `Ok`.
    pub fn edit(
        &self,
        shape_id: ShapeId,
        new_owner: ActorId,
        style: ShapeStyle,
    ) -> Result<(), CanvasError> {
        if self.inner.gate.is_banned(new_owner) {
            debug!(%new_owner, %shape_id, "edit from banned actor dropped");
            return Ok(());
        }
        self.inner.options.limits.check_style(&style)?;

        let mut registry = self.lock_registry();
        let previous_owner = registry
            .edit(shape_id, new_owner, style)
            .ok_or(CanvasError::ShapeNotFound(shape_id))?;
        if previous_owner != new_owner {
            let released = self.lock_markers().release_shape(shape_id, new_owner);
            debug!(
                %shape_id,
                from = %previous_owner,
                to = %new_owner,
                ?released,
                "ownership transferred"
            );
        }
        self.highlight(&mut registry, new_owner, shape_id, Event::Edited);
        drop(registry);

        let version = self.bump_version();
        debug!(%new_owner, %shape_id, version, "shape edited");
        Ok(())
    }

    /// Remove every shape owned by `owner`. Counts as a change even if none matched.
    pub fn remove_by_owner(&self, owner: ActorId) -> bool {
        if self.inner.gate.is_banned(owner) {
            debug!(%owner, "remove from banned actor dropped");
            return false;
        }

        let mut registry = self.lock_registry();
        let removed = registry.remove_by_owner(owner);
        self.inner.drain.enqueue(Event::RemovedFrom(owner).to_string());
        drop(registry);

        let version = self.bump_version();
        debug!(%owner, removed, version, "removed shapes by owner");
        true
    }

    /// Clear the whole canvas; `requester` only matters for the ban check
    pub fn remove_all(&self, requester: ActorId) -> bool {
        if self.inner.gate.is_banned(requester) {
            debug!(%requester, "remove-all from banned actor dropped");
            return false;
        }

        let mut registry = self.lock_registry();
        let removed = registry.clear();
        self.inner.drain.enqueue(Event::RemovedAll.to_string());
        drop(registry);

        let version = self.bump_version();
        info!(%requester, removed, version, "canvas cleared");
        true
    }

    /// Move `actor`'s marker onto `shape_id`, announcing the change in between
    /// the old marker's UNMARK and the new MARK.
    fn highlight(
        &self,
        registry: &mut ShapeRegistry,
        actor: ActorId,
        shape_id: ShapeId,
        announce: fn(Shape) -> Event,
    ) {
        let drain = &self.inner.drain;
        let mut markers = self.lock_markers();

        if let Some(previous) = markers.take(actor) {
            registry.set_highlight(previous.shape, false);
            drain.enqueue(
                Event::Unmark {
                    shape_id: previous.shape,
                    actor,
                }
                .to_string(),
            );
        }

        registry.set_highlight(shape_id, true);
        if let Some(shape) = registry.get(shape_id) {
            drain.enqueue(announce(shape.clone()).to_string());
        }

        let token = markers.next_token();
        markers.set(actor, shape_id, token);
        self.schedule_expiry(actor, shape_id, token);
        drain.enqueue(Event::Mark { shape_id, actor }.to_string());
    }

    /// Every add/edit gets its own timer; none is ever cancelled
    fn schedule_expiry(&self, actor: ActorId, shape_id: ShapeId, token: MarkerToken) {
        let canvas = Arc::downgrade(&self.inner);
        let delay = self.inner.options.marker_duration;
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            expire_marker(canvas, actor, shape_id, token);
        });
    }

    // --- Reads ---

    /// Copy of every live shape, in ID order
    pub fn shapes(&self) -> Vec<Shape> {
        self.lock_registry().to_vec()
    }

    pub fn shape(&self, shape_id: ShapeId) -> Option<Shape> {
        self.lock_registry().get(shape_id).cloned()
    }

    pub fn owner_of(&self, shape_id: ShapeId) -> Option<ActorId> {
        self.lock_registry().get(shape_id).map(|s| s.owner)
    }

    pub fn marker_of(&self, actor: ActorId) -> Option<ShapeId> {
        self.lock_markers().marker_of(actor)
    }

    pub fn stats(&self) -> CanvasStats {
        CanvasStats {
            version: self.version(),
            shapes: self.lock_registry().len(),
            markers: self.lock_markers().len(),
            subscribers: self.inner.drain.subscriber_count(),
            banned: self.inner.gate.banned().len(),
            snapshots: self.inner.snapshots.owner_count(),
        }
    }

    // --- Snapshots ---

    /// Freeze the whole canvas under `owner`, returning the shape count
    pub fn save_snapshot(&self, owner: ActorId) -> usize {
        let registry = self.lock_registry();
        let saved = self.inner.snapshots.save(owner, registry.iter());
        drop(registry);
        debug!(%owner, saved, "snapshot saved");
        saved
    }

    pub fn load_snapshot(&self, owner: ActorId) -> Vec<Shape> {
        self.inner.snapshots.load(owner)
    }

    pub fn erase_snapshots(&self) -> usize {
        let erased = self.inner.snapshots.erase();
        info!(erased, "snapshots erased");
        erased
    }

    /// Persist snapshots to their backing file
    pub fn flush_snapshots(&self) -> anyhow::Result<()> {
        self.inner.snapshots.flush()
    }

    // --- Moderation ---

    pub fn ban(&self, actor: ActorId) -> bool {
        self.inner.gate.ban(actor)
    }

    pub fn unban(&self, actor: ActorId) -> bool {
        self.inner.gate.unban(actor)
    }

    pub fn is_banned(&self, actor: ActorId) -> bool {
        self.inner.gate.is_banned(actor)
    }

    // --- Push subscribers ---

    pub fn subscribe(&self, actor: ActorId) -> Subscription {
        self.inner.drain.subscribe(actor)
    }

    pub fn unsubscribe(&self, actor: ActorId) -> bool {
        self.inner.drain.unsubscribe(actor)
    }

    /// Drop all push subscriptions (shutdown)
    pub fn disconnect_all(&self) -> usize {
        let count = self.inner.drain.disconnect_all();
        info!(count, "disconnected push subscribers");
        count
    }

    /// Lines enqueued but not yet handed to subscribers
    pub fn pending_events(&self) -> usize {
        self.inner.drain.pending()
    }

    // --- Administration ---

    /// Human-readable dump of shapes, bans and snapshots
    pub fn dump_state(&self) -> String {
        let mut out = String::from("Shapes:\n");
        for shape in self.shapes() {
            let _ = writeln!(out, "{}", shape.record());
        }
        out.push_str("Banned Users:\n");
        for actor in self.inner.gate.banned() {
            let _ = writeln!(out, "ID: {actor}");
        }
        out.push_str("Snapshots:\n");
        out.push_str(&self.inner.snapshots.render());
        out
    }

    fn lock_registry(&self) -> MutexGuard<'_, ShapeRegistry> {
        self.inner.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_markers(&self) -> MutexGuard<'_, MarkerBoard> {
        self.inner.markers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Timer body. Always announces UNMARK and bumps the version; the highlight
/// and the marker entry are only cleared while `token` is still current, so a
/// newer marker on the same shape stays lit. The shape may be gone by now.
fn expire_marker(
    canvas: Weak<CanvasInner>,
    actor: ActorId,
    shape_id: ShapeId,
    token: MarkerToken,
) {
    let Some(inner) = canvas.upgrade() else {
        return;
    };
    let canvas = Canvas { inner };

    let mut registry = canvas.lock_registry();
    if canvas.lock_markers().expire(actor, token) {
        if !registry.set_highlight(shape_id, false) {
            debug!(%actor, %shape_id, "marker expired on removed shape");
        }
    } else {
        debug!(%actor, %shape_id, "superseded marker timer fired");
    }
    canvas
        .inner
        .drain
        .enqueue(Event::Unmark { shape_id, actor }.to_string());
    drop(registry);

    let version = canvas.bump_version();
    debug!(%actor, %shape_id, version, "marker expired");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Position, ShapeColor, ShapeType};

    fn canvas() -> Canvas {
        Canvas::new(
            CanvasOptions::default(),
            SnapshotStore::in_memory(),
            Handle::current(),
        )
    }

    /// Marker timers far enough out that real-time tests never see them
    fn canvas_without_expiry() -> Canvas {
        let options = CanvasOptions {
            marker_duration: Duration::from_secs(3600),
            ..Default::default()
        };
        Canvas::new(options, SnapshotStore::in_memory(), Handle::current())
    }

    fn circle(x: i32, y: i32) -> ShapeSpec {
        ShapeSpec::new(
            ShapeStyle::new(ShapeType::Circle, ShapeColor::Black, 50, 50),
            Position::new(x, y),
        )
    }

    async fn next_line(rx: &mut Subscription) -> String {
        rx.recv().await.expect("subscription closed").to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_then_marker_expiry() {
        let canvas = canvas();
        let actor = canvas.register_actor();
        assert_eq!(actor, ActorId(1));
        let mut rx = canvas.subscribe(actor);

        assert_eq!(canvas.add(actor, circle(10, 10)), Some(ShapeId(1)));
        assert_eq!(canvas.version(), 1);
        assert_eq!(next_line(&mut rx).await, "ADDED 1:1:Circle Black 50 50 10 10");
        assert_eq!(next_line(&mut rx).await, "MARK 1:1");
        assert!(canvas.shape(ShapeId(1)).unwrap().highlighted);

        // Paused clock: the runtime auto-advances to the marker timer.
        assert_eq!(next_line(&mut rx).await, "UNMARK 1:1");
        assert_eq!(canvas.version(), 2);
        assert!(!canvas.shape(ShapeId(1)).unwrap().highlighted);
        assert_eq!(canvas.marker_of(actor), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_marker_replaces_pending_one() {
        let canvas = canvas();
        let actor = canvas.register_actor();
        let mut rx = canvas.subscribe(actor);

        canvas.add(actor, circle(10, 10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        canvas.add(actor, circle(20, 20));
        assert_eq!(canvas.version(), 2);

        let expected = [
            "ADDED 1:1:Circle Black 50 50 10 10",
            "MARK 1:1",
            "UNMARK 1:1",
            "ADDED 2:1:Circle Black 50 50 20 20",
            "MARK 2:1",
        ];
        for line in expected {
            assert_eq!(next_line(&mut rx).await, line);
        }

        // The first timer still fires and counts, but leaves the newer marker lit.
        assert_eq!(next_line(&mut rx).await, "UNMARK 1:1");
        assert_eq!(canvas.version(), 3);
        assert!(canvas.shape(ShapeId(2)).unwrap().highlighted);
        assert_eq!(canvas.marker_of(actor), Some(ShapeId(2)));

        assert_eq!(next_line(&mut rx).await, "UNMARK 2:1");
        assert_eq!(canvas.version(), 4);
        assert!(!canvas.shape(ShapeId(2)).unwrap().highlighted);
        assert_eq!(canvas.marker_of(actor), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_add_timer_fires() {
        let canvas = canvas();
        let actor = canvas.register_actor();

        canvas.add(actor, circle(10, 10));
        canvas.add(actor, circle(20, 20));
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Two adds, two expiries.
        assert_eq!(canvas.version(), 4);
        assert!(canvas.shapes().iter().all(|s| !s.highlighted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transferred_marker_timer_keeps_new_highlight() {
        let canvas = canvas();
        let alice = canvas.register_actor();
        let bob = canvas.register_actor();
        let mut rx = canvas.subscribe(alice);

        let id = canvas.add(alice, circle(30, 30)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let style = ShapeStyle::new(ShapeType::Triangle, ShapeColor::Red, 20, 20);
        canvas.edit(id, bob, style).unwrap();

        let expected = [
            "ADDED 1:1:Circle Black 50 50 30 30",
            "MARK 1:1",
            "EDITED 1:2:Triangle Red 20 20 30 30",
            "MARK 1:2",
            "UNMARK 1:1",
        ];
        for line in expected {
            assert_eq!(next_line(&mut rx).await, line);
        }
        assert_eq!(canvas.version(), 3);
        assert!(canvas.shape(id).unwrap().highlighted);
        assert_eq!(canvas.marker_of(bob), Some(id));

        assert_eq!(next_line(&mut rx).await, "UNMARK 1:2");
        assert_eq!(canvas.version(), 4);
        assert!(!canvas.shape(id).unwrap().highlighted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_expiry_on_removed_shape_still_counts() {
        let canvas = canvas();
        let actor = canvas.register_actor();
        let mut rx = canvas.subscribe(actor);

        canvas.add(actor, circle(10, 10));
        assert!(canvas.remove_all(actor));
        assert_eq!(canvas.version(), 2);

        let expected = [
            "ADDED 1:1:Circle Black 50 50 10 10",
            "MARK 1:1",
            "REMOVED_ALL",
            "UNMARK 1:1",
        ];
        for line in expected {
            assert_eq!(next_line(&mut rx).await, line);
        }
        assert_eq!(canvas.version(), 3);
        assert!(canvas.shapes().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_remove_by_owner() {
        let canvas = canvas_without_expiry();
        let actor = canvas.register_actor();
        let id = canvas.add(actor, circle(1, 1)).unwrap();

        assert!(canvas.remove_by_owner(actor));
        assert!(canvas.shape(id).is_none());
        assert_eq!(canvas.version(), 2);
    }

    #[tokio::test]
    async fn test_invalid_add_is_dropped() {
        let canvas = canvas_without_expiry();
        let actor = canvas.register_actor();
        let mut spec = circle(10, 10);
        spec.style.height = 101;

        assert_eq!(canvas.add(actor, spec), None);
        assert_eq!(canvas.add(actor, circle(401, 0)), None);
        assert_eq!(canvas.version(), 0);
        assert_eq!(canvas.pending_events(), 0);
    }

    #[tokio::test]
    async fn test_banned_actor_changes_nothing() {
        let canvas = canvas_without_expiry();
        let watcher = canvas.register_actor();
        let banned = canvas.register_actor();
        let mut rx = canvas.subscribe(watcher);
        let id = canvas.add(watcher, circle(5, 5)).unwrap();
        assert_eq!(next_line(&mut rx).await, "ADDED 1:1:Circle Black 50 50 5 5");
        assert_eq!(next_line(&mut rx).await, "MARK 1:1");

        assert!(canvas.ban(banned));
        assert_eq!(canvas.add(banned, circle(10, 10)), None);
        let style = ShapeStyle::new(ShapeType::Triangle, ShapeColor::Red, 20, 20);
        assert_eq!(canvas.edit(id, banned, style), Ok(()));
        assert!(!canvas.remove_by_owner(banned));
        assert!(!canvas.remove_all(banned));

        assert_eq!(canvas.shapes().len(), 1);
        assert_eq!(canvas.owner_of(id), Some(watcher));
        assert_eq!(canvas.version(), 1);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        canvas.unban(banned);
        assert!(canvas.add(banned, circle(10, 10)).is_some());
        assert_eq!(canvas.version(), 2);
    }

    #[tokio::test]
    async fn test_edit_transfers_ownership_and_marker() {
        let canvas = canvas_without_expiry();
        let alice = canvas.register_actor();
        let bob = canvas.register_actor();
        let id = canvas.add(alice, circle(30, 40)).unwrap();
        assert_eq!(canvas.marker_of(alice), Some(id));

        let style = ShapeStyle::new(ShapeType::Rectangle, ShapeColor::Blue, 60, 70);
        canvas.edit(id, bob, style).unwrap();

        let shape = canvas.shape(id).unwrap();
        assert_eq!(shape.owner, bob);
        assert_eq!(shape.style, style);
        assert_eq!(shape.position, Position::new(30, 40));
        assert!(shape.highlighted);
        assert_eq!(canvas.owner_of(id), Some(bob));
        assert_eq!(canvas.marker_of(alice), None);
        assert_eq!(canvas.marker_of(bob), Some(id));
        assert_eq!(canvas.version(), 2);
    }

    #[tokio::test]
    async fn test_edit_errors() {
        let canvas = canvas_without_expiry();
        let actor = canvas.register_actor();
        let style = ShapeStyle::new(ShapeType::Circle, ShapeColor::Green, 50, 50);
        assert_eq!(
            canvas.edit(ShapeId(42), actor, style),
            Err(CanvasError::ShapeNotFound(ShapeId(42)))
        );

        let id = canvas.add(actor, circle(0, 0)).unwrap();
        let tiny = ShapeStyle::new(ShapeType::Circle, ShapeColor::Green, 5, 50);
        assert!(matches!(canvas.edit(id, actor, tiny), Err(CanvasError::Invalid(_))));
        assert_eq!(canvas.version(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_count_exactly_once() {
        let canvas = canvas_without_expiry();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let canvas = canvas.clone();
                tokio::spawn(async move {
                    let actor = canvas.register_actor();
                    for i in 0..25 {
                        assert!(canvas.add(actor, circle(i, i)).is_some());
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(canvas.version(), 200);
        let ids: Vec<u64> = canvas.shapes().iter().map(|s| s.id.0).collect();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_concurrent_remove_by_owner_counts_each_call() {
        let canvas = canvas_without_expiry();
        let owner = canvas.register_actor();
        let id = canvas.add(owner, circle(1, 2)).unwrap();

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let canvas = canvas.clone();
                tokio::spawn(async move { canvas.remove_by_owner(owner) })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert!(canvas.shape(id).is_none());
        assert_eq!(canvas.version(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_edits_one_winner() {
        let canvas = canvas_without_expiry();
        let creator = canvas.register_actor();
        let id = canvas.add(creator, circle(50, 50)).unwrap();
        let before = canvas.version();

        let red = ShapeStyle::new(ShapeType::Triangle, ShapeColor::Red, 11, 12);
        let blue = ShapeStyle::new(ShapeType::Rectangle, ShapeColor::Blue, 88, 99);
        let editors = [(canvas.register_actor(), red), (canvas.register_actor(), blue)];
        let tasks: Vec<_> = editors
            .iter()
            .map(|&(actor, style)| {
                let canvas = canvas.clone();
                tokio::spawn(async move { canvas.edit(id, actor, style) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let shape = canvas.shape(id).unwrap();
        let winner = editors.iter().find(|(actor, _)| *actor == shape.owner).unwrap();
        assert_eq!(shape.style, winner.1);
        assert_eq!(canvas.marker_of(shape.owner), Some(id));
        assert_eq!(canvas.version(), before + 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_live_changes() {
        let canvas = canvas_without_expiry();
        let actor = canvas.register_actor();
        let id = canvas.add(actor, circle(10, 10)).unwrap();
        let version = canvas.version();

        assert_eq!(canvas.save_snapshot(actor), 1);
        assert_eq!(canvas.version(), version);

        let style = ShapeStyle::new(ShapeType::Triangle, ShapeColor::Green, 10, 10);
        canvas.edit(id, actor, style).unwrap();
        canvas.add(actor, circle(20, 20));

        let snap = canvas.load_snapshot(actor);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].style, circle(10, 10).style);
        assert!(!snap[0].highlighted);
        assert!(canvas.load_snapshot(ActorId(99)).is_empty());
        assert_eq!(canvas.shapes().len(), 2);
    }

    #[tokio::test]
    async fn test_dump_state() {
        let canvas = canvas_without_expiry();
        let actor = canvas.register_actor();
        canvas.add(actor, circle(10, 10));
        canvas.save_snapshot(actor);
        canvas.ban(ActorId(7));

        let dump = canvas.dump_state();
        assert_eq!(
            dump,
            "Shapes:\n1:1:Circle Black 50 50 10 10\n\
             Banned Users:\nID: 7\n\
             Snapshots:\nID 1\n1:1:Circle Black 50 50 10 10\n"
        );

        let stats = canvas.stats();
        assert_eq!(stats.shapes, 1);
        assert_eq!(stats.banned, 1);
        assert_eq!(stats.snapshots, 1);
        assert_eq!(stats.markers, 1);
    }

    #[tokio::test]
    async fn test_disconnect_all() {
        let canvas = canvas_without_expiry();
        let mut rx = canvas.subscribe(canvas.register_actor());
        assert_eq!(canvas.disconnect_all(), 1);
        assert!(rx.recv().await.is_none());
        assert_eq!(canvas.stats().subscribers, 0);
    }
}
