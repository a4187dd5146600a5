//! Asynchronous fan-out of event lines to push subscribers.
//!
//! Producers append to an unbounded FIFO and return immediately. A single drain
//! task at a time moves lines from the queue into every subscriber's channel, so
//! all subscribers see the same total order. The drain owner is elected with a
//! compare-and-swap on `draining`; after emptying the queue it releases the flag
//! and re-checks, rescheduling itself if a producer slipped in.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::shapes::ActorId;

/// One serialized protocol line, shared between subscribers
pub type EventLine = Arc<str>;

/// Receiving end handed to a push connection
pub type Subscription = mpsc::UnboundedReceiver<EventLine>;

/// Handle to the broadcast drain (cheap to clone)
#[derive(Clone)]
pub struct BroadcastDrain {
    inner: Arc<DrainInner>,
}

impl std::fmt::Debug for BroadcastDrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastDrain")
            .field("subscribers", &self.subscriber_count())
            .field("draining", &self.inner.draining.load(Ordering::Relaxed))
            .finish()
    }
}

struct DrainInner {
    queue: Mutex<VecDeque<EventLine>>,
    draining: AtomicBool,
    subscribers: RwLock<HashMap<ActorId, mpsc::UnboundedSender<EventLine>>>,
    runtime: Handle,
}

impl BroadcastDrain {
    /// Create a drain whose delivery tasks run on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(DrainInner {
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                subscribers: RwLock::new(HashMap::new()),
                runtime,
            }),
        }
    }

    /// Register a push connection; replaces any earlier subscription of the actor
    pub fn subscribe(&self, actor: ActorId) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor, tx);
        debug!(%actor, "subscriber added");
        rx
    }

    /// Safe to race with an in-flight delivery; later lines are simply not sent
    pub fn unsubscribe(&self, actor: ActorId) -> bool {
        let removed = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor)
            .is_some();
        if removed {
            debug!(%actor, "subscriber removed");
        }
        removed
    }

    /// Drop every subscription; connections observe a closed channel
    pub fn disconnect_all(&self) -> usize {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Append a line and make sure a drain is scheduled. Never blocks on I/O.
    pub fn enqueue(&self, line: impl Into<EventLine>) {
        let line = line.into();
        trace!(%line, "enqueue");
        self.inner.lock_queue().push_back(line);
        DrainInner::schedule(&self.inner);
    }

    /// Lines waiting for the drain
    pub fn pending(&self) -> usize {
        self.inner.lock_queue().len()
    }
}

impl DrainInner {
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<EventLine>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a drain unless one is already active
    fn schedule(this: &Arc<Self>) {
        if this
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let inner = Arc::clone(this);
            this.runtime.spawn(async move { DrainInner::drain(&inner) });
        }
    }

    fn drain(this: &Arc<Self>) {
        let mut delivered = 0usize;
        loop {
            let next = this.lock_queue().pop_front();
            let Some(line) = next else { break };
            this.deliver(&line);
            delivered += 1;
        }
        trace!(delivered, "drain pass finished");

        this.draining.store(false, Ordering::Release);
        // A producer may have pushed after our last pop but seen the flag still set.
        if !this.lock_queue().is_empty() {
            Self::schedule(this);
        }
    }

    fn deliver(&self, line: &EventLine) {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        for (actor, tx) in subscribers.iter() {
            if tx.send(Arc::clone(line)).is_err() {
                trace!(%actor, "subscriber already gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(rx: &mut Subscription, n: usize) -> Vec<String> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(rx.recv().await.unwrap().to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_all_subscribers_see_same_order() {
        let drain = BroadcastDrain::new(Handle::current());
        let mut a = drain.subscribe(ActorId(1));
        let mut b = drain.subscribe(ActorId(2));

        for i in 0..50 {
            drain.enqueue(format!("LINE {i}"));
        }

        let expected: Vec<String> = (0..50).map(|i| format!("LINE {i}")).collect();
        assert_eq!(collect(&mut a, 50).await, expected);
        assert_eq!(collect(&mut b, 50).await, expected);
    }

    #[tokio::test]
    async fn test_removed_subscriber_is_ignored() {
        let drain = BroadcastDrain::new(Handle::current());
        let gone = drain.subscribe(ActorId(1));
        let mut stays = drain.subscribe(ActorId(2));
        drop(gone);

        drain.enqueue("REMOVED_ALL");
        assert_eq!(collect(&mut stays, 1).await, vec!["REMOVED_ALL"]);

        assert!(drain.unsubscribe(ActorId(1)));
        assert!(!drain.unsubscribe(ActorId(1)));
        assert_eq!(drain.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_channels() {
        let drain = BroadcastDrain::new(Handle::current());
        let mut rx = drain.subscribe(ActorId(3));
        assert_eq!(drain.disconnect_all(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_lose_nothing() {
        let drain = BroadcastDrain::new(Handle::current());
        let mut rx = drain.subscribe(ActorId(1));

        let producers: Vec<_> = (0..8)
            .map(|p| {
                let drain = drain.clone();
                tokio::spawn(async move {
                    for i in 0..200 {
                        drain.enqueue(format!("{p} {i}"));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        let lines = collect(&mut rx, 8 * 200).await;
        // Per-producer order survives the global interleaving.
        for p in 0..8 {
            let seq: Vec<usize> = lines
                .iter()
                .filter_map(|l| l.split_once(' '))
                .filter(|(who, _)| who.parse::<usize>().unwrap() == p)
                .map(|(_, i)| i.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..200).collect::<Vec<_>>());
        }
        assert_eq!(drain.pending(), 0);
    }
}
