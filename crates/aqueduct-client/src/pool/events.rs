//! Pool lifecycle event notifications
//!
//! Events are a pure side channel: they are fired synchronously at pool
//! transition points and never affect the triggering operation's control
//! flow. Observers are responsible for their own error containment.

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of pool lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEventKind {
    /// A connection's underlying session was established
    Connect,
    /// A connection was handed out to a caller
    Acquire,
    /// A connection is being returned to the pool
    Release,
    /// A connection is being permanently removed from the pool
    Destroy,
    /// A connection is being closed as part of pool teardown
    Close,
}

/// An immutable record of a pool transition
///
/// Carries no mutation authority; observers only get to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolEvent {
    /// What happened
    pub kind: PoolEventKind,
    /// Which pooled connection it happened to
    pub connection_id: Uuid,
}

impl PoolEvent {
    pub(crate) fn new(kind: PoolEventKind, connection_id: Uuid) -> Self {
        Self {
            kind,
            connection_id,
        }
    }
}

/// Observer of pool lifecycle events
///
/// Called synchronously at the transition point, on the task performing
/// the pool operation. Implementations must not block and must contain
/// their own failures; the signature makes the call infallible.
pub trait PoolObserver: Send + Sync {
    /// Handle a pool lifecycle event
    fn on_event(&self, event: &PoolEvent);
}

struct Subscription {
    /// Kinds this observer cares about; None means all of them
    kinds: Option<Vec<PoolEventKind>>,
    observer: Arc<dyn PoolObserver>,
}

/// Publish-only channel for pool lifecycle events
///
/// A no-op broadcast when nothing is subscribed.
#[derive(Default)]
pub struct EventNotifier {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl EventNotifier {
    /// Create a notifier with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an observer to every event kind
    pub fn subscribe(&self, observer: Arc<dyn PoolObserver>) {
        self.subscriptions.write().push(Subscription {
            kinds: None,
            observer,
        });
    }

    /// Subscribe an observer to specific event kinds
    pub fn subscribe_to(&self, kinds: &[PoolEventKind], observer: Arc<dyn PoolObserver>) {
        self.subscriptions.write().push(Subscription {
            kinds: Some(kinds.to_vec()),
            observer,
        });
    }

    /// Emit an event to all interested observers
    ///
    /// Observers run after the subscription lock is dropped, so an
    /// observer may subscribe from within `on_event` without
    /// deadlocking. Such a subscription sees the next event, not the
    /// current one.
    pub(crate) fn emit(&self, kind: PoolEventKind, connection_id: Uuid) {
        let event = PoolEvent::new(kind, connection_id);
        let interested: Vec<Arc<dyn PoolObserver>> = {
            let subscriptions = self.subscriptions.read();
            subscriptions
                .iter()
                .filter(|s| s.kinds.as_ref().is_none_or(|kinds| kinds.contains(&event.kind)))
                .map(|s| s.observer.clone())
                .collect()
        };
        if interested.is_empty() {
            return;
        }
        tracing::debug!(kind = ?event.kind, connection_id = %event.connection_id, "pool event");
        for observer in interested {
            observer.on_event(&event);
        }
    }
}
