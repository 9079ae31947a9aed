//! Connection pool implementation

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use aqueduct_core::{Connection, ConnectionFactory, ConnectionState, Error, Result};
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use super::config::PoolConfig;
use super::events::{EventNotifier, PoolEventKind};
use super::stats::PoolStats;

/// A provisioned slot sitting in the idle collection
struct IdleSlot {
    id: Uuid,
    conn: Arc<dyn Connection>,
}

/// The single piece of pool-wide mutable state.
///
/// Every push, pop, and count adjustment happens under this mutex so the
/// `|idle| + |checked_out| <= max_size` invariant holds at all times.
struct PoolState {
    /// Idle connections; the tail is the most recently released (LIFO)
    idle: Vec<IdleSlot>,
    /// Connections currently checked out by callers
    checked_out: usize,
}

/// Decrements the waiter count even when a pending acquire is cancelled
struct WaitGuard<'a>(&'a AtomicUsize);

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A bounded, reusable pool of database connections
///
/// The pool provisions exactly `max_size` connections on [`connect`],
/// hands them out LIFO on [`acquire`], and takes them back on
/// [`release`] or removes them on [`destroy`]. When the idle collection
/// is empty, `acquire` suspends the calling task until a slot is
/// released; that suspension is the backpressure bounding concurrent
/// database usage to `max_size`.
///
/// [`connect`]: Pool::connect
/// [`acquire`]: Pool::acquire
/// [`release`]: Pool::release
/// [`destroy`]: Pool::destroy
pub struct Pool {
    /// Pool configuration
    config: PoolConfig,
    /// Connection factory, invoked exactly `max_size` times by `connect`
    factory: Arc<dyn ConnectionFactory>,
    /// Lifecycle event side channel
    notifier: Arc<EventNotifier>,
    /// Idle collection and checked-out count
    state: Mutex<PoolState>,
    /// Wakes one waiting acquirer when a slot is released
    slot_released: Notify,
    /// Whether `connect` has run and `close` has not
    connected: AtomicBool,
    /// Callers currently suspended in `acquire`
    waiting: AtomicUsize,
    /// Weak self-reference handed to pooled-connection wrappers
    self_ref: OnceLock<Weak<Pool>>,
}

impl Pool {
    /// Create a new pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Arc<Self> {
        Self::with_notifier(config, factory, Arc::new(EventNotifier::new()))
    }

    /// Create a new pool that publishes lifecycle events to `notifier`
    pub fn with_notifier<F: ConnectionFactory>(
        config: PoolConfig,
        factory: F,
        notifier: Arc<EventNotifier>,
    ) -> Arc<Self> {
        let pool = Arc::new(Self {
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(config.max_size()),
                checked_out: 0,
            }),
            config,
            factory: Arc::new(factory),
            notifier,
            slot_released: Notify::new(),
            connected: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            self_ref: OnceLock::new(),
        });
        let _ = pool.self_ref.set(Arc::downgrade(&pool));
        pool
    }

    /// Provision `max_size` connection slots
    ///
    /// Invokes the factory exactly `max_size` times. With eager
    /// initialization each underlying connection is opened here and a
    /// `Connect` event fires per connection; with lazy initialization the
    /// slots stay `Disconnected` until first acquire.
    ///
    /// Not idempotent: calling this twice doubles the slot count. The
    /// client facade is the state machine guarding against that.
    pub async fn connect(&self) -> Result<()> {
        let lazy = self.config.lazy_initialization();
        let mut slots = Vec::with_capacity(self.config.max_size());

        for _ in 0..self.config.max_size() {
            let conn = match self.factory.create().await {
                Ok(conn) => conn,
                Err(err) => {
                    self.discard_partial(slots).await;
                    return Err(err);
                }
            };
            let id = Uuid::new_v4();
            if !lazy {
                if let Err(err) = conn.connect().await {
                    self.discard_partial(slots).await;
                    return Err(err);
                }
                self.notifier.emit(PoolEventKind::Connect, id);
            }
            slots.push(IdleSlot { id, conn });
        }

        let provisioned = slots.len();
        self.state.lock().idle.extend(slots);
        self.connected.store(true, Ordering::Release);

        tracing::info!(size = provisioned, lazy = lazy, "connection pool provisioned");
        Ok(())
    }

    /// Close connections opened during a provisioning run that failed
    async fn discard_partial(&self, slots: Vec<IdleSlot>) {
        for slot in slots {
            if let Err(err) = slot.conn.close().await {
                tracing::warn!(connection_id = %slot.id, error = %err,
                    "failed to close connection while unwinding provisioning");
            }
        }
    }

    /// Take one connection out of the pool, most recently released first
    ///
    /// Suspends the calling task when the idle collection is empty and
    /// resumes when a slot is released. The pool imposes no timeout;
    /// callers wanting a bounded wait wrap this in their own deadline,
    /// and cancelling the wait consumes no slot.
    ///
    /// Lazily initialized slots are opened on their first acquire. The
    /// `Acquire` event fires after the connection has left the idle
    /// collection, so observers see it under the caller's exclusive
    /// ownership.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        loop {
            if !self.connected.load(Ordering::Acquire) {
                return Err(Error::Connection("pool is not connected".into()));
            }

            // Register interest before checking so a release between the
            // check and the await is not missed.
            let released = self.slot_released.notified();

            let slot = {
                let mut state = self.state.lock();
                let slot = state.idle.pop();
                if slot.is_some() {
                    state.checked_out += 1;
                }
                slot
            };

            match slot {
                Some(slot) => {
                    if slot.conn.state() == ConnectionState::Disconnected {
                        if let Err(err) = slot.conn.connect().await {
                            // The slot stays provisioned; put it back so
                            // capacity is not lost to a transient failure.
                            let mut state = self.state.lock();
                            state.checked_out = state.checked_out.saturating_sub(1);
                            state.idle.push(slot);
                            drop(state);
                            self.slot_released.notify_one();
                            return Err(err);
                        }
                        self.notifier.emit(PoolEventKind::Connect, slot.id);
                    }
                    self.notifier.emit(PoolEventKind::Acquire, slot.id);
                    tracing::debug!(connection_id = %slot.id, "connection acquired");
                    return Ok(PooledConnection::new(slot, self.weak_ref()));
                }
                None => {
                    let _guard = WaitGuard::enter(&self.waiting);
                    released.await;
                }
            }
        }
    }

    /// Return a checked-out connection to the idle collection
    ///
    /// The `Release` event fires before the push attempt. Releasing into
    /// a closed pool closes the connection instead; nothing can acquire
    /// from a dead idle list. Pushing beyond `max_size` means the caller
    /// released a connection it never acquired from this pool, or
    /// released twice: the connection is force-closed and
    /// `PoolExhausted` is returned.
    pub async fn release(&self, client: PooledConnection) -> Result<()> {
        let (id, conn) = client.into_parts();
        self.notifier.emit(PoolEventKind::Release, id);

        let mut state = self.state.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        if !self.connected.load(Ordering::Acquire) {
            drop(state);
            tracing::debug!(connection_id = %id, "release into closed pool, closing connection");
            if let Err(err) = conn.close().await {
                tracing::warn!(connection_id = %id, error = %err,
                    "failed to close connection released into closed pool");
            }
            return Ok(());
        }
        if state.idle.len() >= self.config.max_size() {
            drop(state);
            tracing::warn!(connection_id = %id, "release beyond pool capacity, closing connection");
            if let Err(err) = conn.close().await {
                tracing::warn!(connection_id = %id, error = %err,
                    "failed to close over-released connection");
            }
            return Err(Error::PoolExhausted(format!(
                "connection {} released beyond capacity {}",
                id,
                self.config.max_size()
            )));
        }
        state.idle.push(IdleSlot { id, conn });
        drop(state);

        self.slot_released.notify_one();
        tracing::debug!(connection_id = %id, "connection released");
        Ok(())
    }

    /// Permanently remove a connection from the pool
    ///
    /// The `Destroy` event fires before the underlying close. The slot is
    /// gone for good, shrinking effective capacity by one; used when a
    /// connection is known to be unusable.
    pub async fn destroy(&self, client: PooledConnection) -> Result<()> {
        let (id, conn) = client.into_parts();
        self.notifier.emit(PoolEventKind::Destroy, id);

        {
            let mut state = self.state.lock();
            state.checked_out = state.checked_out.saturating_sub(1);
        }

        tracing::debug!(connection_id = %id, "connection destroyed");
        conn.close().await
    }

    /// Tear down the pool
    ///
    /// Closes every idle connection, emitting a `Close` event before each
    /// close. Connections currently checked out belong to their callers
    /// and are left alone. Close failures are logged and swallowed;
    /// teardown is best-effort. Pending acquirers are woken and fail.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::Release);

        let drained: Vec<IdleSlot> = {
            let mut state = self.state.lock();
            state.idle.drain(..).collect()
        };
        let closed = drained.len();

        for slot in drained {
            self.notifier.emit(PoolEventKind::Close, slot.id);
            if let Err(err) = slot.conn.close().await {
                tracing::warn!(connection_id = %slot.id, error = %err,
                    "failed to close pooled connection during teardown");
            }
        }

        self.slot_released.notify_waiters();
        tracing::info!(closed = closed, "connection pool closed");
    }

    /// Synchronous return path used when a wrapper is dropped without an
    /// explicit release or destroy.
    ///
    /// Emits the `Release` event, then pushes the connection back if it is
    /// still usable and there is room. A connection that cannot be
    /// returned is abandoned with a warning; closing it needs an async
    /// context the drop path does not have.
    fn reclaim(&self, id: Uuid, conn: Arc<dyn Connection>) {
        self.notifier.emit(PoolEventKind::Release, id);

        let mut state = self.state.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        let usable = conn.state() == ConnectionState::Connected
            && self.connected.load(Ordering::Acquire)
            && state.idle.len() < self.config.max_size();
        if usable {
            state.idle.push(IdleSlot { id, conn });
            drop(state);
            self.slot_released.notify_one();
            tracing::debug!(connection_id = %id, "dropped connection reclaimed into pool");
        } else {
            drop(state);
            tracing::warn!(connection_id = %id,
                "dropped connection could not be returned to the pool");
        }
    }

    /// Whether `connect` has run and `close` has not
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the lifecycle event notifier
    pub fn notifier(&self) -> &Arc<EventNotifier> {
        &self.notifier
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let (idle, checked_out) = {
            let state = self.state.lock();
            (state.idle.len(), state.checked_out)
        };
        let waiting = self.waiting.load(Ordering::SeqCst);
        PoolStats::new(idle + checked_out, idle, checked_out, waiting)
    }

    fn weak_ref(&self) -> Weak<Pool> {
        self.self_ref.get().cloned().unwrap_or_else(Weak::new)
    }
}

/// A connection checked out from the pool
///
/// The wrapper holds a non-owning back-reference to its pool purely to
/// route `release` and `destroy`. Callers should release or destroy it
/// explicitly; as a safety net, dropping the wrapper returns the
/// connection to the pool synchronously when that is still possible.
pub struct PooledConnection {
    id: Uuid,
    conn: Option<Arc<dyn Connection>>,
    pool: Weak<Pool>,
}

impl PooledConnection {
    fn new(slot: IdleSlot, pool: Weak<Pool>) -> Self {
        Self {
            id: slot.id,
            conn: Some(slot.conn),
            pool,
        }
    }

    /// Identifier of this pooled connection, stable across checkouts
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the underlying connection as an Arc
    pub fn connection(&self) -> Arc<dyn Connection> {
        self.conn.clone().expect("connection already returned")
    }

    /// Return this connection to its pool
    pub async fn release(self) -> Result<()> {
        match self.pool.upgrade() {
            Some(pool) => pool.release(self).await,
            None => self.close_orphaned().await,
        }
    }

    /// Permanently remove this connection from its pool
    pub async fn destroy(self) -> Result<()> {
        match self.pool.upgrade() {
            Some(pool) => pool.destroy(self).await,
            None => self.close_orphaned().await,
        }
    }

    /// The pool is gone; there is nothing to return to, just close.
    async fn close_orphaned(mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }

    /// Split into parts, disarming the drop reclaim
    fn into_parts(mut self) -> (Uuid, Arc<dyn Connection>) {
        (
            self.id,
            self.conn.take().expect("connection already returned"),
        )
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("returned", &self.conn.is_none())
            .finish()
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("connection already returned")
            .as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Some(pool) = self.pool.upgrade() {
            pool.reclaim(self.id, conn);
        }
    }
}
