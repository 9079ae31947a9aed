//! Connection and factory traits

use crate::{ExecuteResult, QueryResult, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Lifecycle state of a database connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but no session established yet
    Disconnected,
    /// Session established and usable
    Connected,
    /// Torn down, permanently unusable
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// A database connection
///
/// The connection owns its socket and protocol codec. The pool treats it
/// as opaque: it only opens, closes, and delegates statements to it.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Establish the session. Suspends until the handshake completes and
    /// fails with [`Error::Connection`](crate::Error::Connection) on
    /// network or authentication failure.
    async fn connect(&self) -> Result<()>;

    /// Tear down the session. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Current lifecycle state
    fn state(&self) -> ConnectionState;
}

/// Factory trait for provisioning connections
///
/// Supplied at pool construction and invoked exactly `max_size` times by
/// `Pool::connect`, never afterward. The returned connection starts out
/// `Disconnected`; the pool decides when to open it.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new, unopened connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;
}

#[async_trait]
impl<T: ConnectionFactory + ?Sized> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }
}
