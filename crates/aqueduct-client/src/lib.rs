//! Aqueduct Client - Connection pooling and transaction management
//!
//! This crate handles the connection lifecycle: the bounded pool, the
//! pooled-connection wrapper, lifecycle event notifications, the
//! transaction manager, and the client facade.

mod client;
pub mod pool;
mod transaction;

pub use client::Client;
pub use pool::{
    EventNotifier, Pool, PoolConfig, PoolEvent, PoolEventKind, PoolObserver, PoolStats,
    PooledConnection,
};
pub use transaction::TransactionManager;
