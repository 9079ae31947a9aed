//! Bounded connection pool
//!
//! This module provides the bounded, reusable connection pool with its
//! acquire/release/destroy lifecycle and event notifications.
//!
//! # Example
//!
//! ```ignore
//! use aqueduct_client::pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new(4);
//! let pool = Pool::new(config, factory);
//! pool.connect().await?;
//!
//! let conn = pool.acquire().await?;
//! conn.query("SELECT 1", &[]).await?;
//! conn.release().await?;
//! ```

mod config;
mod events;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use events::{EventNotifier, PoolEvent, PoolEventKind, PoolObserver};
pub use pool::{Pool, PooledConnection};
pub use stats::PoolStats;
