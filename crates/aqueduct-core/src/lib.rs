//! Aqueduct Core - Core abstractions for the database client
//!
//! This crate provides the fundamental traits and types that the other
//! aqueduct crates depend on. It defines:
//!
//! - `Connection` - Trait for database connections
//! - `ConnectionFactory` - Trait for provisioning connections
//! - `ClientConfig` - Client configuration with defaults
//! - Common types like `Value`, `Row`, `QueryResult`, `ExecuteResult`

mod config;
mod connection;
mod error;
mod types;

pub use config::*;
pub use connection::*;
pub use error::*;
pub use types::*;
