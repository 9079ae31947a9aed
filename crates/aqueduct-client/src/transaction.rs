//! Transaction management around pooled connections
//!
//! Wraps a caller-supplied unit of work in BEGIN/COMMIT/ROLLBACK on a
//! connection borrowed from the pool, and guarantees the connection goes
//! back to the pool on every exit path.

use std::future::Future;
use std::sync::Arc;

use aqueduct_core::{Connection, ConnectionState, Result};

use crate::pool::{Pool, PooledConnection};

/// Runs units of work inside database transactions
///
/// Borrows a connection from the pool, issues `BEGIN`, invokes the
/// processor, and on success issues `COMMIT` and returns the processor's
/// value. On failure the transaction is rolled back when the connection
/// is still usable, and the processor's error is always the one
/// propagated; a rollback failure never masks it.
pub struct TransactionManager {
    pool: Arc<Pool>,
}

impl TransactionManager {
    /// Create a transaction manager over the given pool
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }

    /// Run a unit of work inside a transaction
    ///
    /// The processor receives the borrowed connection and may issue any
    /// number of statements on it. Whatever happens, the connection is
    /// returned to the pool afterward, or removed from it when the
    /// failure closed it.
    pub async fn run<T, F, Fut>(&self, processor: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let client = self.pool.acquire().await?;
        let conn = client.connection();

        if let Err(err) = conn.execute("BEGIN", &[]).await {
            // Nothing started; no rollback to issue.
            Self::checkin(client).await;
            return Err(err);
        }

        match processor(conn.clone()).await {
            Ok(value) => {
                let committed = conn.execute("COMMIT", &[]).await;
                Self::checkin(client).await;
                committed.map(|_| value)
            }
            Err(err) => {
                if conn.state() == ConnectionState::Connected {
                    if let Err(rollback_err) = conn.execute("ROLLBACK", &[]).await {
                        // Best-effort; the processor's error is the one
                        // that propagates.
                        tracing::warn!(error = %rollback_err, "rollback failed");
                    }
                } else {
                    tracing::debug!("connection no longer usable, skipping rollback");
                }
                Self::checkin(client).await;
                Err(err)
            }
        }
    }

    /// Return the connection through the same cleanup path regardless of
    /// transaction outcome: back into the pool while usable, removed from
    /// it once closed.
    async fn checkin(client: PooledConnection) {
        let result = if client.state() == ConnectionState::Closed {
            client.destroy().await
        } else {
            client.release().await
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to check connection back into pool");
        }
    }
}
