//! Client facade over the pool and transaction manager

use std::future::Future;
use std::sync::Arc;

use aqueduct_core::{
    ClientConfig, Connection, ConnectionFactory, ConnectionState, Error, ExecuteResult,
    QueryResult, Result, Value,
};
use parking_lot::RwLock;

use crate::pool::{
    EventNotifier, Pool, PoolConfig, PoolEventKind, PoolObserver, PoolStats, PooledConnection,
};
use crate::transaction::TransactionManager;

/// Application-facing database client
///
/// Holds the defaulted configuration and exactly one pool, created on
/// `connect`. Queries and statements borrow a connection, run, and hand
/// it back; transactions go through the [`TransactionManager`].
pub struct Client {
    config: ClientConfig,
    factory: Arc<dyn ConnectionFactory>,
    notifier: Arc<EventNotifier>,
    pool: RwLock<Option<Arc<Pool>>>,
}

impl Client {
    /// Create a client with the given configuration and connection factory
    ///
    /// The factory is how the wire-protocol layer plugs in; the client
    /// never looks inside the connections it provisions.
    pub fn new<F: ConnectionFactory>(config: ClientConfig, factory: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory: Arc::new(factory),
            notifier: Arc::new(EventNotifier::new()),
            pool: RwLock::new(None),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe an observer to every pool lifecycle event
    ///
    /// Usable before `connect`; the notifier outlives any one pool.
    pub fn subscribe(&self, observer: Arc<dyn PoolObserver>) {
        self.notifier.subscribe(observer);
    }

    /// Subscribe an observer to specific pool event kinds
    pub fn subscribe_to(&self, kinds: &[PoolEventKind], observer: Arc<dyn PoolObserver>) {
        self.notifier.subscribe_to(kinds, observer);
    }

    /// Create the pool and provision its connections
    ///
    /// Fails with a configuration error when already connected; the
    /// facade is the state machine that makes double-connect impossible.
    #[tracing::instrument(skip(self), fields(host = %self.config.host, pool_size = self.config.pool_size))]
    pub async fn connect(&self) -> Result<()> {
        if self.pool.read().is_some() {
            return Err(Error::Configuration("client is already connected".into()));
        }

        tracing::info!("connecting client");
        let pool = Pool::with_notifier(
            PoolConfig::from(&self.config),
            self.factory.clone(),
            self.notifier.clone(),
        );
        pool.connect().await?;

        let mut slot = self.pool.write();
        if slot.is_some() {
            // Lost a connect race; tear the extra pool down quietly.
            drop(slot);
            pool.close().await;
            return Err(Error::Configuration("client is already connected".into()));
        }
        *slot = Some(pool);
        Ok(())
    }

    /// Run a query that returns rows on a pooled connection
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let client = self.pool()?.acquire().await?;
        let result = client.query(sql, params).await;
        self.checkin(client).await;
        result
    }

    /// Run a statement that modifies data on a pooled connection
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
        let client = self.pool()?.acquire().await?;
        let result = client.execute(sql, params).await;
        self.checkin(client).await;
        result
    }

    /// Run a unit of work inside a transaction
    pub async fn transaction<T, F, Fut>(&self, processor: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        TransactionManager::new(self.pool()?).run(processor).await
    }

    /// Get statistics for the current pool, if connected
    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.read().as_ref().map(|pool| pool.stats())
    }

    /// Whether the client currently has a pool
    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    /// Tear down the pool
    ///
    /// Never raises; teardown failures are logged by the pool. After
    /// this, operations fail with `Unconnected` until `connect` is
    /// called again. Closing an unconnected client is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) {
        let pool = self.pool.write().take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!("client closed");
        }
    }

    fn pool(&self) -> Result<Arc<Pool>> {
        self.pool.read().clone().ok_or(Error::Unconnected)
    }

    /// Shared cleanup for non-transactional borrows: back into the pool
    /// while usable, removed from it once closed.
    async fn checkin(&self, client: PooledConnection) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolEvent;
    use crate::pool::tests::{MockConnectionFactory, SharedLog};
    use parking_lot::Mutex;

    struct KindCounter {
        kinds: Mutex<Vec<PoolEventKind>>,
    }

    impl KindCounter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                kinds: Mutex::new(Vec::new()),
            })
        }

        fn kinds(&self) -> Vec<PoolEventKind> {
            self.kinds.lock().clone()
        }
    }

    impl PoolObserver for KindCounter {
        fn on_event(&self, event: &PoolEvent) {
            self.kinds.lock().push(event.kind);
        }
    }

    fn client_with_log(log: &SharedLog, pool_size: usize) -> Client {
        Client::new(
            ClientConfig::default().with_pool_size(pool_size),
            MockConnectionFactory::with_log(log.clone()),
        )
        .expect("valid config")
    }

    #[tokio::test]
    async fn test_query_before_connect_is_unconnected() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);

        let err = client.query("SELECT 1", &[]).await.expect_err("no pool");
        assert!(matches!(err, Error::Unconnected));
        let err = client.execute("DELETE FROM t", &[]).await.expect_err("no pool");
        assert!(matches!(err, Error::Unconnected));
    }

    #[tokio::test]
    async fn test_query_and_execute_roundtrip() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 2);
        client.connect().await.expect("connect");

        client.query("SELECT * FROM t", &[]).await.expect("query");
        client
            .execute("INSERT INTO t VALUES (?)", &[Value::Int64(1)])
            .await
            .expect("execute");

        assert_eq!(
            log.statements(),
            vec!["SELECT * FROM t", "INSERT INTO t VALUES (?)"]
        );
        // Connections went back after each call.
        let stats = client.stats().expect("connected");
        assert_eq!(stats.idle(), 2);
        assert_eq!(stats.checked_out(), 0);
    }

    #[tokio::test]
    async fn test_double_connect_is_rejected() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);
        client.connect().await.expect("connect");

        let err = client.connect().await.expect_err("double connect");
        assert!(matches!(err, Error::Configuration(_)));
        // The original pool is untouched.
        assert_eq!(client.stats().expect("connected").total(), 1);
    }

    #[tokio::test]
    async fn test_close_then_reconnect_cycle() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);
        client.connect().await.expect("connect");
        assert!(client.is_connected());

        client.close().await;
        assert!(!client.is_connected());
        let err = client.query("SELECT 1", &[]).await.expect_err("closed");
        assert!(matches!(err, Error::Unconnected));

        // Close of an unconnected client is a no-op.
        client.close().await;

        client.connect().await.expect("reconnect");
        client.query("SELECT 1", &[]).await.expect("query again");
    }

    #[tokio::test]
    async fn test_transaction_through_facade() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);
        client.connect().await.expect("connect");

        let value = client
            .transaction(|conn| async move {
                conn.execute("UPDATE t SET x = 1", &[]).await?;
                Ok("done")
            })
            .await
            .expect("transaction");

        assert_eq!(value, "done");
        assert_eq!(
            log.statements(),
            vec!["BEGIN", "UPDATE t SET x = 1", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn test_failed_statement_releases_live_connection() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);
        client.connect().await.expect("connect");

        // A statement failure leaves the connection connected: released.
        log.fail_statement("SELECT broken");
        let err = client.query("SELECT broken", &[]).await.expect_err("fails");
        assert!(matches!(err, Error::Query(_)));
        assert_eq!(client.stats().expect("connected").idle(), 1);
    }

    #[tokio::test]
    async fn test_observers_survive_reconnect() {
        let log = SharedLog::default();
        let client = client_with_log(&log, 1);
        let observer = KindCounter::new();
        client.subscribe_to(&[PoolEventKind::Connect], observer.clone());

        client.connect().await.expect("connect");
        client.close().await;
        client.connect().await.expect("reconnect");

        // One Connect event per provisioning run.
        assert_eq!(
            observer.kinds(),
            vec![PoolEventKind::Connect, PoolEventKind::Connect]
        );
    }

    #[tokio::test]
    async fn test_client_rejects_invalid_config() {
        let log = SharedLog::default();
        let result = Client::new(
            ClientConfig::default().with_pool_size(0),
            MockConnectionFactory::with_log(log.clone()),
        );
        assert!(result.is_err());
    }
}
