//! Keyed registry of upstream connections.
//!
//! One entry per `"{environment}_{account_id}"` key. Entries are swapped
//! wholesale on failure, never patched in place. Creation is serialized per
//! key: concurrent cold requests for the same key must produce exactly one
//! socket, so each key holds an async creation slot that is locked for the
//! duration of connect+auth. Different keys do not contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::connection::{Connection, ConnectionError};
use crate::domain::{Credentials, Environment, QuoteCache};
use crate::infrastructure::config::{ConnectionSettings, EndpointSettings, PoolSettings};

/// One pooled connection.
struct PoolEntry {
    connection: Arc<Connection>,
    created_at: Instant,
    last_used_at: Instant,
    in_use: bool,
}

/// Stats for one pool entry, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolEntryStats {
    /// Pool key.
    pub key: String,
    /// Connection lifecycle state.
    pub state: &'static str,
    /// Whether an operation currently holds the entry.
    pub in_use: bool,
    /// Seconds since the connection was created.
    pub age_secs: u64,
    /// Seconds since the entry was last used.
    pub idle_secs: u64,
}

/// Pool-wide stats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Number of pooled connections.
    pub connections: usize,
    /// Per-entry detail.
    pub entries: Vec<PoolEntryStats>,
}

/// Connection pool shared by every caller of the bridge.
pub struct ConnectionPool {
    endpoints: EndpointSettings,
    connection_settings: ConnectionSettings,
    settings: PoolSettings,
    entries: Mutex<HashMap<String, PoolEntry>>,
    creation_slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    demo_quotes: Arc<QuoteCache>,
    live_quotes: Arc<QuoteCache>,
}

impl ConnectionPool {
    /// Create an empty pool.
    ///
    /// The quote caches are owned by the bridge and passed in by reference
    /// so they outlive any single connection.
    #[must_use]
    pub fn new(
        endpoints: EndpointSettings,
        connection_settings: ConnectionSettings,
        settings: PoolSettings,
        demo_quotes: Arc<QuoteCache>,
        live_quotes: Arc<QuoteCache>,
    ) -> Self {
        Self {
            endpoints,
            connection_settings,
            settings,
            entries: Mutex::new(HashMap::new()),
            creation_slots: Mutex::new(HashMap::new()),
            demo_quotes,
            live_quotes,
        }
    }

    /// The shared quote cache for an environment.
    #[must_use]
    pub fn quotes(&self, environment: Environment) -> Arc<QuoteCache> {
        match environment {
            Environment::Demo => Arc::clone(&self.demo_quotes),
            Environment::Live => Arc::clone(&self.live_quotes),
        }
    }

    /// Resolve a healthy connection for the credentials, creating one on a
    /// pool miss or after tearing down an unhealthy entry.
    ///
    /// # Errors
    ///
    /// Returns an error when a fresh connection cannot be established or
    /// authenticated.
    pub async fn get(
        &self,
        credentials: &Credentials,
        skip_account_auth: bool,
    ) -> Result<Arc<Connection>, ConnectionError> {
        let key = credentials.pool_key();

        // Serialize connect+auth per key; reuse checks also run under the
        // slot so a waiter picks up the connection the winner just built.
        let slot = self.creation_slot(&key);
        let _guard = slot.lock().await;

        if let Some(connection) = self.try_reuse(&key, !skip_account_auth) {
            return Ok(connection);
        }

        let (host, port) = self.endpoints.host_port(credentials.environment);
        let connection = Connection::connect(
            credentials.clone(),
            host,
            port,
            self.connection_settings.clone(),
            self.quotes(credentials.environment),
            skip_account_auth,
        )
        .await?;

        let now = Instant::now();
        self.entries.lock().insert(
            key.clone(),
            PoolEntry {
                connection: Arc::clone(&connection),
                created_at: now,
                last_used_at: now,
                in_use: true,
            },
        );
        tracing::info!(key, "Pooled new connection");
        Ok(connection)
    }

    /// Mark an entry as no longer in use.
    pub fn release(&self, key: &str) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.in_use = false;
            entry.last_used_at = Instant::now();
        }
    }

    /// Remove an entry and close its connection.
    pub fn evict(&self, key: &str, reason: &str) {
        if let Some(entry) = self.entries.lock().remove(key) {
            tracing::info!(key, reason, "Evicting pooled connection");
            entry.connection.close(reason);
        }
    }

    /// Acquire a connection, run an operation, and release on success.
    ///
    /// Any error from the operation evicts the entry wholesale before
    /// propagating; the connection is assumed poisoned.
    ///
    /// # Errors
    ///
    /// Returns acquisition errors and whatever the operation returns.
    pub async fn with_connection<T, F, Fut>(
        &self,
        credentials: &Credentials,
        skip_account_auth: bool,
        op: F,
    ) -> Result<T, ConnectionError>
    where
        F: FnOnce(Arc<Connection>) -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        let key = credentials.pool_key();
        let connection = self.get(credentials, skip_account_auth).await?;

        match op(connection).await {
            Ok(value) => {
                self.release(&key);
                Ok(value)
            }
            Err(e) => {
                self.evict(&key, "operation failed");
                Err(e)
            }
        }
    }

    /// [`Self::with_connection`] with one transparent retry on connection
    /// loss, which recreates a fresh connection behind the same call.
    ///
    /// # Errors
    ///
    /// Returns the final error when the retry also fails.
    pub async fn with_connection_retry<T, F, Fut>(
        &self,
        credentials: &Credentials,
        skip_account_auth: bool,
        op: F,
    ) -> Result<T, ConnectionError>
    where
        F: Fn(Arc<Connection>) -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        match self.with_connection(credentials, skip_account_auth, &op).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_connection_loss() => {
                tracing::warn!(
                    key = credentials.pool_key(),
                    error = %e,
                    "Retrying operation on a fresh connection"
                );
                self.with_connection(credentials, skip_account_auth, &op).await
            }
            Err(e) => Err(e),
        }
    }

    /// Run one recycling sweep.
    ///
    /// Idle eviction (resource reclamation) and age eviction (bounding
    /// long-lived-socket staleness) are independent predicates; both are
    /// always evaluated, and age eviction fires even on a perfectly healthy
    /// socket.
    pub fn sweep_once(&self) {
        let now = Instant::now();
        let mut evicted: Vec<(String, Arc<Connection>, &'static str)> = Vec::new();

        {
            let mut entries = self.entries.lock();

            let idle_keys: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| {
                    !entry.in_use
                        && now.duration_since(entry.last_used_at) > self.settings.idle_timeout
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in idle_keys {
                if let Some(entry) = entries.remove(&key) {
                    evicted.push((key, entry.connection, "idle timeout"));
                }
            }

            let aged_keys: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| {
                    !entry.in_use && now.duration_since(entry.created_at) > self.settings.max_age
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in aged_keys {
                if let Some(entry) = entries.remove(&key) {
                    evicted.push((key, entry.connection, "max age"));
                }
            }
        }

        for (key, connection, reason) in evicted {
            tracing::info!(key, reason, "Sweep evicting connection");
            connection.close(reason);
        }
    }

    /// Spawn the periodic sweep task.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: CancellationToken) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pool.settings.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; nothing to sweep yet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => pool.sweep_once(),
                }
            }
        });
    }

    /// Current pool stats.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut stats: Vec<PoolEntryStats> = entries
            .iter()
            .map(|(key, entry)| PoolEntryStats {
                key: key.clone(),
                state: entry.connection.state().as_str(),
                in_use: entry.in_use,
                age_secs: now.duration_since(entry.created_at).as_secs(),
                idle_secs: now.duration_since(entry.last_used_at).as_secs(),
            })
            .collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));

        PoolStats {
            connections: stats.len(),
            entries: stats,
        }
    }

    /// The per-key creation slot, created on first use.
    fn creation_slot(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self.creation_slots.lock();
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Reuse a healthy pooled entry, tearing down an unhealthy one.
    fn try_reuse(&self, key: &str, require_account_auth: bool) -> Option<Arc<Connection>> {
        let mut entries = self.entries.lock();

        let healthy = entries
            .get(key)
            .map(|entry| entry.connection.is_healthy(require_account_auth))?;

        if healthy {
            let entry = entries.get_mut(key)?;
            entry.in_use = true;
            entry.last_used_at = Instant::now();
            tracing::debug!(key, "Reusing pooled connection");
            return Some(Arc::clone(&entry.connection));
        }

        if let Some(entry) = entries.remove(key) {
            tracing::info!(
                key,
                state = entry.connection.state().as_str(),
                "Replacing unhealthy pooled connection"
            );
            entry.connection.close("health check failed");
        }
        None
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connections", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}
