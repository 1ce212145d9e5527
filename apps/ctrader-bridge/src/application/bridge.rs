//! Top-level bridge instance.
//!
//! Owns the shared state that outlives any single connection: the
//! per-environment quote caches and the connection pool. Instantiated as an
//! explicit object (not a process global) so tests can run several
//! independent bridges in one process.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::{Credentials, Environment, QuoteCache};
use crate::infrastructure::config::BridgeConfig;
use crate::infrastructure::openapi::{ConnectionPool, PoolStats};

/// The bridge: configuration, quote caches, and the connection pool.
pub struct Bridge {
    config: BridgeConfig,
    pool: Arc<ConnectionPool>,
}

/// Bridge-wide stats for the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Crate version.
    pub version: &'static str,
    /// Connection pool stats.
    pub pool: PoolStats,
    /// Symbols with cached prices in the demo environment.
    pub cached_quotes_demo: usize,
    /// Symbols with cached prices in the live environment.
    pub cached_quotes_live: usize,
}

impl Bridge {
    /// Build a bridge from configuration.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let demo_quotes = Arc::new(QuoteCache::new());
        let live_quotes = Arc::new(QuoteCache::new());
        let pool = Arc::new(ConnectionPool::new(
            config.endpoints.clone(),
            config.connection.clone(),
            config.pool.clone(),
            demo_quotes,
            live_quotes,
        ));

        Self { config, pool }
    }

    /// The connection pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Start the periodic pool recycling sweep.
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) {
        self.pool.spawn_sweeper(shutdown);
    }

    /// Bridge-wide stats.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            version: env!("CARGO_PKG_VERSION"),
            pool: self.pool.stats(),
            cached_quotes_demo: self.pool.quotes(Environment::Demo).len(),
            cached_quotes_live: self.pool.quotes(Environment::Live).len(),
        }
    }

    /// Build full credentials for a caller request.
    ///
    /// The app-level secret comes from process configuration only; it is
    /// never accepted from the caller payload.
    pub(crate) fn credentials(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
    ) -> Credentials {
        Credentials {
            client_id: self.config.credentials.client_id().to_string(),
            client_secret: self.config.credentials.client_secret().to_string(),
            access_token: access_token.to_string(),
            account_id,
            environment: Environment::from_is_demo(is_demo),
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{
        AppCredentials, ConnectionSettings, EndpointSettings, PoolSettings, ServerSettings,
    };

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            credentials: AppCredentials::new("client".to_string(), "secret".to_string()),
            endpoints: EndpointSettings::default(),
            connection: ConnectionSettings::default(),
            pool: PoolSettings::default(),
            server: ServerSettings::default(),
        }
    }

    #[test]
    fn bridges_are_independent() {
        let a = Bridge::new(test_config());
        let b = Bridge::new(test_config());

        assert!(!Arc::ptr_eq(
            &a.pool().quotes(Environment::Demo),
            &b.pool().quotes(Environment::Demo)
        ));
    }

    #[test]
    fn credentials_resolve_secret_from_config() {
        let bridge = Bridge::new(test_config());
        let creds = bridge.credentials("token-1", 42, true);

        assert_eq!(creds.client_id, "client");
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.access_token, "token-1");
        assert_eq!(creds.environment, Environment::Demo);
        assert_eq!(creds.pool_key(), "demo_42");
    }

    #[test]
    fn stats_start_empty() {
        let bridge = Bridge::new(test_config());
        let stats = bridge.stats();
        assert_eq!(stats.pool.connections, 0);
        assert_eq!(stats.cached_quotes_demo, 0);
        assert_eq!(stats.cached_quotes_live, 0);
    }
}
