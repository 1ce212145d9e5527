//! Bridge configuration types, loaded from environment variables.

use std::time::Duration;

use crate::domain::Environment;

/// Application-level credentials identifying the bridge to the upstream.
///
/// These are shared across every account the bridge serves and are resolved
/// from process configuration only; callers cannot supply them.
#[derive(Clone)]
pub struct AppCredentials {
    client_id: String,
    client_secret: String,
}

impl AppCredentials {
    /// Create new application credentials.
    #[must_use]
    pub const fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// The client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Upstream endpoints per environment.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Demo environment host.
    pub demo_host: String,
    /// Demo environment port.
    pub demo_port: u16,
    /// Live environment host.
    pub live_host: String,
    /// Live environment port.
    pub live_port: u16,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            demo_host: "demo.ctraderapi.com".to_string(),
            demo_port: 5035,
            live_host: "live.ctraderapi.com".to_string(),
            live_port: 5035,
        }
    }
}

impl EndpointSettings {
    /// Host and port for an environment.
    #[must_use]
    pub fn host_port(&self, environment: Environment) -> (&str, u16) {
        match environment {
            Environment::Demo => (&self.demo_host, self.demo_port),
            Environment::Live => (&self.live_host, self.live_port),
        }
    }
}

/// Per-connection timing and framing settings.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for one request/response round trip.
    pub request_timeout: Duration,
    /// Fixed heartbeat interval, tuned under the upstream idle timeout.
    pub heartbeat_interval: Duration,
    /// Heartbeat sub-interval injected while a quote wait is in progress.
    pub wait_heartbeat_interval: Duration,
    /// Quote wait window after sending a new subscription.
    pub subscribe_wait: Duration,
    /// Quote wait window when the symbol is already subscribed.
    pub resubscribe_wait: Duration,
    /// Maximum accepted frame size in bytes.
    pub max_frame_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            heartbeat_interval: Duration::from_secs(10),
            wait_heartbeat_interval: Duration::from_secs(4),
            subscribe_wait: Duration::from_secs(10),
            resubscribe_wait: Duration::from_secs(5),
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// Pool recycling settings.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Interval between recycling sweeps.
    pub sweep_interval: Duration,
    /// Evict entries not in use for longer than this.
    pub idle_timeout: Duration,
    /// Evict entries older than this even when healthy.
    pub max_age: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(600),
            max_age: Duration::from_secs(1800),
        }
    }
}

/// HTTP facade server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port the facade listens on.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Application credentials.
    pub credentials: AppCredentials,
    /// Upstream endpoints.
    pub endpoints: EndpointSettings,
    /// Connection settings.
    pub connection: ConnectionSettings,
    /// Pool settings.
    pub pool: PoolSettings,
    /// Facade server settings.
    pub server: ServerSettings,
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = std::env::var("CTRADER_CLIENT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("CTRADER_CLIENT_ID".to_string()))?;
        let client_secret = std::env::var("CTRADER_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("CTRADER_CLIENT_SECRET".to_string()))?;

        if client_id.is_empty() {
            return Err(ConfigError::EmptyValue("CTRADER_CLIENT_ID".to_string()));
        }
        if client_secret.is_empty() {
            return Err(ConfigError::EmptyValue("CTRADER_CLIENT_SECRET".to_string()));
        }

        let defaults = EndpointSettings::default();
        let endpoints = EndpointSettings {
            demo_host: parse_env_string("CTRADER_DEMO_HOST", defaults.demo_host),
            demo_port: parse_env_u16("CTRADER_DEMO_PORT", defaults.demo_port),
            live_host: parse_env_string("CTRADER_LIVE_HOST", defaults.live_host),
            live_port: parse_env_u16("CTRADER_LIVE_PORT", defaults.live_port),
        };

        let connection = ConnectionSettings {
            connect_timeout: parse_env_duration_secs(
                "BRIDGE_CONNECT_TIMEOUT_SECS",
                ConnectionSettings::default().connect_timeout,
            ),
            request_timeout: parse_env_duration_secs(
                "BRIDGE_REQUEST_TIMEOUT_SECS",
                ConnectionSettings::default().request_timeout,
            ),
            heartbeat_interval: parse_env_duration_secs(
                "BRIDGE_HEARTBEAT_INTERVAL_SECS",
                ConnectionSettings::default().heartbeat_interval,
            ),
            wait_heartbeat_interval: parse_env_duration_secs(
                "BRIDGE_WAIT_HEARTBEAT_INTERVAL_SECS",
                ConnectionSettings::default().wait_heartbeat_interval,
            ),
            subscribe_wait: parse_env_duration_secs(
                "BRIDGE_SUBSCRIBE_WAIT_SECS",
                ConnectionSettings::default().subscribe_wait,
            ),
            resubscribe_wait: parse_env_duration_secs(
                "BRIDGE_RESUBSCRIBE_WAIT_SECS",
                ConnectionSettings::default().resubscribe_wait,
            ),
            max_frame_bytes: parse_env_usize(
                "BRIDGE_MAX_FRAME_BYTES",
                ConnectionSettings::default().max_frame_bytes,
            ),
        };

        let pool = PoolSettings {
            sweep_interval: parse_env_duration_secs(
                "BRIDGE_POOL_SWEEP_INTERVAL_SECS",
                PoolSettings::default().sweep_interval,
            ),
            idle_timeout: parse_env_duration_secs(
                "BRIDGE_POOL_IDLE_TIMEOUT_SECS",
                PoolSettings::default().idle_timeout,
            ),
            max_age: parse_env_duration_secs(
                "BRIDGE_POOL_MAX_AGE_SECS",
                PoolSettings::default().max_age,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("BRIDGE_HTTP_PORT", ServerSettings::default().http_port),
        };

        Ok(Self {
            credentials: AppCredentials::new(client_id, client_secret),
            endpoints,
            connection,
            pool,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has an empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_string(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_cover_both_environments() {
        let endpoints = EndpointSettings::default();
        let (host, port) = endpoints.host_port(Environment::Demo);
        assert_eq!(host, "demo.ctraderapi.com");
        assert_eq!(port, 5035);
        let (host, _) = endpoints.host_port(Environment::Live);
        assert_eq!(host, "live.ctraderapi.com");
    }

    #[test]
    fn connection_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(10));
        assert!(settings.wait_heartbeat_interval < settings.heartbeat_interval);
        assert!(settings.resubscribe_wait < settings.subscribe_wait);
    }

    #[test]
    fn pool_defaults_keep_age_above_idle() {
        let settings = PoolSettings::default();
        assert!(settings.max_age > settings.idle_timeout);
        assert!(settings.sweep_interval < settings.idle_timeout);
    }

    #[test]
    fn app_credentials_debug_is_redacted() {
        let creds = AppCredentials::new("public-id".to_string(), "s3cr3t".to_string());
        let debug = format!("{creds:?}");
        assert!(debug.contains("public-id"));
        assert!(!debug.contains("s3cr3t"));
    }
}
