//! Configuration loaded from environment variables.

mod settings;

pub use settings::{
    AppCredentials, BridgeConfig, ConfigError, ConnectionSettings, EndpointSettings, PoolSettings,
    ServerSettings,
};
