#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! cTrader Bridge - Trading API Protocol Bridge
//!
//! Maintains long-lived, length-framed protobuf connections to the broker's
//! ProtoOA trading API and exposes a synchronous JSON request/response
//! facade to callers that cannot hold such connections themselves.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types with no protocol dependencies
//!   - `quote`: Quote cache shared across connections per environment
//!   - `trading`: Environments, credentials, facade result shapes
//!
//! - **Application**: The bridge facade
//!   - `bridge`: Top-level instance owning the pool and quote caches
//!   - `error_mapper`: Classification into the stable external taxonomy
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `openapi`: Wire schemas, codec, connections, connection pool
//!   - `http`: Axum facade server
//!   - `config`: Environment-variable configuration
//!
//! # Data Flow
//!
//! ```text
//! Caller ──► HTTP facade ──► Pool.with_connection ──► Connection ──► upstream
//!                                                        │
//!                              Quote cache ◄── spot push ┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - core types shared by every other layer.
pub mod domain;

/// Application layer - the bridge facade and error taxonomy.
pub mod application;

/// Infrastructure layer - protocol adapters, config, HTTP server.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{
    Credentials, Environment, Quote, QuoteCache, QuoteResult, VOLUME_SCALE, price_from_spot,
};

// Application surface
pub use application::{Bridge, BridgeStats, ErrorClass, FacadeError, MappedError, map_error};

// Infrastructure config
pub use infrastructure::config::{
    AppCredentials, BridgeConfig, ConfigError, ConnectionSettings, EndpointSettings, PoolSettings,
    ServerSettings,
};

// Upstream protocol (for integration tests)
pub use infrastructure::openapi::{
    Connection, ConnectionError, ConnectionPool, ConnectionState, Payload, PoolStats,
};

// HTTP facade server
pub use infrastructure::http::{AppState, create_router};
