//! Facade-level error type.

use crate::infrastructure::openapi::ConnectionError;

/// Errors a facade operation can produce.
///
/// Callers never see these directly; every operation boundary routes
/// through [`crate::application::map_error`] before responding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FacadeError {
    /// A connection-level failure, including upstream error replies.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A symbol name could not be resolved in the catalog.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound {
        /// The name that failed to resolve.
        symbol: String,
    },

    /// The request was structurally valid but semantically unusable.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },
}
