//! Classification of raised errors into the stable external taxonomy.
//!
//! The mapping is deterministic and total: every error reaches exactly one
//! class, with an unconditional `InternalError` default. Callers see only
//! these classes, never raw protocol errors.

use super::error::FacadeError;
use crate::infrastructure::openapi::ConnectionError;

/// The closed external error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The instrument is not currently trading.
    MarketClosed,
    /// Insufficient funds or margin for the order.
    InsufficientFunds,
    /// Trading is disabled for the account or symbol.
    TradingDisabled,
    /// The symbol does not exist.
    SymbolNotFound,
    /// The request was not answered in time.
    Timeout,
    /// The upstream connection was lost.
    ConnectionLost,
    /// The symbol was already subscribed; a no-op success, not a failure.
    AlreadySubscribed,
    /// The caller's request was semantically unusable.
    InvalidRequest,
    /// Anything unmatched.
    InternalError,
}

impl ErrorClass {
    /// HTTP status class for this error.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::AlreadySubscribed => 200,
            Self::InvalidRequest => 400,
            Self::TradingDisabled => 403,
            Self::SymbolNotFound => 404,
            Self::MarketClosed | Self::InsufficientFunds => 422,
            Self::InternalError => 500,
            Self::ConnectionLost => 502,
            Self::Timeout => 504,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MarketClosed => "MARKET_CLOSED",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::TradingDisabled => "TRADING_DISABLED",
            Self::SymbolNotFound => "SYMBOL_NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionLost => "CONNECTION_LOST",
            Self::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this class resolves to a successful response.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::AlreadySubscribed)
    }
}

/// A classified error, ready for the response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedError {
    /// Taxonomy class.
    pub class: ErrorClass,
    /// HTTP status class.
    pub status: u16,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable description.
    pub description: String,
}

/// Classify an error into the external taxonomy.
#[must_use]
pub fn map_error(error: &FacadeError) -> MappedError {
    let class = classify(error);
    MappedError {
        class,
        status: class.status(),
        code: class.code(),
        description: error.to_string(),
    }
}

fn classify(error: &FacadeError) -> ErrorClass {
    match error {
        FacadeError::SymbolNotFound { .. } => ErrorClass::SymbolNotFound,
        FacadeError::InvalidRequest { .. } => ErrorClass::InvalidRequest,
        FacadeError::Connection(e) => classify_connection(e),
    }
}

fn classify_connection(error: &ConnectionError) -> ErrorClass {
    match error {
        ConnectionError::Timeout { .. } => ErrorClass::Timeout,
        ConnectionError::NotConnected
        | ConnectionError::Closed { .. }
        | ConnectionError::ConnectFailed { .. } => ErrorClass::ConnectionLost,
        ConnectionError::Upstream { code, description } => classify_upstream(code, description),
        ConnectionError::NotAuthenticated { .. }
        | ConnectionError::Decode { .. }
        | ConnectionError::UnexpectedPayload { .. } => ErrorClass::InternalError,
    }
}

/// Classify an upstream error reply by code and description substrings.
fn classify_upstream(code: &str, description: &str) -> ErrorClass {
    let haystack = format!("{code} {description}").to_ascii_uppercase();

    if haystack.contains("ALREADY_SUBSCRIBED") {
        ErrorClass::AlreadySubscribed
    } else if haystack.contains("MARKET_CLOSED") || haystack.contains("MARKET_IS_CLOSED") {
        ErrorClass::MarketClosed
    } else if haystack.contains("NOT_ENOUGH_MONEY")
        || haystack.contains("INSUFFICIENT")
        || haystack.contains("MARGIN")
    {
        ErrorClass::InsufficientFunds
    } else if haystack.contains("TRADING_DISABLED") || haystack.contains("ACCOUNT_DISABLED") {
        ErrorClass::TradingDisabled
    } else if haystack.contains("SYMBOL_NOT_FOUND") || haystack.contains("UNKNOWN_SYMBOL") {
        ErrorClass::SymbolNotFound
    } else if haystack.contains("TIMEOUT") {
        ErrorClass::Timeout
    } else if haystack.contains("CONNECTION") {
        ErrorClass::ConnectionLost
    } else {
        ErrorClass::InternalError
    }
}
