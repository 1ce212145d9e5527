//! Request bodies accepted by the facade.
//!
//! Every credentialed operation takes the same caller identity triple; the
//! app-level secret is deliberately absent from all of these shapes.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Caller identity for one logical trading account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsBody {
    /// OAuth access token for the account.
    pub access_token: String,
    /// Trading account id.
    pub account_id: i64,
    /// Demo vs live environment.
    pub is_demo: bool,
}

/// Account snapshot request.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
}

/// Open positions request.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionsRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
}

/// Symbol catalog request.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolsRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
}

/// Symbol-name-to-id lookup request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIdRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
    /// Name to resolve.
    pub symbol_name: String,
}

/// Real-time quote request. One of `symbol_id`/`symbol_name` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
    /// Numeric symbol id.
    pub symbol_id: Option<i64>,
    /// Symbol name, resolved via the catalog when no id is given.
    pub symbol_name: Option<String>,
}

/// Market order request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
    /// Numeric symbol id.
    pub symbol_id: Option<i64>,
    /// Symbol name, resolved via the catalog when no id is given.
    pub symbol_name: Option<String>,
    /// "BUY" or "SELL".
    pub side: String,
    /// Caller-facing order size.
    pub volume: Decimal,
}

/// Accounts-by-token request; the only credentialed shape without an
/// account id, since it exists to discover account ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsRequest {
    /// OAuth access token to enumerate accounts for.
    pub access_token: String,
    /// Demo vs live environment.
    pub is_demo: bool,
}

/// Historical bars request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarsRequest {
    /// Caller identity.
    #[serde(flatten)]
    pub credentials: CredentialsBody,
    /// Numeric symbol id.
    pub symbol_id: i64,
    /// Bar period name ("M1", "H1", "D1", ...).
    pub period: String,
    /// Range start, epoch milliseconds.
    pub from_timestamp: i64,
    /// Range end, epoch milliseconds.
    pub to_timestamp: i64,
    /// Maximum number of bars.
    pub count: Option<u32>,
}
