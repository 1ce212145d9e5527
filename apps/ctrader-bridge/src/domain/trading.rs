//! Trading-side domain types: environments, credentials, and the values the
//! facade returns to callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Conversion between a caller-facing order size and the upstream's minor
/// trading unit: caller units multiplied by this constant are wire volume.
///
/// This is the single canonical constant; no call site performs its own
/// conversion.
pub const VOLUME_SCALE: i64 = 100;

/// Implied decimal digits in upstream monetary fields (minor units).
pub const MONEY_DIGITS: u32 = 2;

/// Convert an upstream minor-unit amount into a decimal amount.
#[must_use]
pub fn money_from_minor(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, MONEY_DIGITS)
}

/// Convert a caller-facing order size into upstream wire volume.
///
/// Returns `None` for sizes that do not land on a whole number of upstream
/// units or are not positive.
#[must_use]
pub fn volume_to_upstream(size: Decimal) -> Option<i64> {
    if size <= Decimal::ZERO {
        return None;
    }
    let scaled = size * Decimal::from(VOLUME_SCALE);
    if scaled.fract() != Decimal::ZERO {
        return None;
    }
    scaled.to_i64()
}

/// Convert upstream wire volume back into a caller-facing size.
#[must_use]
pub fn volume_from_upstream(volume: i64) -> Decimal {
    Decimal::new(volume, 2)
}

/// Trading environment the upstream exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Demo environment (simulated funds).
    #[default]
    Demo,
    /// Live environment (real funds).
    Live,
}

impl Environment {
    /// Environment selected by a caller's `isDemo` flag.
    #[must_use]
    pub const fn from_is_demo(is_demo: bool) -> Self {
        if is_demo { Self::Demo } else { Self::Live }
    }

    /// Whether this is the live environment.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Environment name used in pool keys and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Live => "live",
        }
    }
}

/// Identity of one logical trading account in one environment.
///
/// `client_id` and `client_secret` identify the bridge application itself
/// and come from process configuration, never from caller payloads.
#[derive(Clone)]
pub struct Credentials {
    /// Bridge application client id.
    pub client_id: String,
    /// Bridge application client secret.
    pub client_secret: String,
    /// OAuth access token for the account.
    pub access_token: String,
    /// Trading account id.
    pub account_id: i64,
    /// Environment the account lives in.
    pub environment: Environment,
}

impl Credentials {
    /// Pool registry key for these credentials.
    #[must_use]
    pub fn pool_key(&self) -> String {
        format!("{}_{}", self.environment.as_str(), self.account_id)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("environment", &self.environment)
            .finish()
    }
}

/// Buy/sell direction in caller-facing terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl TradeDirection {
    /// Parse a caller-facing side name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// Account snapshot returned by the facade.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Trading account id.
    pub account_id: i64,
    /// Balance in major units.
    pub balance: Decimal,
    /// Equity in major units: balance plus unrealized P&L across open
    /// positions.
    pub equity: Decimal,
    /// Number of currently open positions.
    pub open_positions: usize,
}

/// One open position as returned by the facade.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    /// Position id.
    pub position_id: i64,
    /// Symbol traded.
    pub symbol_id: i64,
    /// Buy or sell.
    pub direction: TradeDirection,
    /// Caller-facing size.
    pub volume: Decimal,
    /// Entry price, when reported.
    pub entry_price: Option<Decimal>,
    /// Accumulated swap in major units.
    pub swap: Decimal,
    /// Unrealized P&L in major units.
    pub unrealized_pnl: Decimal,
    /// Open time.
    pub opened_at: Option<DateTime<Utc>>,
}

/// One symbol catalog entry as returned by the facade.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    /// Numeric symbol id.
    pub symbol_id: i64,
    /// Display name.
    pub name: String,
    /// Whether the symbol is currently tradeable.
    pub enabled: bool,
    /// Free-form description.
    pub description: Option<String>,
}

/// Result of placing a market order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// Order id assigned by the upstream.
    pub order_id: Option<i64>,
    /// Position the order opened or extended.
    pub position_id: Option<i64>,
    /// Whether the order filled within the request window.
    pub filled: bool,
    /// Execution price, when filled.
    pub executed_price: Option<Decimal>,
}

/// One account visible to an access token.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingAccount {
    /// Trading account id.
    pub account_id: u64,
    /// True for live accounts.
    pub is_live: bool,
    /// Broker-side login number.
    pub trader_login: Option<i64>,
}

/// One historical bar as returned by the facade.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    /// Bar start time.
    pub timestamp: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Tick volume.
    pub volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_conversion_uses_canonical_scale() {
        assert_eq!(volume_to_upstream(Decimal::new(15, 1)), Some(150));
        assert_eq!(volume_to_upstream(Decimal::ONE), Some(100));
        assert_eq!(volume_to_upstream(Decimal::new(25, 2)), Some(25));
    }

    #[test]
    fn volume_conversion_rejects_invalid_sizes() {
        assert_eq!(volume_to_upstream(Decimal::ZERO), None);
        assert_eq!(volume_to_upstream(Decimal::new(-1, 0)), None);
        // 0.001 units would be a fractional upstream volume.
        assert_eq!(volume_to_upstream(Decimal::new(1, 3)), None);
    }

    #[test]
    fn volume_round_trips() {
        let size = Decimal::new(275, 2);
        let wire = volume_to_upstream(size).unwrap();
        assert_eq!(wire, 275);
        assert_eq!(volume_from_upstream(wire), size);
    }

    #[test]
    fn money_conversion_divides_by_one_hundred() {
        assert_eq!(money_from_minor(1_234_567), Decimal::new(1_234_567, 2));
        assert_eq!(money_from_minor(-250), Decimal::new(-250, 2));
    }

    #[test]
    fn environment_from_is_demo() {
        assert_eq!(Environment::from_is_demo(true), Environment::Demo);
        assert_eq!(Environment::from_is_demo(false), Environment::Live);
        assert!(Environment::Live.is_live());
    }

    #[test]
    fn pool_key_is_environment_scoped() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            access_token: "token".to_string(),
            account_id: 42,
            environment: Environment::Demo,
        };
        assert_eq!(creds.pool_key(), "demo_42");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
            access_token: "tok-123".to_string(),
            account_id: 42,
            environment: Environment::Live,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn trade_direction_parsing() {
        assert_eq!(TradeDirection::from_name("buy"), Some(TradeDirection::Buy));
        assert_eq!(
            TradeDirection::from_name("SELL"),
            Some(TradeDirection::Sell)
        );
        assert_eq!(TradeDirection::from_name("HOLD"), None);
    }
}
