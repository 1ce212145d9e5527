//! Wire message schemas for the ProtoOA protocol.
//!
//! Hand-maintained `prost` structs mirroring the broker's published schema.
//! Only the fields the bridge reads or writes are declared; unknown fields
//! are skipped on decode and omitted on encode, which is wire-compatible
//! with the full schema. Field tags must never be changed.

/// Outer wire envelope. Every frame on the socket is exactly one of these.
///
/// The inner `payload` bytes are a second, independently typed encoding
/// selected by `payload_type`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoMessage {
    /// Numeric code selecting the inner payload schema.
    #[prost(uint32, tag = "1")]
    pub payload_type: u32,
    /// Serialized inner payload; absent for bodyless messages.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub payload: Option<Vec<u8>>,
    /// Caller-assigned correlation id echoed back by the server.
    #[prost(string, optional, tag = "3")]
    pub client_msg_id: Option<String>,
}

/// Generic error response from the common message family.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorRes {
    /// Machine-readable error code.
    #[prost(string, tag = "2")]
    pub error_code: String,
    /// Human-readable description.
    #[prost(string, optional, tag = "3")]
    pub description: Option<String>,
}

/// Error response from the trading message family.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OaErrorRes {
    /// Account the error relates to, when applicable.
    #[prost(int64, optional, tag = "2")]
    pub ctid_trader_account_id: Option<i64>,
    /// Machine-readable error code.
    #[prost(string, tag = "3")]
    pub error_code: String,
    /// Human-readable description.
    #[prost(string, optional, tag = "4")]
    pub description: Option<String>,
}

/// Keep-alive event; carries no payload fields.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeartbeatEvent {}

/// Protocol version request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionReq {}

/// Protocol version response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionRes {
    /// Server protocol version string.
    #[prost(string, tag = "2")]
    pub version: String,
}

/// Application (client) authentication request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApplicationAuthReq {
    /// OAuth client id of the bridge application.
    #[prost(string, tag = "2")]
    pub client_id: String,
    /// OAuth client secret of the bridge application.
    #[prost(string, tag = "3")]
    pub client_secret: String,
}

/// Application authentication response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApplicationAuthRes {}

/// Account authentication request, binding the session to one account.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountAuthReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// OAuth access token authorizing access to the account.
    #[prost(string, tag = "3")]
    pub access_token: String,
}

/// Account authentication response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountAuthRes {
    /// Trading account id the session is now bound to.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Trader (account info) request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TraderReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Trader (account info) response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TraderRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Account details.
    #[prost(message, optional, tag = "3")]
    pub trader: Option<Trader>,
}

/// Account details as reported by the upstream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trader {
    /// Trading account id.
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    /// Account balance in minor units (cents).
    #[prost(int64, tag = "2")]
    pub balance: i64,
}

/// Reconcile request: open positions and pending orders for an account.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReconcileReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Reconcile response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReconcileRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Currently open positions.
    #[prost(message, repeated, tag = "3")]
    pub position: Vec<Position>,
}

/// One open position.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    /// Position id.
    #[prost(int64, tag = "1")]
    pub position_id: i64,
    /// Immutable trade parameters (symbol, side, volume).
    #[prost(message, optional, tag = "2")]
    pub trade_data: Option<TradeData>,
    /// Lifecycle status.
    #[prost(enumeration = "PositionStatus", tag = "3")]
    pub position_status: i32,
    /// Accumulated swap in minor units.
    #[prost(int64, tag = "4")]
    pub swap: i64,
    /// Entry price.
    #[prost(double, optional, tag = "5")]
    pub price: Option<f64>,
    /// Unrealized profit/loss in minor units.
    #[prost(int64, optional, tag = "14")]
    pub unrealized_pnl: Option<i64>,
}

/// Immutable parameters of a trade.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeData {
    /// Symbol traded.
    #[prost(int64, tag = "1")]
    pub symbol_id: i64,
    /// Volume in upstream minor trading units.
    #[prost(int64, tag = "2")]
    pub volume: i64,
    /// Buy or sell.
    #[prost(enumeration = "TradeSide", tag = "3")]
    pub trade_side: i32,
    /// Open time, epoch milliseconds.
    #[prost(int64, optional, tag = "4")]
    pub open_timestamp: Option<i64>,
}

/// Symbol catalog request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SymbolsListReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Include delisted symbols.
    #[prost(bool, optional, tag = "3")]
    pub include_archived_symbols: Option<bool>,
}

/// Symbol catalog response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SymbolsListRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Catalog entries.
    #[prost(message, repeated, tag = "3")]
    pub symbol: Vec<LightSymbol>,
}

/// Catalog entry: the subset of symbol data needed for lookups.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LightSymbol {
    /// Numeric symbol id used in all other operations.
    #[prost(int64, tag = "1")]
    pub symbol_id: i64,
    /// Display name, e.g. "EURUSD".
    #[prost(string, optional, tag = "2")]
    pub symbol_name: Option<String>,
    /// Whether the symbol is currently tradeable.
    #[prost(bool, optional, tag = "3")]
    pub enabled: Option<bool>,
    /// Free-form description.
    #[prost(string, optional, tag = "7")]
    pub description: Option<String>,
}

/// Accounts-by-access-token request (app-auth only; no account binding).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAccountsByAccessTokenReq {
    /// OAuth access token to enumerate accounts for.
    #[prost(string, tag = "2")]
    pub access_token: String,
}

/// Accounts-by-access-token response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAccountsByAccessTokenRes {
    /// Accounts the token grants access to.
    #[prost(message, repeated, tag = "3")]
    pub ctid_trader_account: Vec<CtidTraderAccount>,
}

/// One account visible to an access token.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CtidTraderAccount {
    /// Trading account id.
    #[prost(uint64, tag = "1")]
    pub ctid_trader_account_id: u64,
    /// True for live accounts, false for demo.
    #[prost(bool, optional, tag = "2")]
    pub is_live: Option<bool>,
    /// Broker-side login number.
    #[prost(int64, optional, tag = "3")]
    pub trader_login: Option<i64>,
}

/// New order request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewOrderReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Symbol to trade.
    #[prost(int64, tag = "3")]
    pub symbol_id: i64,
    /// Order type; the bridge only places market orders.
    #[prost(enumeration = "OrderType", tag = "4")]
    pub order_type: i32,
    /// Buy or sell.
    #[prost(enumeration = "TradeSide", tag = "5")]
    pub trade_side: i32,
    /// Volume in upstream minor trading units.
    #[prost(int64, tag = "6")]
    pub volume: i64,
}

/// Order lifecycle event; also the reply to a new-order request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecutionEvent {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// What happened to the order.
    #[prost(enumeration = "ExecutionType", tag = "3")]
    pub execution_type: i32,
    /// Affected position, when the event created or changed one.
    #[prost(message, optional, tag = "4")]
    pub position: Option<Position>,
    /// The order as the server sees it.
    #[prost(message, optional, tag = "5")]
    pub order: Option<Order>,
    /// Fill details, present on (partial) fills.
    #[prost(message, optional, tag = "6")]
    pub deal: Option<Deal>,
    /// Error code when the event reports a rejection.
    #[prost(string, optional, tag = "11")]
    pub error_code: Option<String>,
}

/// Server-side view of an order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Order {
    /// Order id.
    #[prost(int64, tag = "1")]
    pub order_id: i64,
    /// Immutable trade parameters.
    #[prost(message, optional, tag = "2")]
    pub trade_data: Option<TradeData>,
    /// Order type.
    #[prost(enumeration = "OrderType", tag = "3")]
    pub order_type: i32,
    /// Current status.
    #[prost(enumeration = "OrderStatus", tag = "4")]
    pub order_status: i32,
    /// Price the order executed at, when filled.
    #[prost(double, optional, tag = "10")]
    pub execution_price: Option<f64>,
}

/// One fill.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Deal {
    /// Deal id.
    #[prost(int64, tag = "1")]
    pub deal_id: i64,
    /// Order that produced the fill.
    #[prost(int64, tag = "2")]
    pub order_id: i64,
    /// Position the fill opened or extended.
    #[prost(int64, tag = "3")]
    pub position_id: i64,
    /// Requested volume in upstream minor trading units.
    #[prost(int64, tag = "4")]
    pub volume: i64,
    /// Execution price.
    #[prost(double, optional, tag = "7")]
    pub execution_price: Option<f64>,
}

/// Order rejection pushed outside the execution-event flow.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrderErrorEvent {
    /// Machine-readable error code.
    #[prost(string, tag = "2")]
    pub error_code: String,
    /// Rejected order id, when known.
    #[prost(int64, optional, tag = "3")]
    pub order_id: Option<i64>,
    /// Affected position id, when known.
    #[prost(int64, optional, tag = "4")]
    pub position_id: Option<i64>,
    /// Trading account id.
    #[prost(int64, tag = "5")]
    pub ctid_trader_account_id: i64,
    /// Human-readable description.
    #[prost(string, optional, tag = "6")]
    pub description: Option<String>,
}

/// Subscribe-to-spots request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeSpotsReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Symbols to subscribe.
    #[prost(int64, repeated, tag = "3")]
    pub symbol_id: Vec<i64>,
}

/// Subscribe-to-spots response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeSpotsRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Unsubscribe-from-spots request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnsubscribeSpotsReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Symbols to unsubscribe.
    #[prost(int64, repeated, tag = "3")]
    pub symbol_id: Vec<i64>,
}

/// Unsubscribe-from-spots response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnsubscribeSpotsRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
}

/// Unsolicited spot price push.
///
/// A push may carry only one side; the missing side keeps its last known
/// value in the quote cache. Prices carry five implied decimal digits.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpotEvent {
    /// Trading account id the subscription belongs to.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Symbol the prices are for.
    #[prost(int64, tag = "3")]
    pub symbol_id: i64,
    /// Bid price, scaled by 100000.
    #[prost(uint64, optional, tag = "4")]
    pub bid: Option<u64>,
    /// Ask price, scaled by 100000.
    #[prost(uint64, optional, tag = "5")]
    pub ask: Option<u64>,
    /// Server timestamp, epoch milliseconds.
    #[prost(int64, optional, tag = "7")]
    pub timestamp: Option<i64>,
}

/// Historical trendbars request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTrendbarsReq {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Range start, epoch milliseconds.
    #[prost(int64, tag = "3")]
    pub from_timestamp: i64,
    /// Range end, epoch milliseconds.
    #[prost(int64, tag = "4")]
    pub to_timestamp: i64,
    /// Bar period.
    #[prost(enumeration = "TrendbarPeriod", tag = "5")]
    pub period: i32,
    /// Symbol to fetch bars for.
    #[prost(int64, tag = "6")]
    pub symbol_id: i64,
    /// Maximum number of bars.
    #[prost(uint32, optional, tag = "7")]
    pub count: Option<u32>,
}

/// Historical trendbars response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTrendbarsRes {
    /// Trading account id.
    #[prost(int64, tag = "2")]
    pub ctid_trader_account_id: i64,
    /// Bar period of the returned series.
    #[prost(enumeration = "TrendbarPeriod", tag = "3")]
    pub period: i32,
    /// The bars, oldest first.
    #[prost(message, repeated, tag = "4")]
    pub trendbar: Vec<Trendbar>,
    /// Symbol the series is for.
    #[prost(int64, optional, tag = "5")]
    pub symbol_id: Option<i64>,
}

/// One historical bar.
///
/// The upstream delta-encodes prices: `low` is absolute (scaled by 100000)
/// and open/high/close are stored as non-negative deltas from `low`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trendbar {
    /// Tick volume.
    #[prost(int64, tag = "3")]
    pub volume: i64,
    /// Bar period.
    #[prost(enumeration = "TrendbarPeriod", optional, tag = "4")]
    pub period: Option<i32>,
    /// Low price, scaled by 100000.
    #[prost(int64, optional, tag = "5")]
    pub low: Option<i64>,
    /// Open price delta from low.
    #[prost(uint64, optional, tag = "6")]
    pub delta_open: Option<u64>,
    /// Close price delta from low.
    #[prost(uint64, optional, tag = "7")]
    pub delta_close: Option<u64>,
    /// High price delta from low.
    #[prost(uint64, optional, tag = "8")]
    pub delta_high: Option<u64>,
    /// Bar start time, minutes since the epoch.
    #[prost(uint32, optional, tag = "9")]
    pub utc_timestamp_in_minutes: Option<u32>,
}

/// Buy/sell side of a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TradeSide {
    /// Buy.
    Buy = 1,
    /// Sell.
    Sell = 2,
}

/// Order type; the bridge only ever sends `Market`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderType {
    /// Market order.
    Market = 1,
    /// Limit order.
    Limit = 2,
    /// Stop order.
    Stop = 3,
    /// Stop-limit order.
    StopLimit = 4,
}

/// Position lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PositionStatus {
    /// Open position.
    Open = 1,
    /// Closed position.
    Closed = 2,
    /// Created but not yet open.
    Created = 3,
    /// Errored position.
    Error = 4,
}

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderStatus {
    /// Accepted but not filled.
    Accepted = 1,
    /// Fully filled.
    Filled = 2,
    /// Rejected by the server.
    Rejected = 3,
    /// Expired.
    Expired = 4,
    /// Cancelled.
    Cancelled = 5,
}

/// What an execution event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ExecutionType {
    /// Order accepted by the server.
    OrderAccepted = 2,
    /// Order fully filled.
    OrderFilled = 3,
    /// Order replaced.
    OrderReplaced = 4,
    /// Order cancelled.
    OrderCancelled = 5,
    /// Order expired.
    OrderExpired = 6,
    /// Order rejected.
    OrderRejected = 7,
    /// Cancel request rejected.
    OrderCancelRejected = 8,
    /// Swap charge applied.
    Swap = 9,
    /// Deposit or withdrawal booked.
    DepositWithdraw = 10,
    /// Order partially filled.
    OrderPartialFill = 11,
}

/// Bar period for historical data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TrendbarPeriod {
    /// One minute.
    M1 = 1,
    /// Two minutes.
    M2 = 2,
    /// Three minutes.
    M3 = 3,
    /// Four minutes.
    M4 = 4,
    /// Five minutes.
    M5 = 5,
    /// Ten minutes.
    M10 = 6,
    /// Fifteen minutes.
    M15 = 7,
    /// Thirty minutes.
    M30 = 8,
    /// One hour.
    H1 = 9,
    /// Four hours.
    H4 = 10,
    /// Twelve hours.
    H12 = 11,
    /// One day.
    D1 = 12,
    /// One week.
    W1 = 13,
    /// One month.
    Mn1 = 14,
}

impl TrendbarPeriod {
    /// Parse a caller-facing period name ("M1", "H1", "D1", ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "M1" => Some(Self::M1),
            "M2" => Some(Self::M2),
            "M3" => Some(Self::M3),
            "M4" => Some(Self::M4),
            "M5" => Some(Self::M5),
            "M10" => Some(Self::M10),
            "M15" => Some(Self::M15),
            "M30" => Some(Self::M30),
            "H1" => Some(Self::H1),
            "H4" => Some(Self::H4),
            "H12" => Some(Self::H12),
            "D1" => Some(Self::D1),
            "W1" => Some(Self::W1),
            "MN1" => Some(Self::Mn1),
            _ => None,
        }
    }
}
