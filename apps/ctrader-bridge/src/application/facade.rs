//! Facade operations: stateless translation from caller requests to
//! connection calls through the pool.
//!
//! Each operation validates its inputs, builds credentials (with the
//! app-level secret resolved from configuration, never the caller payload),
//! and runs against a pooled connection. Transient connection loss is
//! retried once on a fresh connection, except for order placement, which is
//! never replayed.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::bridge::Bridge;
use super::error::FacadeError;
use crate::domain::{
    AccountSnapshot, Bar, OrderReceipt, PositionInfo, QuoteResult, SPOT_PRICE_DIGITS, SymbolInfo,
    TradeDirection, TradingAccount, money_from_minor, volume_from_upstream, volume_to_upstream,
};
use crate::infrastructure::openapi::connection::{Connection, ConnectionError};
use crate::infrastructure::openapi::messages::{
    ExecutionEvent, ExecutionType, GetAccountsByAccessTokenReq, GetTrendbarsReq, LightSymbol,
    NewOrderReq, OrderType, Position, PositionStatus, ReconcileReq, SymbolsListReq, Trader,
    TraderReq, TradeSide, Trendbar, TrendbarPeriod,
};
use crate::infrastructure::openapi::Payload;
use crate::infrastructure::openapi::payload_type::codes;

impl Bridge {
    /// Account snapshot: balance plus equity derived from open positions.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream cannot be reached or replies with
    /// an error payload.
    pub async fn account_snapshot(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
    ) -> Result<AccountSnapshot, FacadeError> {
        let credentials = self.credentials(access_token, account_id, is_demo);
        let snapshot = self
            .pool()
            .with_connection_retry(&credentials, false, |connection| async move {
                let trader = fetch_trader(&connection, account_id).await?;
                let positions = fetch_open_positions(&connection, account_id).await?;
                Ok(build_snapshot(account_id, &trader, &positions))
            })
            .await?;
        Ok(snapshot)
    }

    /// Currently open positions.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream cannot be reached or replies with
    /// an error payload.
    pub async fn open_positions(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
    ) -> Result<Vec<PositionInfo>, FacadeError> {
        let credentials = self.credentials(access_token, account_id, is_demo);
        let positions = self
            .pool()
            .with_connection_retry(&credentials, false, |connection| async move {
                fetch_open_positions(&connection, account_id).await
            })
            .await?;
        Ok(positions.iter().filter_map(map_position).collect())
    }

    /// The full symbol catalog.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream cannot be reached or replies with
    /// an error payload.
    pub async fn symbol_catalog(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
    ) -> Result<Vec<SymbolInfo>, FacadeError> {
        let credentials = self.credentials(access_token, account_id, is_demo);
        let symbols = self
            .pool()
            .with_connection_retry(&credentials, false, |connection| async move {
                fetch_catalog(&connection, account_id).await
            })
            .await?;
        Ok(symbols.iter().map(map_symbol).collect())
    }

    /// Resolve a symbol name to its numeric id via the catalog.
    ///
    /// Callers that already hold the numeric id skip this entirely.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::SymbolNotFound`] when the name is not in the
    /// catalog.
    pub async fn symbol_id_by_name(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
        symbol_name: &str,
    ) -> Result<i64, FacadeError> {
        let catalog = self
            .symbol_catalog(access_token, account_id, is_demo)
            .await?;
        catalog
            .iter()
            .find(|symbol| symbol.name.eq_ignore_ascii_case(symbol_name))
            .map(|symbol| symbol.symbol_id)
            .ok_or_else(|| FacadeError::SymbolNotFound {
                symbol: symbol_name.to_string(),
            })
    }

    /// Real-time quote for a symbol, by id or by name.
    ///
    /// # Errors
    ///
    /// Returns an error when neither id nor name is given, the name cannot
    /// be resolved, or the connection fails before the wait begins. Market
    /// silence resolves to a flagged result, not an error.
    pub async fn quote(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
        symbol_id: Option<i64>,
        symbol_name: Option<&str>,
    ) -> Result<QuoteResult, FacadeError> {
        let symbol_id = self
            .resolve_symbol(access_token, account_id, is_demo, symbol_id, symbol_name)
            .await?;

        let credentials = self.credentials(access_token, account_id, is_demo);
        let result = self
            .pool()
            .with_connection_retry(&credentials, false, |connection| async move {
                connection.quote(symbol_id).await
            })
            .await?;
        Ok(result)
    }

    /// Place a market order.
    ///
    /// Order placement is never retried on connection loss: the in-flight
    /// message cannot be cancelled, and a replay could execute twice.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid side or size, unresolvable symbol, or an
    /// upstream rejection.
    pub async fn place_market_order(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
        symbol_id: Option<i64>,
        symbol_name: Option<&str>,
        side: &str,
        size: Decimal,
    ) -> Result<OrderReceipt, FacadeError> {
        let direction =
            TradeDirection::from_name(side).ok_or_else(|| FacadeError::InvalidRequest {
                message: format!("unknown side: {side}"),
            })?;
        let volume = volume_to_upstream(size).ok_or_else(|| FacadeError::InvalidRequest {
            message: "size must be a positive multiple of 0.01".to_string(),
        })?;
        let symbol_id = self
            .resolve_symbol(access_token, account_id, is_demo, symbol_id, symbol_name)
            .await?;

        let credentials = self.credentials(access_token, account_id, is_demo);
        let receipt = self
            .pool()
            .with_connection(&credentials, false, |connection| async move {
                let request = Payload::NewOrderReq(NewOrderReq {
                    ctid_trader_account_id: account_id,
                    symbol_id,
                    order_type: OrderType::Market as i32,
                    trade_side: match direction {
                        TradeDirection::Buy => TradeSide::Buy as i32,
                        TradeDirection::Sell => TradeSide::Sell as i32,
                    },
                    volume,
                });
                let reply = connection.send_request(request).await?;
                match reply.payload {
                    Payload::ExecutionEvent(event) => build_receipt(event),
                    other => Err(unexpected("execution event", &other)),
                }
            })
            .await?;
        Ok(receipt)
    }

    /// Accounts visible to an access token.
    ///
    /// Runs on an application-authenticated connection; no account binding
    /// exists yet when callers use this to discover their accounts.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream cannot be reached or replies with
    /// an error payload.
    pub async fn accounts_by_token(
        &self,
        access_token: &str,
        is_demo: bool,
    ) -> Result<Vec<TradingAccount>, FacadeError> {
        let credentials = self.credentials(access_token, 0, is_demo);
        let token = access_token.to_string();

        let accounts = self
            .pool()
            .with_connection_retry(&credentials, true, |connection| {
                let token = token.clone();
                async move {
                    let request =
                        Payload::GetAccountsByAccessTokenReq(GetAccountsByAccessTokenReq {
                            access_token: token,
                        });
                    let reply = connection.send_request(request).await?;
                    match reply.payload {
                        Payload::GetAccountsByAccessTokenRes(res) => Ok(res.ctid_trader_account),
                        other => Err(unexpected("accounts response", &other)),
                    }
                }
            })
            .await?;

        Ok(accounts
            .iter()
            .map(|account| TradingAccount {
                account_id: account.ctid_trader_account_id,
                is_live: account.is_live.unwrap_or(false),
                trader_login: account.trader_login,
            })
            .collect())
    }

    /// Historical bars for a symbol over a time range.
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown period name, an empty range, or an
    /// upstream failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn historical_bars(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
        symbol_id: i64,
        period: &str,
        from_timestamp: i64,
        to_timestamp: i64,
        count: Option<u32>,
    ) -> Result<Vec<Bar>, FacadeError> {
        let period =
            TrendbarPeriod::from_name(period).ok_or_else(|| FacadeError::InvalidRequest {
                message: format!("unknown period: {period}"),
            })?;
        if to_timestamp <= from_timestamp {
            return Err(FacadeError::InvalidRequest {
                message: "toTimestamp must be after fromTimestamp".to_string(),
            });
        }

        let credentials = self.credentials(access_token, account_id, is_demo);
        let bars = self
            .pool()
            .with_connection_retry(&credentials, false, |connection| async move {
                let request = Payload::GetTrendbarsReq(GetTrendbarsReq {
                    ctid_trader_account_id: account_id,
                    from_timestamp,
                    to_timestamp,
                    period: period as i32,
                    symbol_id,
                    count,
                });
                let reply = connection.send_request(request).await?;
                match reply.payload {
                    Payload::GetTrendbarsRes(res) => Ok(res.trendbar),
                    other => Err(unexpected("trendbars response", &other)),
                }
            })
            .await?;

        Ok(bars.iter().filter_map(map_bar).collect())
    }

    /// Resolve a symbol id from either an explicit id or a name.
    async fn resolve_symbol(
        &self,
        access_token: &str,
        account_id: i64,
        is_demo: bool,
        symbol_id: Option<i64>,
        symbol_name: Option<&str>,
    ) -> Result<i64, FacadeError> {
        match (symbol_id, symbol_name) {
            (Some(id), _) => Ok(id),
            (None, Some(name)) => {
                self.symbol_id_by_name(access_token, account_id, is_demo, name)
                    .await
            }
            (None, None) => Err(FacadeError::InvalidRequest {
                message: "symbolId or symbolName is required".to_string(),
            }),
        }
    }
}

/// Fetch account details.
async fn fetch_trader(
    connection: &Connection,
    account_id: i64,
) -> Result<Trader, ConnectionError> {
    let reply = connection
        .send_request(Payload::TraderReq(TraderReq {
            ctid_trader_account_id: account_id,
        }))
        .await?;
    match reply.payload {
        Payload::TraderRes(res) => res.trader.ok_or(ConnectionError::Decode {
            payload_type: codes::TRADER_RES,
            message: "missing trader field".to_string(),
        }),
        other => Err(unexpected("trader response", &other)),
    }
}

/// Fetch open positions via reconcile.
async fn fetch_open_positions(
    connection: &Connection,
    account_id: i64,
) -> Result<Vec<Position>, ConnectionError> {
    let reply = connection
        .send_request(Payload::ReconcileReq(ReconcileReq {
            ctid_trader_account_id: account_id,
        }))
        .await?;
    match reply.payload {
        Payload::ReconcileRes(res) => Ok(res
            .position
            .into_iter()
            .filter(|position| position.position_status == PositionStatus::Open as i32)
            .collect()),
        other => Err(unexpected("reconcile response", &other)),
    }
}

/// Fetch the symbol catalog.
async fn fetch_catalog(
    connection: &Connection,
    account_id: i64,
) -> Result<Vec<LightSymbol>, ConnectionError> {
    let reply = connection
        .send_request(Payload::SymbolsListReq(SymbolsListReq {
            ctid_trader_account_id: account_id,
            include_archived_symbols: Some(false),
        }))
        .await?;
    match reply.payload {
        Payload::SymbolsListRes(res) => Ok(res.symbol),
        other => Err(unexpected("symbols response", &other)),
    }
}

fn unexpected(expected: &'static str, payload: &Payload) -> ConnectionError {
    ConnectionError::UnexpectedPayload {
        expected,
        actual: payload.payload_type(),
    }
}

/// Equity is balance plus the sum of unrealized P&L across open positions;
/// all monetary inputs arrive in minor units.
fn build_snapshot(account_id: i64, trader: &Trader, positions: &[Position]) -> AccountSnapshot {
    let pnl_minor: i64 = positions
        .iter()
        .map(|position| position.unrealized_pnl.unwrap_or(0))
        .sum();

    AccountSnapshot {
        account_id,
        balance: money_from_minor(trader.balance),
        equity: money_from_minor(trader.balance + pnl_minor),
        open_positions: positions.len(),
    }
}

/// Map a wire position into the facade shape. Positions without trade data
/// or with an unknown side are dropped.
fn map_position(position: &Position) -> Option<PositionInfo> {
    let trade_data = position.trade_data.as_ref()?;
    let direction = match TradeSide::try_from(trade_data.trade_side) {
        Ok(TradeSide::Buy) => TradeDirection::Buy,
        Ok(TradeSide::Sell) => TradeDirection::Sell,
        Err(_) => return None,
    };

    Some(PositionInfo {
        position_id: position.position_id,
        symbol_id: trade_data.symbol_id,
        direction,
        volume: volume_from_upstream(trade_data.volume),
        entry_price: position.price.and_then(|price| Decimal::try_from(price).ok()),
        swap: money_from_minor(position.swap),
        unrealized_pnl: money_from_minor(position.unrealized_pnl.unwrap_or(0)),
        opened_at: trade_data.open_timestamp.and_then(millis_to_datetime),
    })
}

fn map_symbol(symbol: &LightSymbol) -> SymbolInfo {
    SymbolInfo {
        symbol_id: symbol.symbol_id,
        name: symbol.symbol_name.clone().unwrap_or_default(),
        enabled: symbol.enabled.unwrap_or(false),
        description: symbol.description.clone(),
    }
}

/// Convert an execution event into an order receipt, surfacing rejections
/// as upstream errors.
fn build_receipt(event: ExecutionEvent) -> Result<OrderReceipt, ConnectionError> {
    if let Some(code) = &event.error_code {
        if !code.is_empty() {
            return Err(ConnectionError::Upstream {
                code: code.clone(),
                description: "order rejected".to_string(),
            });
        }
    }
    if event.execution_type == ExecutionType::OrderRejected as i32 {
        return Err(ConnectionError::Upstream {
            code: "ORDER_REJECTED".to_string(),
            description: "order rejected".to_string(),
        });
    }

    let filled = event.execution_type == ExecutionType::OrderFilled as i32
        || event.execution_type == ExecutionType::OrderPartialFill as i32;
    let executed_price = event
        .deal
        .as_ref()
        .and_then(|deal| deal.execution_price)
        .or_else(|| event.order.as_ref().and_then(|order| order.execution_price))
        .and_then(|price| Decimal::try_from(price).ok());

    Ok(OrderReceipt {
        order_id: event.order.as_ref().map(|order| order.order_id),
        position_id: event
            .deal
            .as_ref()
            .map(|deal| deal.position_id)
            .or_else(|| event.position.as_ref().map(|position| position.position_id)),
        filled,
        executed_price,
    })
}

/// Decode one delta-encoded bar. Bars missing their low or timestamp are
/// dropped.
fn map_bar(bar: &Trendbar) -> Option<Bar> {
    let low = bar.low?;
    let minutes = bar.utc_timestamp_in_minutes?;
    let timestamp = Utc
        .timestamp_opt(i64::from(minutes) * 60, 0)
        .single()?;

    Some(Bar {
        timestamp,
        open: bar_price(low, bar.delta_open),
        high: bar_price(low, bar.delta_high),
        low: bar_price(low, None),
        close: bar_price(low, bar.delta_close),
        volume: bar.volume,
    })
}

#[allow(clippy::cast_possible_wrap)]
fn bar_price(low: i64, delta: Option<u64>) -> Decimal {
    Decimal::new(low + delta.unwrap_or(0) as i64, SPOT_PRICE_DIGITS)
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
