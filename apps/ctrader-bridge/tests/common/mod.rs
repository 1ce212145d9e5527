//! In-process mock broker speaking the length-framed wire protocol.
//!
//! Binds to an ephemeral port and answers the handshake, account, symbol,
//! subscription, order, and trendbar requests the bridge sends. Behavior
//! toggles let tests inject malformed payloads, order rejections, and
//! out-of-band socket drops.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use prost::Message as _;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use ctrader_bridge::domain::Credentials;
use ctrader_bridge::infrastructure::config::{ConnectionSettings, EndpointSettings, PoolSettings};
use ctrader_bridge::infrastructure::openapi::codec::{self, InboundMessage, Payload};
use ctrader_bridge::infrastructure::openapi::messages::{
    AccountAuthRes, ApplicationAuthRes, CtidTraderAccount, Deal, ExecutionEvent, ExecutionType,
    GetAccountsByAccessTokenRes, GetTrendbarsRes, LightSymbol, OaErrorRes, Order, OrderStatus,
    Position, ProtoMessage, ReconcileRes, SpotEvent, SubscribeSpotsRes, SymbolsListRes, Trader,
    TraderRes, TradeData, Trendbar, TrendbarPeriod, UnsubscribeSpotsRes, VersionRes,
};
use ctrader_bridge::infrastructure::openapi::payload_type::codes;
use ctrader_bridge::{Environment, QuoteCache};

type SharedSink = Arc<tokio::sync::Mutex<SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>>>;

/// A scheduled spot push for one symbol.
#[derive(Debug, Clone)]
pub struct SpotPlan {
    /// Bid price, scaled by 100000.
    pub bid: Option<u64>,
    /// Ask price, scaled by 100000.
    pub ask: Option<u64>,
    /// Delay after the subscribe before the push is sent.
    pub delay: Duration,
}

/// Shared broker state, mutable from tests.
#[derive(Default)]
pub struct BrokerState {
    /// Sockets accepted since start.
    pub connections_accepted: AtomicUsize,
    /// Subscribe-to-spots requests received.
    pub subscribe_requests: AtomicUsize,
    /// Unsubscribe requests received.
    pub unsubscribe_requests: AtomicUsize,
    /// Heartbeat frames received.
    pub heartbeats: AtomicUsize,
    /// Wire volume of the last new-order request.
    pub last_order_volume: AtomicI64,
    /// Account balance in minor units.
    pub balance_minor: AtomicI64,
    /// Open positions returned by reconcile.
    pub positions: Mutex<Vec<Position>>,
    /// Symbol catalog.
    pub symbols: Mutex<Vec<LightSymbol>>,
    /// Accounts returned for any access token.
    pub accounts: Mutex<Vec<CtidTraderAccount>>,
    /// Bars returned for any trendbar request.
    pub bars: Mutex<Vec<Trendbar>>,
    /// Scheduled spot pushes per symbol.
    pub spot_plans: Mutex<HashMap<i64, SpotPlan>>,
    /// Answer the next trader request with undecodable bytes.
    pub malformed_trader_res: AtomicBool,
    /// Send undecodable bytes instead of each scheduled spot push.
    pub garbage_spot: AtomicBool,
    /// Reject new orders with this upstream error code.
    pub order_rejection: Mutex<Option<String>>,
    /// Cancellation handles for accepted sockets.
    connection_tokens: Mutex<Vec<CancellationToken>>,
}

/// The mock broker server.
#[derive(Clone)]
pub struct MockBroker {
    addr: SocketAddr,
    state: Arc<BrokerState>,
}

impl MockBroker {
    /// Bind to an ephemeral port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(BrokerState {
            balance_minor: AtomicI64::new(1_000_000),
            symbols: Mutex::new(default_symbols()),
            ..Default::default()
        });

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accept_state
                    .connections_accepted
                    .fetch_add(1, Ordering::SeqCst);
                let conn_state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    handle_connection(stream, conn_state).await;
                });
            }
        });

        Self { addr, state }
    }

    /// The broker's listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared state for assertions and behavior toggles.
    pub fn state(&self) -> &Arc<BrokerState> {
        &self.state
    }

    /// Schedule a spot push for a symbol, sent after the subscribe.
    pub fn plan_spot(&self, symbol_id: i64, bid: Option<u64>, ask: Option<u64>, delay: Duration) {
        self.state
            .spot_plans
            .lock()
            .insert(symbol_id, SpotPlan { bid, ask, delay });
    }

    /// Close every accepted socket out-of-band.
    pub fn drop_connections(&self) {
        for token in self.state.connection_tokens.lock().drain(..) {
            token.cancel();
        }
    }

    /// Sockets accepted since start.
    pub fn connections_accepted(&self) -> usize {
        self.state.connections_accepted.load(Ordering::SeqCst)
    }

    /// Subscribe requests received since start.
    pub fn subscribe_requests(&self) -> usize {
        self.state.subscribe_requests.load(Ordering::SeqCst)
    }

    /// Heartbeat frames received since start.
    pub fn heartbeats(&self) -> usize {
        self.state.heartbeats.load(Ordering::SeqCst)
    }
}

/// Connection settings tuned for fast tests.
pub fn test_connection_settings() -> ConnectionSettings {
    ConnectionSettings {
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
        heartbeat_interval: Duration::from_millis(200),
        wait_heartbeat_interval: Duration::from_millis(50),
        subscribe_wait: Duration::from_millis(500),
        resubscribe_wait: Duration::from_millis(250),
        max_frame_bytes: 1024 * 1024,
    }
}

/// Endpoints pointing both environments at the mock broker.
pub fn endpoints_for(broker: &MockBroker) -> EndpointSettings {
    let addr = broker.addr();
    EndpointSettings {
        demo_host: addr.ip().to_string(),
        demo_port: addr.port(),
        live_host: addr.ip().to_string(),
        live_port: addr.port(),
    }
}

/// Credentials for the default test account.
pub fn test_credentials() -> Credentials {
    Credentials {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        access_token: "test-token".to_string(),
        account_id: 42,
        environment: Environment::Demo,
    }
}

/// A connection pool wired to the mock broker.
pub fn pool_for(
    broker: &MockBroker,
    pool_settings: PoolSettings,
) -> ctrader_bridge::ConnectionPool {
    ctrader_bridge::ConnectionPool::new(
        endpoints_for(broker),
        test_connection_settings(),
        pool_settings,
        Arc::new(QuoteCache::new()),
        Arc::new(QuoteCache::new()),
    )
}

/// A bridge wired to the mock broker.
pub fn bridge_for(broker: &MockBroker) -> ctrader_bridge::Bridge {
    ctrader_bridge::Bridge::new(ctrader_bridge::BridgeConfig {
        credentials: ctrader_bridge::AppCredentials::new(
            "test-client".to_string(),
            "test-secret".to_string(),
        ),
        endpoints: endpoints_for(broker),
        connection: test_connection_settings(),
        pool: PoolSettings::default(),
        server: ctrader_bridge::ServerSettings::default(),
    })
}

fn default_symbols() -> Vec<LightSymbol> {
    vec![
        LightSymbol {
            symbol_id: 1,
            symbol_name: Some("EURUSD".to_string()),
            enabled: Some(true),
            description: Some("Euro vs US Dollar".to_string()),
        },
        LightSymbol {
            symbol_id: 2,
            symbol_name: Some("GBPUSD".to_string()),
            enabled: Some(true),
            description: None,
        },
    ]
}

/// An open buy position for reconcile responses.
pub fn open_position(position_id: i64, symbol_id: i64, volume: i64, pnl: i64) -> Position {
    Position {
        position_id,
        trade_data: Some(TradeData {
            symbol_id,
            volume,
            trade_side: 1,
            open_timestamp: Some(1_700_000_000_000),
        }),
        position_status: 1,
        swap: 0,
        price: Some(1.1),
        unrealized_pnl: Some(pnl),
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<BrokerState>) {
    let framed = Framed::new(stream, codec::frame_codec(1024 * 1024));
    let (sink, mut source) = framed.split();
    let sink: SharedSink = Arc::new(tokio::sync::Mutex::new(sink));
    let mut subscribed: HashSet<i64> = HashSet::new();

    let token = CancellationToken::new();
    state.connection_tokens.lock().push(token.clone());

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            frame = source.next() => {
                let Some(Ok(frame)) = frame else { break };
                let Ok(message) = codec::decode(&frame) else { continue };
                handle_message(message, &sink, &state, &mut subscribed).await;
            }
        }
    }
}

async fn handle_message(
    message: InboundMessage,
    sink: &SharedSink,
    state: &Arc<BrokerState>,
    subscribed: &mut HashSet<i64>,
) {
    let correlation = message.correlation_id.clone();
    let correlation = correlation.as_deref();

    match message.payload {
        Payload::Heartbeat => {
            state.heartbeats.fetch_add(1, Ordering::SeqCst);
        }
        Payload::VersionReq(_) => {
            send(
                sink,
                &Payload::VersionRes(VersionRes {
                    version: "2.0".to_string(),
                }),
                correlation,
            )
            .await;
        }
        Payload::ApplicationAuthReq(_) => {
            send(
                sink,
                &Payload::ApplicationAuthRes(ApplicationAuthRes {}),
                correlation,
            )
            .await;
        }
        Payload::AccountAuthReq(req) => {
            send(
                sink,
                &Payload::AccountAuthRes(AccountAuthRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                }),
                correlation,
            )
            .await;
        }
        Payload::TraderReq(req) => {
            if state.malformed_trader_res.swap(false, Ordering::SeqCst) {
                send_raw(
                    sink,
                    codes::TRADER_RES,
                    vec![0xff, 0xff, 0xff, 0xff],
                    message.correlation_id,
                )
                .await;
                return;
            }
            let balance = state.balance_minor.load(Ordering::SeqCst);
            send(
                sink,
                &Payload::TraderRes(TraderRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                    trader: Some(Trader {
                        ctid_trader_account_id: req.ctid_trader_account_id,
                        balance,
                    }),
                }),
                correlation,
            )
            .await;
        }
        Payload::ReconcileReq(req) => {
            let position = state.positions.lock().clone();
            send(
                sink,
                &Payload::ReconcileRes(ReconcileRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                    position,
                }),
                correlation,
            )
            .await;
        }
        Payload::SymbolsListReq(req) => {
            let symbol = state.symbols.lock().clone();
            send(
                sink,
                &Payload::SymbolsListRes(SymbolsListRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                    symbol,
                }),
                correlation,
            )
            .await;
        }
        Payload::GetAccountsByAccessTokenReq(_) => {
            let ctid_trader_account = state.accounts.lock().clone();
            send(
                sink,
                &Payload::GetAccountsByAccessTokenRes(GetAccountsByAccessTokenRes {
                    ctid_trader_account,
                }),
                correlation,
            )
            .await;
        }
        Payload::SubscribeSpotsReq(req) => {
            state.subscribe_requests.fetch_add(1, Ordering::SeqCst);

            let symbol_id = req.symbol_id.first().copied().unwrap_or_default();
            if !subscribed.insert(symbol_id) {
                send(
                    sink,
                    &Payload::OaError(OaErrorRes {
                        ctid_trader_account_id: Some(req.ctid_trader_account_id),
                        error_code: "ALREADY_SUBSCRIBED".to_string(),
                        description: Some("symbol already subscribed".to_string()),
                    }),
                    correlation,
                )
                .await;
                return;
            }

            send(
                sink,
                &Payload::SubscribeSpotsRes(SubscribeSpotsRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                }),
                correlation,
            )
            .await;

            let plan = state.spot_plans.lock().get(&symbol_id).cloned();
            if let Some(plan) = plan {
                let sink = Arc::clone(sink);
                let account_id = req.ctid_trader_account_id;
                let garbage = state.garbage_spot.load(Ordering::SeqCst);
                tokio::spawn(async move {
                    tokio::time::sleep(plan.delay).await;
                    if garbage {
                        send_raw(&sink, codes::SPOT_EVENT, vec![0xff, 0xff, 0xff], None).await;
                        return;
                    }
                    send(
                        &sink,
                        &Payload::SpotEvent(SpotEvent {
                            ctid_trader_account_id: account_id,
                            symbol_id,
                            bid: plan.bid,
                            ask: plan.ask,
                            timestamp: Some(1_700_000_000_000),
                        }),
                        None,
                    )
                    .await;
                });
            }
        }
        Payload::UnsubscribeSpotsReq(req) => {
            state.unsubscribe_requests.fetch_add(1, Ordering::SeqCst);
            for symbol_id in &req.symbol_id {
                subscribed.remove(symbol_id);
            }
            send(
                sink,
                &Payload::UnsubscribeSpotsRes(UnsubscribeSpotsRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                }),
                correlation,
            )
            .await;
        }
        Payload::NewOrderReq(req) => {
            state
                .last_order_volume
                .store(req.volume, Ordering::SeqCst);

            let rejection = state.order_rejection.lock().clone();
            if let Some(code) = rejection {
                send(
                    sink,
                    &Payload::OaError(OaErrorRes {
                        ctid_trader_account_id: Some(req.ctid_trader_account_id),
                        error_code: code,
                        description: Some("order rejected".to_string()),
                    }),
                    correlation,
                )
                .await;
                return;
            }

            send(
                sink,
                &Payload::ExecutionEvent(ExecutionEvent {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                    execution_type: ExecutionType::OrderFilled as i32,
                    position: None,
                    order: Some(Order {
                        order_id: 1001,
                        trade_data: Some(TradeData {
                            symbol_id: req.symbol_id,
                            volume: req.volume,
                            trade_side: req.trade_side,
                            open_timestamp: None,
                        }),
                        order_type: req.order_type,
                        order_status: OrderStatus::Filled as i32,
                        execution_price: Some(1.2345),
                    }),
                    deal: Some(Deal {
                        deal_id: 2001,
                        order_id: 1001,
                        position_id: 3001,
                        volume: req.volume,
                        execution_price: Some(1.2345),
                    }),
                    error_code: None,
                }),
                correlation,
            )
            .await;
        }
        Payload::GetTrendbarsReq(req) => {
            let trendbar = state.bars.lock().clone();
            send(
                sink,
                &Payload::GetTrendbarsRes(GetTrendbarsRes {
                    ctid_trader_account_id: req.ctid_trader_account_id,
                    period: req.period,
                    trendbar,
                    symbol_id: Some(req.symbol_id),
                }),
                correlation,
            )
            .await;
        }
        _ => {}
    }
}

async fn send(sink: &SharedSink, payload: &Payload, correlation_id: Option<&str>) {
    let bytes = codec::encode(payload, correlation_id);
    let _ = sink.lock().await.send(bytes).await;
}

async fn send_raw(
    sink: &SharedSink,
    payload_type: u32,
    body: Vec<u8>,
    correlation_id: Option<String>,
) {
    let envelope = ProtoMessage {
        payload_type,
        payload: Some(body),
        client_msg_id: correlation_id,
    };
    let _ = sink
        .lock()
        .await
        .send(Bytes::from(envelope.encode_to_vec()))
        .await;
}

/// A one-minute bar for trendbar responses.
pub fn sample_bar(low: i64, minutes: u32) -> Trendbar {
    Trendbar {
        volume: 100,
        period: Some(TrendbarPeriod::M1 as i32),
        low: Some(low),
        delta_open: Some(10),
        delta_close: Some(20),
        delta_high: Some(30),
        utc_timestamp_in_minutes: Some(minutes),
    }
}
