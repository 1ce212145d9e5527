//! One authenticated upstream connection.
//!
//! A connection owns a single framed TCP socket and drives it with three
//! background tasks: a writer draining an outbound channel, a reader
//! dispatching inbound frames, and a fixed-interval heartbeat. All pending
//! request bookkeeping happens on the reader task or under short-lived
//! locks, so no two operations on the same connection race each other.
//!
//! Handshake ordering is mandatory: application authentication completes
//! before account authentication, and account authentication completes
//! before any trading, account, or price request. Version, auth, and
//! heartbeat messages are the only ones exempt from that gate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::codec::{self, CodecError, InboundMessage, Payload};
use super::messages::{
    AccountAuthReq, ApplicationAuthReq, SubscribeSpotsReq, UnsubscribeSpotsReq, VersionReq,
};
use crate::domain::{Credentials, QuoteCache, QuoteResult, price_from_spot};
use crate::infrastructure::config::ConnectionSettings;

/// Capacity of the outbound frame channel.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Connection-level failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Establishing the TCP connection failed.
    #[error("connect failed: {message}")]
    ConnectFailed {
        /// Description of the failure.
        message: String,
    },

    /// The connection is not open.
    #[error("connection is not open")]
    NotConnected,

    /// The operation was attempted before the required handshake step.
    #[error("operation requires {required} authentication")]
    NotAuthenticated {
        /// The missing handshake step.
        required: &'static str,
    },

    /// The request was not answered within its timeout.
    #[error("request timed out: {operation}")]
    Timeout {
        /// Description of the timed-out operation.
        operation: String,
    },

    /// The socket closed; all pending requests are rejected with this.
    #[error("connection closed: {reason}")]
    Closed {
        /// Why the connection closed.
        reason: String,
    },

    /// The upstream answered with an error payload.
    #[error("upstream error {code}: {description}")]
    Upstream {
        /// Machine-readable upstream error code.
        code: String,
        /// Human-readable description.
        description: String,
    },

    /// A critical payload could not be decoded.
    #[error("decode failed for payload type {payload_type}: {message}")]
    Decode {
        /// Payload type of the malformed message.
        payload_type: u32,
        /// Description of the decode failure.
        message: String,
    },

    /// The reply carried a payload the operation cannot use.
    #[error("unexpected payload type {actual}, expected {expected}")]
    UnexpectedPayload {
        /// What the operation expected.
        expected: &'static str,
        /// Payload type actually received.
        actual: u32,
    },
}

impl ConnectionError {
    /// Whether this error means the underlying socket is gone.
    ///
    /// These are the errors the pool treats as transient: eviction plus one
    /// transparent retry on a fresh connection.
    #[must_use]
    pub const fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Closed { .. } | Self::ConnectFailed { .. }
        )
    }
}

/// Connection lifecycle state.
///
/// Transitions are linear and one-directional, except `Closed`, which is
/// reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Socket open, handshake not started.
    Open,
    /// Application authentication completed.
    AppAuthenticated,
    /// Account authentication completed; fully usable.
    AccountAuthenticated,
    /// Socket gone; terminal.
    Closed,
}

impl ConnectionState {
    /// State name for logs and stats.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::AppAuthenticated => "app_authenticated",
            Self::AccountAuthenticated => "account_authenticated",
            Self::Closed => "closed",
        }
    }
}

type PendingMap = HashMap<String, oneshot::Sender<Result<InboundMessage, ConnectionError>>>;

/// One authenticated connection to the upstream.
pub struct Connection {
    credentials: Credentials,
    settings: ConnectionSettings,
    state: Arc<RwLock<ConnectionState>>,
    pending: Arc<Mutex<PendingMap>>,
    outbound_tx: mpsc::Sender<Bytes>,
    subscribed: Mutex<HashSet<i64>>,
    quotes: Arc<QuoteCache>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Open a socket, spawn the I/O tasks, and run the handshake.
    ///
    /// With `skip_account_auth` the handshake stops after application
    /// authentication; the connection can then only serve operations that
    /// need no account binding.
    ///
    /// # Errors
    ///
    /// Returns an error when the TCP connect or any handshake step fails.
    pub async fn connect(
        credentials: Credentials,
        host: &str,
        port: u16,
        settings: ConnectionSettings,
        quotes: Arc<QuoteCache>,
        skip_account_auth: bool,
    ) -> Result<Arc<Self>, ConnectionError> {
        tracing::debug!(
            host,
            port,
            environment = credentials.environment.as_str(),
            account_id = credentials.account_id,
            "Connecting to upstream"
        );

        let state = Arc::new(RwLock::new(ConnectionState::Connecting));
        let stream = timeout(settings.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ConnectionError::Timeout {
                operation: "connect".to_string(),
            })?
            .map_err(|e| ConnectionError::ConnectFailed {
                message: e.to_string(),
            })?;

        let framed = Framed::new(stream, codec::frame_codec(settings.max_frame_bytes));
        let (sink, source) = framed.split();

        *state.write() = ConnectionState::Open;
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_writer(
            sink,
            outbound_rx,
            Arc::clone(&state),
            Arc::clone(&pending),
            shutdown.clone(),
        ));
        tokio::spawn(run_reader(
            source,
            Arc::clone(&state),
            Arc::clone(&pending),
            Arc::clone(&quotes),
            shutdown.clone(),
        ));
        tokio::spawn(run_heartbeat(
            outbound_tx.clone(),
            settings.heartbeat_interval,
            shutdown.clone(),
        ));

        let connection = Arc::new(Self {
            credentials,
            settings,
            state,
            pending,
            outbound_tx,
            subscribed: Mutex::new(HashSet::new()),
            quotes,
            shutdown,
        });

        connection.handshake(skip_account_auth).await?;
        Ok(connection)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the socket is open (handshake state notwithstanding).
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Open
                | ConnectionState::AppAuthenticated
                | ConnectionState::AccountAuthenticated
        )
    }

    /// Whether the connection is usable.
    ///
    /// Usable always means the socket is open and application
    /// authentication succeeded; `require_account_auth` additionally
    /// demands the account binding.
    #[must_use]
    pub fn is_healthy(&self, require_account_auth: bool) -> bool {
        match self.state() {
            ConnectionState::AccountAuthenticated => true,
            ConnectionState::AppAuthenticated => !require_account_auth,
            _ => false,
        }
    }

    /// The credentials this connection was built for.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Symbols this connection has subscribed to.
    ///
    /// Subscriptions are tracked per connection, not globally; they do not
    /// survive connection teardown.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<i64> {
        self.subscribed.lock().iter().copied().collect()
    }

    /// Close the connection, rejecting all pending requests.
    pub fn close(&self, reason: &str) {
        close_with_reason(&self.state, &self.pending, &self.shutdown, reason);
    }

    /// Send a request and wait for the correlated reply.
    ///
    /// Every request carries a fresh correlation id and an independent
    /// timeout. Expiry rejects locally; the in-flight network message is not
    /// cancelled, and a late reply is discarded unmatched.
    ///
    /// # Errors
    ///
    /// Returns an error on gate violations, timeout, socket close, upstream
    /// error replies, and critical decode failures.
    pub async fn send_request(
        &self,
        payload: Payload,
    ) -> Result<InboundMessage, ConnectionError> {
        gate_allows(self.state(), &payload)?;

        let payload_type = payload.payload_type();
        let correlation_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(correlation_id.clone(), tx);

        let frame = codec::encode(&payload, Some(&correlation_id));
        if self.outbound_tx.send(frame).await.is_err() {
            self.pending.lock().remove(&correlation_id);
            return Err(ConnectionError::Closed {
                reason: "writer task stopped".to_string(),
            });
        }

        match timeout(self.settings.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConnectionError::Closed {
                reason: "reply channel dropped".to_string(),
            }),
            Err(_) => {
                self.pending.lock().remove(&correlation_id);
                Err(ConnectionError::Timeout {
                    operation: format!("payload type {payload_type}"),
                })
            }
        }
    }

    /// Look up a real-time quote, subscribing when necessary.
    ///
    /// A fresh, fully populated cache entry short-circuits without any
    /// network call. A symbol this connection already subscribed is never
    /// resubscribed (the upstream rejects that and can terminate the
    /// socket); instead the cache is polled for a short window. Market
    /// silence and mid-wait socket drops resolve to flagged results, not
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket is not open or the subscribe
    /// request itself fails.
    pub async fn quote(&self, symbol_id: i64) -> Result<QuoteResult, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::NotConnected);
        }

        if let Some(quote) = self.quotes.get(symbol_id) {
            if quote.is_fresh() {
                return Ok(QuoteResult::live(quote));
            }
        }

        let already_subscribed = self.subscribed.lock().contains(&symbol_id);
        let window = if already_subscribed {
            self.settings.resubscribe_wait
        } else {
            let request = Payload::SubscribeSpotsReq(SubscribeSpotsReq {
                ctid_trader_account_id: self.credentials.account_id,
                symbol_id: vec![symbol_id],
            });
            match self.send_request(request).await {
                Ok(_) => {
                    self.subscribed.lock().insert(symbol_id);
                }
                // A subscription race is a no-op, not a failure.
                Err(ConnectionError::Upstream { code, .. })
                    if code.contains("ALREADY_SUBSCRIBED") =>
                {
                    self.subscribed.lock().insert(symbol_id);
                }
                Err(e) => return Err(e),
            }
            self.settings.subscribe_wait
        };

        Ok(self.await_quote(symbol_id, window).await)
    }

    /// Drop this connection's subscription for a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when the unsubscribe request fails.
    pub async fn unsubscribe_spots(&self, symbol_id: i64) -> Result<(), ConnectionError> {
        if !self.subscribed.lock().contains(&symbol_id) {
            return Ok(());
        }

        let request = Payload::UnsubscribeSpotsReq(UnsubscribeSpotsReq {
            ctid_trader_account_id: self.credentials.account_id,
            symbol_id: vec![symbol_id],
        });
        self.send_request(request).await?;
        self.subscribed.lock().remove(&symbol_id);
        Ok(())
    }

    /// Wait for the cache to hold a fresh quote, with a hard ceiling.
    ///
    /// Races three independent events: a cache-update notification, the
    /// ceiling timer, and a heartbeat ticker on a sub-interval shorter than
    /// the upstream idle timeout. The heartbeat cadence is independent of
    /// the poll cadence; long waits alone must not let the upstream close
    /// the socket.
    async fn await_quote(&self, symbol_id: i64, window: Duration) -> QuoteResult {
        let deadline = tokio::time::Instant::now() + window;
        let mut heartbeat = tokio::time::interval(self.settings.wait_heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // An interval's first tick completes immediately; consume it.
        heartbeat.tick().await;

        loop {
            let updated = self.quotes.notified();

            if let Some(quote) = self.quotes.get(symbol_id) {
                if quote.is_fresh() {
                    return QuoteResult::live(quote);
                }
            }
            if !self.is_open() {
                return QuoteResult::connection_lost(symbol_id, self.quotes.get(symbol_id));
            }

            tokio::select! {
                () = updated => {}
                _ = heartbeat.tick() => {
                    self.send_heartbeat().await;
                }
                () = tokio::time::sleep_until(deadline) => {
                    return match self.quotes.get(symbol_id) {
                        Some(quote) => QuoteResult::stale(quote),
                        None => QuoteResult::market_closed(symbol_id),
                    };
                }
                () = self.shutdown.cancelled() => {
                    return QuoteResult::connection_lost(symbol_id, self.quotes.get(symbol_id));
                }
            }
        }
    }

    /// Queue a heartbeat frame.
    async fn send_heartbeat(&self) {
        let frame = codec::encode(&Payload::Heartbeat, None);
        if self.outbound_tx.send(frame).await.is_err() {
            tracing::debug!("Heartbeat skipped, writer stopped");
        }
    }

    /// Run the version exchange and authentication handshake.
    async fn handshake(&self, skip_account_auth: bool) -> Result<(), ConnectionError> {
        let reply = self
            .send_request(Payload::VersionReq(VersionReq {}))
            .await?;
        if let Payload::VersionRes(version) = &reply.payload {
            tracing::debug!(version = %version.version, "Upstream protocol version");
        }

        let reply = self
            .send_request(Payload::ApplicationAuthReq(ApplicationAuthReq {
                client_id: self.credentials.client_id.clone(),
                client_secret: self.credentials.client_secret.clone(),
            }))
            .await?;
        match reply.payload {
            Payload::ApplicationAuthRes(_) => {}
            other => {
                return Err(ConnectionError::UnexpectedPayload {
                    expected: "application auth response",
                    actual: other.payload_type(),
                });
            }
        }
        *self.state.write() = ConnectionState::AppAuthenticated;

        if skip_account_auth {
            tracing::debug!("Handshake complete (application auth only)");
            return Ok(());
        }

        let reply = self
            .send_request(Payload::AccountAuthReq(AccountAuthReq {
                ctid_trader_account_id: self.credentials.account_id,
                access_token: self.credentials.access_token.clone(),
            }))
            .await?;
        match reply.payload {
            Payload::AccountAuthRes(_) => {}
            other => {
                return Err(ConnectionError::UnexpectedPayload {
                    expected: "account auth response",
                    actual: other.payload_type(),
                });
            }
        }
        *self.state.write() = ConnectionState::AccountAuthenticated;

        tracing::info!(
            account_id = self.credentials.account_id,
            environment = self.credentials.environment.as_str(),
            "Connection authenticated"
        );
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("account_id", &self.credentials.account_id)
            .field("environment", &self.credentials.environment)
            .finish_non_exhaustive()
    }
}

/// Check the authentication gate for an outbound payload.
fn gate_allows(state: ConnectionState, payload: &Payload) -> Result<(), ConnectionError> {
    if matches!(
        state,
        ConnectionState::Disconnected | ConnectionState::Connecting | ConnectionState::Closed
    ) {
        return Err(ConnectionError::NotConnected);
    }

    match payload {
        // Exempt: these are the handshake itself plus keep-alives.
        Payload::Heartbeat | Payload::VersionReq(_) | Payload::ApplicationAuthReq(_) => Ok(()),
        Payload::AccountAuthReq(_) | Payload::GetAccountsByAccessTokenReq(_) => {
            if matches!(
                state,
                ConnectionState::AppAuthenticated | ConnectionState::AccountAuthenticated
            ) {
                Ok(())
            } else {
                Err(ConnectionError::NotAuthenticated {
                    required: "application",
                })
            }
        }
        _ => {
            if state == ConnectionState::AccountAuthenticated {
                Ok(())
            } else {
                Err(ConnectionError::NotAuthenticated { required: "account" })
            }
        }
    }
}

/// Transition to `Closed`, rejecting every pending request.
fn close_with_reason(
    state: &RwLock<ConnectionState>,
    pending: &Mutex<PendingMap>,
    shutdown: &CancellationToken,
    reason: &str,
) {
    {
        let mut state = state.write();
        if *state == ConnectionState::Closed {
            return;
        }
        *state = ConnectionState::Closed;
    }

    let drained: Vec<_> = pending.lock().drain().collect();
    if !drained.is_empty() {
        tracing::warn!(
            pending = drained.len(),
            reason,
            "Rejecting pending requests on close"
        );
    }
    for (_, tx) in drained {
        let _ = tx.send(Err(ConnectionError::Closed {
            reason: reason.to_string(),
        }));
    }

    shutdown.cancel();
}

/// Drain the outbound channel into the socket.
async fn run_writer(
    mut sink: SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>,
    mut outbound_rx: mpsc::Receiver<Bytes>,
    state: Arc<RwLock<ConnectionState>>,
    pending: Arc<Mutex<PendingMap>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        tracing::warn!(error = %e, "Failed to write frame");
                        close_with_reason(&state, &pending, &shutdown, "write failed");
                        break;
                    }
                }
                None => break,
            },
            () = shutdown.cancelled() => {
                let _ = sink.close().await;
                break;
            }
        }
    }
}

/// Read frames and dispatch them until the socket or connection dies.
async fn run_reader(
    mut source: SplitStream<Framed<TcpStream, LengthDelimitedCodec>>,
    state: Arc<RwLock<ConnectionState>>,
    pending: Arc<Mutex<PendingMap>>,
    quotes: Arc<QuoteCache>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(frame)) => {
                    if let Err(reason) = handle_frame(&frame, &pending, &quotes) {
                        close_with_reason(&state, &pending, &shutdown, &reason);
                        break;
                    }
                }
                Some(Err(e)) => {
                    close_with_reason(&state, &pending, &shutdown, &format!("read failed: {e}"));
                    break;
                }
                None => {
                    close_with_reason(&state, &pending, &shutdown, "stream ended");
                    break;
                }
            },
            () = shutdown.cancelled() => break,
        }
    }
}

/// Decode one frame and dispatch it. An `Err` closes the connection.
fn handle_frame(
    frame: &[u8],
    pending: &Mutex<PendingMap>,
    quotes: &QuoteCache,
) -> Result<(), String> {
    match codec::decode(frame) {
        Ok(message) => {
            dispatch(message, pending, quotes);
            Ok(())
        }
        Err(CodecError::CriticalPayload {
            payload_type,
            correlation_id,
            source,
        }) => {
            if let Some(id) = correlation_id {
                if let Some(tx) = pending.lock().remove(&id) {
                    let _ = tx.send(Err(ConnectionError::Decode {
                        payload_type,
                        message: source.to_string(),
                    }));
                }
            }
            Err(format!("undecodable critical payload {payload_type}: {source}"))
        }
        Err(CodecError::Envelope { source }) => Err(format!("invalid envelope: {source}")),
    }
}

/// Route an inbound message: correlated replies to their pending request,
/// unsolicited pushes to the shared stores.
fn dispatch(message: InboundMessage, pending: &Mutex<PendingMap>, quotes: &QuoteCache) {
    if let Some(id) = &message.correlation_id {
        if let Some(tx) = pending.lock().remove(id) {
            let _ = tx.send(into_reply(message));
        } else {
            tracing::debug!(
                correlation_id = %id,
                payload_type = message.payload_type,
                "Discarding late reply"
            );
        }
        return;
    }

    match message.payload {
        Payload::SpotEvent(event) => {
            let timestamp = event
                .timestamp
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .unwrap_or_else(Utc::now);
            quotes.merge(
                event.symbol_id,
                event.bid.map(price_from_spot),
                event.ask.map(price_from_spot),
                timestamp,
            );
        }
        Payload::Heartbeat => {
            tracing::trace!("Heartbeat from upstream");
        }
        Payload::ExecutionEvent(event) => {
            tracing::debug!(
                execution_type = event.execution_type,
                "Unsolicited execution event"
            );
        }
        other => {
            tracing::debug!(
                payload_type = other.payload_type(),
                "Unmatched inbound message"
            );
        }
    }
}

/// Convert a correlated reply into the pending request's result, rejecting
/// error payloads.
fn into_reply(message: InboundMessage) -> Result<InboundMessage, ConnectionError> {
    match &message.payload {
        Payload::Error(e) => Err(ConnectionError::Upstream {
            code: e.error_code.clone(),
            description: e.description.clone().unwrap_or_default(),
        }),
        Payload::OaError(e) => Err(ConnectionError::Upstream {
            code: e.error_code.clone(),
            description: e.description.clone().unwrap_or_default(),
        }),
        Payload::OrderErrorEvent(e) => Err(ConnectionError::Upstream {
            code: e.error_code.clone(),
            description: e.description.clone().unwrap_or_default(),
        }),
        _ => Ok(message),
    }
}

/// Send heartbeats on a fixed interval regardless of request traffic.
async fn run_heartbeat(
    outbound_tx: mpsc::Sender<Bytes>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let frame = codec::encode(&Payload::Heartbeat, None);
                if outbound_tx.send(frame).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;
    use crate::infrastructure::openapi::messages::{ErrorRes, TraderReq, TraderRes};
    use crate::infrastructure::openapi::payload_type::codes;

    fn trader_req() -> Payload {
        Payload::TraderReq(TraderReq {
            ctid_trader_account_id: 1,
        })
    }

    #[test]
    fn gate_rejects_requests_before_account_auth() {
        let err = gate_allows(ConnectionState::Open, &trader_req()).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::NotAuthenticated { required: "account" }
        ));

        let err = gate_allows(ConnectionState::AppAuthenticated, &trader_req()).unwrap_err();
        assert!(matches!(err, ConnectionError::NotAuthenticated { .. }));

        gate_allows(ConnectionState::AccountAuthenticated, &trader_req()).unwrap();
    }

    #[test]
    fn gate_exempts_handshake_payloads() {
        tokio_test::assert_ok!(gate_allows(
            ConnectionState::Open,
            &Payload::VersionReq(VersionReq {})
        ));
        tokio_test::assert_ok!(gate_allows(
            ConnectionState::Open,
            &Payload::ApplicationAuthReq(ApplicationAuthReq {
                client_id: String::new(),
                client_secret: String::new(),
            }),
        ));
        tokio_test::assert_ok!(gate_allows(ConnectionState::Open, &Payload::Heartbeat));
    }

    #[test]
    fn gate_orders_account_auth_after_app_auth() {
        let account_auth = Payload::AccountAuthReq(AccountAuthReq {
            ctid_trader_account_id: 1,
            access_token: String::new(),
        });

        let err = gate_allows(ConnectionState::Open, &account_auth).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::NotAuthenticated {
                required: "application"
            }
        ));
        gate_allows(ConnectionState::AppAuthenticated, &account_auth).unwrap();
    }

    #[test]
    fn gate_rejects_everything_on_closed_socket() {
        let err = gate_allows(ConnectionState::Closed, &Payload::Heartbeat).unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnected));
    }

    #[test]
    fn error_replies_reject_the_pending_request() {
        let message = InboundMessage {
            payload_type: codes::ERROR_RES,
            correlation_id: Some("corr".to_string()),
            payload: Payload::Error(ErrorRes {
                error_code: "CH_ACCESS_DENIED".to_string(),
                description: Some("bad secret".to_string()),
            }),
        };

        let err = into_reply(message).unwrap_err();
        match err {
            ConnectionError::Upstream { code, description } => {
                assert_eq!(code, "CH_ACCESS_DENIED");
                assert_eq!(description, "bad secret");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn data_replies_resolve_the_pending_request() {
        let message = InboundMessage {
            payload_type: codes::TRADER_RES,
            correlation_id: Some("corr".to_string()),
            payload: Payload::TraderRes(TraderRes {
                ctid_trader_account_id: 1,
                trader: None,
            }),
        };

        assert!(into_reply(message).is_ok());
    }

    #[test]
    fn connection_loss_classification() {
        assert!(ConnectionError::NotConnected.is_connection_loss());
        assert!(
            ConnectionError::Closed {
                reason: String::new()
            }
            .is_connection_loss()
        );
        assert!(
            !ConnectionError::Timeout {
                operation: String::new()
            }
            .is_connection_loss()
        );
        assert!(
            !ConnectionError::Upstream {
                code: String::new(),
                description: String::new()
            }
            .is_connection_loss()
        );
    }
}
