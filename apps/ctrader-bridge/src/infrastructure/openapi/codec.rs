//! Envelope codec for the length-framed ProtoOA wire protocol.
//!
//! Frames on the socket are a 4-byte big-endian length prefix followed by a
//! serialized [`ProtoMessage`] envelope; the envelope's inner payload bytes
//! are decoded by payload type. Decode failure on a critical payload type is
//! an error, since substituting an empty payload would mask broken financial
//! data; on any other type the payload degrades to [`Payload::Unknown`] with
//! a logged warning so a single malformed push cannot take the socket down.

use bytes::Bytes;
use prost::Message as _;
use tokio_util::codec::LengthDelimitedCodec;

use super::messages::{
    AccountAuthReq, AccountAuthRes, ApplicationAuthReq, ApplicationAuthRes, ErrorRes,
    ExecutionEvent, GetAccountsByAccessTokenReq, GetAccountsByAccessTokenRes, GetTrendbarsReq,
    GetTrendbarsRes, HeartbeatEvent, NewOrderReq, OaErrorRes, OrderErrorEvent, ProtoMessage,
    ReconcileReq, ReconcileRes, SpotEvent, SubscribeSpotsReq, SubscribeSpotsRes, SymbolsListReq,
    SymbolsListRes, TraderReq, TraderRes, UnsubscribeSpotsReq, UnsubscribeSpotsRes, VersionReq,
    VersionRes,
};
use super::payload_type::{codes, is_critical};

/// Codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The outer envelope could not be decoded.
    #[error("invalid envelope: {source}")]
    Envelope {
        /// Underlying decode error.
        source: prost::DecodeError,
    },

    /// A critical payload could not be decoded.
    #[error("invalid payload for critical type {payload_type}: {source}")]
    CriticalPayload {
        /// Payload type of the malformed message.
        payload_type: u32,
        /// Correlation id from the envelope, when present.
        correlation_id: Option<String>,
        /// Underlying decode error.
        source: prost::DecodeError,
    },
}

/// A typed wire payload.
///
/// The payload type code is derived from the variant, so an outbound
/// envelope can never disagree with the bytes it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Keep-alive.
    Heartbeat,
    /// Generic error response (common family).
    Error(ErrorRes),
    /// Error response (trading family).
    OaError(OaErrorRes),
    /// Protocol version request.
    VersionReq(VersionReq),
    /// Protocol version response.
    VersionRes(VersionRes),
    /// Application authentication request.
    ApplicationAuthReq(ApplicationAuthReq),
    /// Application authentication response.
    ApplicationAuthRes(ApplicationAuthRes),
    /// Account authentication request.
    AccountAuthReq(AccountAuthReq),
    /// Account authentication response.
    AccountAuthRes(AccountAuthRes),
    /// Trader info request.
    TraderReq(TraderReq),
    /// Trader info response.
    TraderRes(TraderRes),
    /// Reconcile request.
    ReconcileReq(ReconcileReq),
    /// Reconcile response.
    ReconcileRes(ReconcileRes),
    /// Symbol catalog request.
    SymbolsListReq(SymbolsListReq),
    /// Symbol catalog response.
    SymbolsListRes(SymbolsListRes),
    /// Accounts-by-access-token request.
    GetAccountsByAccessTokenReq(GetAccountsByAccessTokenReq),
    /// Accounts-by-access-token response.
    GetAccountsByAccessTokenRes(GetAccountsByAccessTokenRes),
    /// New order request.
    NewOrderReq(NewOrderReq),
    /// Execution event.
    ExecutionEvent(ExecutionEvent),
    /// Order error event.
    OrderErrorEvent(OrderErrorEvent),
    /// Subscribe-to-spots request.
    SubscribeSpotsReq(SubscribeSpotsReq),
    /// Subscribe-to-spots response.
    SubscribeSpotsRes(SubscribeSpotsRes),
    /// Unsubscribe-from-spots request.
    UnsubscribeSpotsReq(UnsubscribeSpotsReq),
    /// Unsubscribe-from-spots response.
    UnsubscribeSpotsRes(UnsubscribeSpotsRes),
    /// Spot price push.
    SpotEvent(SpotEvent),
    /// Historical trendbars request.
    GetTrendbarsReq(GetTrendbarsReq),
    /// Historical trendbars response.
    GetTrendbarsRes(GetTrendbarsRes),
    /// Payload that could not be decoded (non-critical) or whose type the
    /// bridge does not know.
    Unknown {
        /// Payload type code from the envelope.
        payload_type: u32,
    },
}

impl Payload {
    /// The wire payload type code for this payload.
    #[must_use]
    pub const fn payload_type(&self) -> u32 {
        match self {
            Self::Heartbeat => codes::HEARTBEAT_EVENT,
            Self::Error(_) => codes::ERROR_RES,
            Self::OaError(_) => codes::OA_ERROR_RES,
            Self::VersionReq(_) => codes::VERSION_REQ,
            Self::VersionRes(_) => codes::VERSION_RES,
            Self::ApplicationAuthReq(_) => codes::APPLICATION_AUTH_REQ,
            Self::ApplicationAuthRes(_) => codes::APPLICATION_AUTH_RES,
            Self::AccountAuthReq(_) => codes::ACCOUNT_AUTH_REQ,
            Self::AccountAuthRes(_) => codes::ACCOUNT_AUTH_RES,
            Self::TraderReq(_) => codes::TRADER_REQ,
            Self::TraderRes(_) => codes::TRADER_RES,
            Self::ReconcileReq(_) => codes::RECONCILE_REQ,
            Self::ReconcileRes(_) => codes::RECONCILE_RES,
            Self::SymbolsListReq(_) => codes::SYMBOLS_LIST_REQ,
            Self::SymbolsListRes(_) => codes::SYMBOLS_LIST_RES,
            Self::GetAccountsByAccessTokenReq(_) => codes::GET_ACCOUNTS_BY_ACCESS_TOKEN_REQ,
            Self::GetAccountsByAccessTokenRes(_) => codes::GET_ACCOUNTS_BY_ACCESS_TOKEN_RES,
            Self::NewOrderReq(_) => codes::NEW_ORDER_REQ,
            Self::ExecutionEvent(_) => codes::EXECUTION_EVENT,
            Self::OrderErrorEvent(_) => codes::ORDER_ERROR_EVENT,
            Self::SubscribeSpotsReq(_) => codes::SUBSCRIBE_SPOTS_REQ,
            Self::SubscribeSpotsRes(_) => codes::SUBSCRIBE_SPOTS_RES,
            Self::UnsubscribeSpotsReq(_) => codes::UNSUBSCRIBE_SPOTS_REQ,
            Self::UnsubscribeSpotsRes(_) => codes::UNSUBSCRIBE_SPOTS_RES,
            Self::SpotEvent(_) => codes::SPOT_EVENT,
            Self::GetTrendbarsReq(_) => codes::GET_TRENDBARS_REQ,
            Self::GetTrendbarsRes(_) => codes::GET_TRENDBARS_RES,
            Self::Unknown { payload_type } => *payload_type,
        }
    }

    /// Whether this payload is one of the error kinds.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Error(_) | Self::OaError(_) | Self::OrderErrorEvent(_)
        )
    }
}

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Payload type code from the envelope.
    pub payload_type: u32,
    /// Correlation id, present on replies to requests.
    pub correlation_id: Option<String>,
    /// The typed payload.
    pub payload: Payload,
}

/// Encode a payload into envelope bytes ready for length framing.
#[must_use]
pub fn encode(payload: &Payload, correlation_id: Option<&str>) -> Bytes {
    let body = match payload {
        Payload::Heartbeat => Some(HeartbeatEvent {}.encode_to_vec()),
        Payload::Error(m) => Some(m.encode_to_vec()),
        Payload::OaError(m) => Some(m.encode_to_vec()),
        Payload::VersionReq(m) => Some(m.encode_to_vec()),
        Payload::VersionRes(m) => Some(m.encode_to_vec()),
        Payload::ApplicationAuthReq(m) => Some(m.encode_to_vec()),
        Payload::ApplicationAuthRes(m) => Some(m.encode_to_vec()),
        Payload::AccountAuthReq(m) => Some(m.encode_to_vec()),
        Payload::AccountAuthRes(m) => Some(m.encode_to_vec()),
        Payload::TraderReq(m) => Some(m.encode_to_vec()),
        Payload::TraderRes(m) => Some(m.encode_to_vec()),
        Payload::ReconcileReq(m) => Some(m.encode_to_vec()),
        Payload::ReconcileRes(m) => Some(m.encode_to_vec()),
        Payload::SymbolsListReq(m) => Some(m.encode_to_vec()),
        Payload::SymbolsListRes(m) => Some(m.encode_to_vec()),
        Payload::GetAccountsByAccessTokenReq(m) => Some(m.encode_to_vec()),
        Payload::GetAccountsByAccessTokenRes(m) => Some(m.encode_to_vec()),
        Payload::NewOrderReq(m) => Some(m.encode_to_vec()),
        Payload::ExecutionEvent(m) => Some(m.encode_to_vec()),
        Payload::OrderErrorEvent(m) => Some(m.encode_to_vec()),
        Payload::SubscribeSpotsReq(m) => Some(m.encode_to_vec()),
        Payload::SubscribeSpotsRes(m) => Some(m.encode_to_vec()),
        Payload::UnsubscribeSpotsReq(m) => Some(m.encode_to_vec()),
        Payload::UnsubscribeSpotsRes(m) => Some(m.encode_to_vec()),
        Payload::SpotEvent(m) => Some(m.encode_to_vec()),
        Payload::GetTrendbarsReq(m) => Some(m.encode_to_vec()),
        Payload::GetTrendbarsRes(m) => Some(m.encode_to_vec()),
        Payload::Unknown { .. } => None,
    };

    let envelope = ProtoMessage {
        payload_type: payload.payload_type(),
        payload: body,
        client_msg_id: correlation_id.map(str::to_owned),
    };

    Bytes::from(envelope.encode_to_vec())
}

/// Decode one framed envelope.
///
/// # Errors
///
/// Returns [`CodecError::Envelope`] when the outer envelope is malformed and
/// [`CodecError::CriticalPayload`] when a critical inner payload is.
pub fn decode(frame: &[u8]) -> Result<InboundMessage, CodecError> {
    let envelope = ProtoMessage::decode(frame).map_err(|source| CodecError::Envelope { source })?;
    let payload_type = envelope.payload_type;
    let body = envelope.payload.as_deref().unwrap_or(&[]);

    let payload = match decode_payload(payload_type, body) {
        Ok(payload) => payload,
        Err(source) if is_critical(payload_type) => {
            return Err(CodecError::CriticalPayload {
                payload_type,
                correlation_id: envelope.client_msg_id,
                source,
            });
        }
        Err(source) => {
            tracing::warn!(
                payload_type,
                error = %source,
                "Substituting empty payload for undecodable message"
            );
            Payload::Unknown { payload_type }
        }
    };

    Ok(InboundMessage {
        payload_type,
        correlation_id: envelope.client_msg_id,
        payload,
    })
}

/// Decode the inner payload by type.
fn decode_payload(payload_type: u32, body: &[u8]) -> Result<Payload, prost::DecodeError> {
    let payload = match payload_type {
        codes::HEARTBEAT_EVENT => {
            HeartbeatEvent::decode(body)?;
            Payload::Heartbeat
        }
        codes::ERROR_RES => Payload::Error(ErrorRes::decode(body)?),
        codes::OA_ERROR_RES => Payload::OaError(OaErrorRes::decode(body)?),
        codes::VERSION_REQ => Payload::VersionReq(VersionReq::decode(body)?),
        codes::VERSION_RES => Payload::VersionRes(VersionRes::decode(body)?),
        codes::APPLICATION_AUTH_REQ => {
            Payload::ApplicationAuthReq(ApplicationAuthReq::decode(body)?)
        }
        codes::APPLICATION_AUTH_RES => {
            Payload::ApplicationAuthRes(ApplicationAuthRes::decode(body)?)
        }
        codes::ACCOUNT_AUTH_REQ => Payload::AccountAuthReq(AccountAuthReq::decode(body)?),
        codes::ACCOUNT_AUTH_RES => Payload::AccountAuthRes(AccountAuthRes::decode(body)?),
        codes::TRADER_REQ => Payload::TraderReq(TraderReq::decode(body)?),
        codes::TRADER_RES => Payload::TraderRes(TraderRes::decode(body)?),
        codes::RECONCILE_REQ => Payload::ReconcileReq(ReconcileReq::decode(body)?),
        codes::RECONCILE_RES => Payload::ReconcileRes(ReconcileRes::decode(body)?),
        codes::SYMBOLS_LIST_REQ => Payload::SymbolsListReq(SymbolsListReq::decode(body)?),
        codes::SYMBOLS_LIST_RES => Payload::SymbolsListRes(SymbolsListRes::decode(body)?),
        codes::GET_ACCOUNTS_BY_ACCESS_TOKEN_REQ => {
            Payload::GetAccountsByAccessTokenReq(GetAccountsByAccessTokenReq::decode(body)?)
        }
        codes::GET_ACCOUNTS_BY_ACCESS_TOKEN_RES => {
            Payload::GetAccountsByAccessTokenRes(GetAccountsByAccessTokenRes::decode(body)?)
        }
        codes::NEW_ORDER_REQ => Payload::NewOrderReq(NewOrderReq::decode(body)?),
        codes::EXECUTION_EVENT => Payload::ExecutionEvent(ExecutionEvent::decode(body)?),
        codes::ORDER_ERROR_EVENT => Payload::OrderErrorEvent(OrderErrorEvent::decode(body)?),
        codes::SUBSCRIBE_SPOTS_REQ => Payload::SubscribeSpotsReq(SubscribeSpotsReq::decode(body)?),
        codes::SUBSCRIBE_SPOTS_RES => Payload::SubscribeSpotsRes(SubscribeSpotsRes::decode(body)?),
        codes::UNSUBSCRIBE_SPOTS_REQ => {
            Payload::UnsubscribeSpotsReq(UnsubscribeSpotsReq::decode(body)?)
        }
        codes::UNSUBSCRIBE_SPOTS_RES => {
            Payload::UnsubscribeSpotsRes(UnsubscribeSpotsRes::decode(body)?)
        }
        codes::SPOT_EVENT => Payload::SpotEvent(SpotEvent::decode(body)?),
        codes::GET_TRENDBARS_REQ => Payload::GetTrendbarsReq(GetTrendbarsReq::decode(body)?),
        codes::GET_TRENDBARS_RES => Payload::GetTrendbarsRes(GetTrendbarsRes::decode(body)?),
        other => {
            tracing::debug!(payload_type = other, "Unmapped payload type");
            Payload::Unknown {
                payload_type: other,
            }
        }
    };

    Ok(payload)
}

/// Length framing used on the socket: 4-byte big-endian prefix.
#[must_use]
pub fn frame_codec(max_frame_bytes: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .big_endian()
        .length_field_length(4)
        .max_frame_length(max_frame_bytes)
        .new_codec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::openapi::messages::{Trader, TradeSide};
    use prost::Message as _;

    #[test]
    fn request_payloads_round_trip() {
        let payloads = vec![
            Payload::Heartbeat,
            Payload::VersionReq(VersionReq {}),
            Payload::ApplicationAuthReq(ApplicationAuthReq {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            }),
            Payload::AccountAuthReq(AccountAuthReq {
                ctid_trader_account_id: 42,
                access_token: "token".to_string(),
            }),
            Payload::TraderReq(TraderReq {
                ctid_trader_account_id: 42,
            }),
            Payload::SubscribeSpotsReq(SubscribeSpotsReq {
                ctid_trader_account_id: 42,
                symbol_id: vec![1, 2],
            }),
            Payload::NewOrderReq(NewOrderReq {
                ctid_trader_account_id: 42,
                symbol_id: 1,
                order_type: 1,
                trade_side: TradeSide::Buy as i32,
                volume: 150,
            }),
        ];

        for payload in payloads {
            let bytes = encode(&payload, Some("corr-1"));
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.payload_type, payload.payload_type());
            assert_eq!(decoded.correlation_id.as_deref(), Some("corr-1"));
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn response_payloads_round_trip() {
        let payloads = vec![
            Payload::TraderRes(TraderRes {
                ctid_trader_account_id: 42,
                trader: Some(Trader {
                    ctid_trader_account_id: 42,
                    balance: 1_000_000,
                }),
            }),
            Payload::SpotEvent(SpotEvent {
                ctid_trader_account_id: 42,
                symbol_id: 1,
                bid: Some(1_12345),
                ask: Some(1_12360),
                timestamp: None,
            }),
            Payload::OaError(OaErrorRes {
                ctid_trader_account_id: Some(42),
                error_code: "MARKET_CLOSED".to_string(),
                description: Some("market is closed".to_string()),
            }),
        ];

        for payload in payloads {
            let bytes = encode(&payload, None);
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.payload, payload);
            assert_eq!(decoded.correlation_id, None);
        }
    }

    #[test]
    fn critical_payload_decode_failure_raises() {
        let envelope = ProtoMessage {
            payload_type: codes::TRADER_RES,
            payload: Some(vec![0xff, 0xff, 0xff, 0xff]),
            client_msg_id: Some("corr-2".to_string()),
        };

        let err = decode(&envelope.encode_to_vec()).unwrap_err();
        match err {
            CodecError::CriticalPayload {
                payload_type,
                correlation_id,
                ..
            } => {
                assert_eq!(payload_type, codes::TRADER_RES);
                assert_eq!(correlation_id.as_deref(), Some("corr-2"));
            }
            CodecError::Envelope { .. } => panic!("expected critical payload error"),
        }
    }

    #[test]
    fn non_critical_payload_decode_failure_degrades() {
        let envelope = ProtoMessage {
            payload_type: codes::SPOT_EVENT,
            payload: Some(vec![0xff, 0xff, 0xff, 0xff]),
            client_msg_id: None,
        };

        let decoded = decode(&envelope.encode_to_vec()).unwrap();
        assert_eq!(
            decoded.payload,
            Payload::Unknown {
                payload_type: codes::SPOT_EVENT
            }
        );
    }

    #[test]
    fn unmapped_payload_type_decodes_as_unknown() {
        let envelope = ProtoMessage {
            payload_type: 9999,
            payload: Some(Vec::new()),
            client_msg_id: None,
        };

        let decoded = decode(&envelope.encode_to_vec()).unwrap();
        assert_eq!(
            decoded.payload,
            Payload::Unknown { payload_type: 9999 }
        );
    }

    #[test]
    fn error_payloads_are_classified() {
        assert!(
            Payload::Error(ErrorRes {
                error_code: "E".to_string(),
                description: None
            })
            .is_error()
        );
        assert!(!Payload::Heartbeat.is_error());
    }
}
