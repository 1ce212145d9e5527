//! Axum router delegating to the bridge facade.
//!
//! Handlers never surface raw protocol errors: every failure is routed
//! through the error mapper before the response envelope is built.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::application::{Bridge, FacadeError, map_error};

use super::request::{
    AccountRequest, AccountsRequest, BarsRequest, OrderRequest, PositionsRequest, QuoteRequest,
    SymbolIdRequest, SymbolsRequest,
};
use super::response::ApiResponse;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The bridge instance.
    pub bridge: Arc<Bridge>,
}

/// Create the HTTP router with all facade endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/account", post(account))
        .route("/api/v1/positions", post(positions))
        .route("/api/v1/symbols", post(symbols))
        .route("/api/v1/symbol-id", post(symbol_id))
        .route("/api/v1/quote", post(quote))
        .route("/api/v1/order", post(order))
        .route("/api/v1/accounts", post(accounts))
        .route("/api/v1/bars", post(bars))
        .with_state(state)
}

/// Health and stats; takes no credentials.
async fn health(State(state): State<AppState>) -> Response {
    respond(Ok(state.bridge.stats()))
}

/// Account snapshot.
async fn account(State(state): State<AppState>, Json(request): Json<AccountRequest>) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .account_snapshot(&creds.access_token, creds.account_id, creds.is_demo)
            .await,
    )
}

/// Open positions.
async fn positions(
    State(state): State<AppState>,
    Json(request): Json<PositionsRequest>,
) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .open_positions(&creds.access_token, creds.account_id, creds.is_demo)
            .await,
    )
}

/// Symbol catalog.
async fn symbols(State(state): State<AppState>, Json(request): Json<SymbolsRequest>) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .symbol_catalog(&creds.access_token, creds.account_id, creds.is_demo)
            .await,
    )
}

/// Symbol-name-to-id lookup.
async fn symbol_id(
    State(state): State<AppState>,
    Json(request): Json<SymbolIdRequest>,
) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .symbol_id_by_name(
                &creds.access_token,
                creds.account_id,
                creds.is_demo,
                &request.symbol_name,
            )
            .await,
    )
}

/// Real-time quote.
async fn quote(State(state): State<AppState>, Json(request): Json<QuoteRequest>) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .quote(
                &creds.access_token,
                creds.account_id,
                creds.is_demo,
                request.symbol_id,
                request.symbol_name.as_deref(),
            )
            .await,
    )
}

/// Market order placement.
async fn order(State(state): State<AppState>, Json(request): Json<OrderRequest>) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .place_market_order(
                &creds.access_token,
                creds.account_id,
                creds.is_demo,
                request.symbol_id,
                request.symbol_name.as_deref(),
                &request.side,
                request.volume,
            )
            .await,
    )
}

/// Accounts visible to an access token.
async fn accounts(
    State(state): State<AppState>,
    Json(request): Json<AccountsRequest>,
) -> Response {
    respond(
        state
            .bridge
            .accounts_by_token(&request.access_token, request.is_demo)
            .await,
    )
}

/// Historical bars.
async fn bars(State(state): State<AppState>, Json(request): Json<BarsRequest>) -> Response {
    let creds = &request.credentials;
    respond(
        state
            .bridge
            .historical_bars(
                &creds.access_token,
                creds.account_id,
                creds.is_demo,
                request.symbol_id,
                &request.period,
                request.from_timestamp,
                request.to_timestamp,
                request.count,
            )
            .await,
    )
}

/// Build the response envelope, routing failures through the error mapper.
fn respond<T: Serialize>(result: Result<T, FacadeError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(error) => {
            let mapped = map_error(&error);
            tracing::debug!(code = mapped.code, status = mapped.status, "Operation failed");

            if mapped.class.is_success() {
                return (StatusCode::OK, Json(ApiResponse::<T>::ok_empty())).into_response();
            }

            let status =
                StatusCode::from_u16(mapped.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ApiResponse::<T>::error(mapped))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ErrorClass;
    use crate::infrastructure::openapi::ConnectionError;

    #[test]
    fn facade_errors_map_to_status_codes() {
        let error = FacadeError::Connection(ConnectionError::Timeout {
            operation: "payload type 2121".to_string(),
        });
        let mapped = map_error(&error);
        assert_eq!(mapped.class, ErrorClass::Timeout);

        let response = respond::<()>(Err(error));
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn already_subscribed_resolves_to_success() {
        let error = FacadeError::Connection(ConnectionError::Upstream {
            code: "ALREADY_SUBSCRIBED".to_string(),
            description: String::new(),
        });
        let response = respond::<()>(Err(error));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
