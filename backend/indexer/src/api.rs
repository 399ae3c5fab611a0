//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::events::{EscrowRow, EventRecord};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EscrowEventsResponse {
    pub escrow: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct EscrowsResponse {
    pub count: usize,
    pub escrows: Vec<EscrowRow>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!(ErrorResponse {
            error: e.to_string()
        })),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /escrows`
///
/// Returns every escrow learned from directory `register` events, most
/// recently registered first.
pub async fn get_escrows(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match db::list_escrows(&state.pool).await {
        Ok(escrows) => {
            let count = escrows.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(EscrowsResponse { count, escrows })),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// `GET /escrows/:address/events`
///
/// Returns all indexed events emitted by the given escrow instance.
pub async fn get_escrow_events(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    match db::get_events_for_contract(&state.pool, &address).await {
        Ok(events) => {
            let count = events.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(EscrowEventsResponse {
                    escrow: address,
                    count,
                    events,
                })),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// `GET /events`
///
/// Returns all indexed events across the directory and every escrow.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match db::get_all_events(&state.pool).await {
        Ok(events) => {
            let count = events.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(AllEventsResponse { count, events })),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}
