//! Soroban RPC client — polls `getEvents` and decodes escrow/directory events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.
//!
//! ## Filters
//!
//! `getEvents` accepts at most [`MAX_IDS_PER_FILTER`] contract ids per filter
//! and [`MAX_FILTERS`] filters per request, so one request can watch up to 25
//! contracts. The caller passes the full watch set and [`build_params`] chunks
//! it; ids beyond the bound are dropped here and warned about by the poller.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EscrowEvent, EscrowRegistration, EventKind};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

pub const MAX_IDS_PER_FILTER: usize = 5;
pub const MAX_FILTERS: usize = 5;

/// XDR discriminant for `SCV_SYMBOL`.
const SCV_SYMBOL: u32 = 15;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct RawEvent {
    /// XDR-encoded topic list
    pub topic: Vec<String>,
    /// XDR-encoded event value / data
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
    #[serde(rename = "pagingToken")]
    pub paging_token: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events for the watched contracts from the RPC.
///
/// * `contract_ids` — the watch set (directory + known escrows).
/// * `start_ledger` — the ledger sequence to scan from (inclusive).
/// * `cursor`       — optional opaque pagination cursor from a previous response.
/// * `limit`        — maximum number of events to return.
///
/// The retry loop observes `shutdown` at every await point and returns
/// [`IndexerError::Shutdown`] once it is cancelled, so an unreachable RPC
/// cannot hold the process open past a shutdown signal.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
    shutdown: &CancellationToken,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        if shutdown.is_cancelled() {
            return Err(IndexerError::Shutdown);
        }
        let params = build_params(contract_ids, start_ledger, cursor, limit);

        let request = client.post(rpc_url).json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getEvents",
            "params": params,
        }));
        let response = tokio::select! {
            _ = shutdown.cancelled() => return Err(IndexerError::Shutdown),
            resp = request.send() => resp,
        };

        match response {
            Err(e) => {
                warn!("RPC request failed (will retry in {backoff}s): {e}");
                backoff_or_shutdown(backoff, shutdown).await?;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by RPC (will retry in {backoff}s)");
                    backoff_or_shutdown(backoff, shutdown).await?;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse = resp.json().await?;

                if let Some(err) = body.error {
                    // Code -32600 / -32601 are hard failures; everything else we retry
                    if err.code == -32600 || err.code == -32601 {
                        return Err(IndexerError::EventParse(format!(
                            "RPC hard error {}: {}",
                            err.code, err.message
                        )));
                    }
                    warn!(
                        "RPC soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    backoff_or_shutdown(backoff, shutdown).await?;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let result = body.result.ok_or_else(|| {
                    IndexerError::EventParse("Empty result from getEvents".to_string())
                })?;

                debug!(
                    "Fetched {} events (latest_ledger={:?})",
                    result.events.len(),
                    result.latest_ledger
                );

                return Ok((result.events, result.cursor, result.latest_ledger));
            }
        }
    }
}

/// Sleep out a retry backoff, or bail immediately when shutdown arrives.
async fn backoff_or_shutdown(secs: u64, shutdown: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = shutdown.cancelled() => Err(IndexerError::Shutdown),
        _ = tokio::time::sleep(Duration::from_secs(secs)) => Ok(()),
    }
}

fn build_params(
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Value {
    let filters: Vec<Value> = contract_ids
        .chunks(MAX_IDS_PER_FILTER)
        .take(MAX_FILTERS)
        .map(|chunk| {
            json!({
                "type": "contract",
                "contractIds": chunk,
            })
        })
        .collect();

    let mut params = json!({
        "filters": filters,
        "pagination": {
            "limit": limit
        }
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a list of raw RPC events into [`EscrowEvent`] records.
pub fn decode_events(raw: &[RawEvent]) -> Vec<EscrowEvent> {
    raw.iter().filter_map(decode_single).collect()
}

/// Pull the directory registrations out of a raw batch. Each one carries a
/// new escrow address for the poller's watch set.
pub fn decode_registrations(raw: &[RawEvent]) -> Vec<EscrowRegistration> {
    raw.iter()
        .filter(|e| {
            e.topic
                .first()
                .map(|t| EventKind::from_topic(&extract_symbol(t)) == EventKind::Registered)
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let escrow = extract_field(&e.value, &["escrow"])?;
            Some(EscrowRegistration {
                escrow,
                directory_id: e
                    .topic
                    .get(1)
                    .and_then(|t| extract_u64_or_raw(t).parse().ok()),
                owner: extract_field(&e.value, &["owner"]),
                name: extract_field(&e.value, &["name"]),
                ledger: e.ledger.unwrap_or(0) as i64,
            })
        })
        .collect()
}

fn decode_single(raw: &RawEvent) -> Option<EscrowEvent> {
    // Extract leading topic symbol to determine event type.
    let first_topic = raw.topic.first()?;
    let kind = EventKind::from_topic(&extract_symbol(first_topic));

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    let (actor, amount) = decode_data(&raw.value, &kind);

    Some(EscrowEvent {
        event_id: raw.id.clone(),
        event_type: kind.as_str().to_string(),
        contract_id: raw.contract_id.clone().unwrap_or_default(),
        actor,
        amount,
        ledger,
        timestamp,
        tx_hash: raw.tx_hash.as_deref().and_then(normalize_tx_hash),
    })
}

/// Pull apart the JSON `value` blob that Soroban returns for event data.
/// The XDR is decoded by the RPC into a `{"field": …}` JSON object.
fn decode_data(value: &Value, kind: &EventKind) -> (Option<String>, Option<String>) {
    match kind {
        EventKind::Initialized => {
            let actor = extract_field(value, &["creator"])
                .or_else(|| find_nested(value, "creator"));
            let amount = extract_field(value, &["goal"]);
            (actor, amount)
        }
        EventKind::Contributed => {
            let actor = extract_field(value, &["contributor"]);
            let amount = extract_field(value, &["amount"]);
            (actor, amount)
        }
        EventKind::Finalized => {
            let amount = extract_field(value, &["finalized_amount"]);
            (None, amount)
        }
        EventKind::Refunded => {
            let actor = extract_field(value, &["contributor"]);
            let amount = extract_field(value, &["amount"]);
            (actor, amount)
        }
        EventKind::Registered => {
            let actor = extract_field(value, &["owner"]);
            (actor, None)
        }
        EventKind::Unknown => (None, None),
    }
}

fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(key) {
            let s = match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => v.as_str().map(String::from),
            };
            if s.is_some() {
                return s;
            }
        }
    }
    None
}

fn find_nested(value: &Value, key: &str) -> Option<String> {
    if let Value::Object(map) = value {
        for (k, v) in map {
            if k == key {
                return v.as_str().map(String::from);
            }
            if let Some(found) = find_nested(v, key) {
                return Some(found);
            }
        }
    }
    None
}

/// Extract a Soroban Symbol from a topic entry.
///
/// The RPC may return `{"type":"symbol","value":"contrib"}`, a raw base64
/// `ScVal` XDR blob (older `xdrFormat`), or just the bare string.
fn extract_symbol(raw: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        if let Some(s) = v.get("value").and_then(|x| x.as_str()) {
            return s.to_string();
        }
    }
    if let Some(s) = symbol_from_xdr(raw) {
        return s;
    }
    // Fallback: treat the raw string as the symbol
    raw.to_string()
}

/// Decode a base64 `ScVal` of type `SCV_SYMBOL`: 4-byte discriminant,
/// 4-byte length, then the symbol bytes (XDR-padded).
fn symbol_from_xdr(raw: &str) -> Option<String> {
    let bytes = BASE64.decode(raw).ok()?;
    if bytes.len() < 8 {
        return None;
    }
    let discriminant = u32::from_be_bytes(bytes[0..4].try_into().ok()?);
    if discriminant != SCV_SYMBOL {
        return None;
    }
    let len = u32::from_be_bytes(bytes[4..8].try_into().ok()?) as usize;
    let body = bytes.get(8..8 + len)?;
    String::from_utf8(body.to_vec()).ok()
}

/// Extract a directory id from a topic entry that might be a JSON object or
/// raw number/string.
fn extract_u64_or_raw(raw: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        if let Some(n) = v.get("value").and_then(|x| x.as_u64()) {
            return n.to_string();
        }
        if let Some(s) = v.get("value").and_then(|x| x.as_str()) {
            return s.to_string();
        }
    }
    raw.to_string()
}

/// Lowercase and validate a transaction hash; anything that isn't hex is
/// dropped rather than stored.
fn normalize_tx_hash(raw: &str) -> Option<String> {
    hex::decode(raw).ok().map(hex::encode)
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    use chrono::DateTime;
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
