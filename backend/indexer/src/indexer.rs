//! Long-running background task that polls the Soroban RPC and writes
//! decoded escrow and directory events to the database.
//!
//! The watch set starts as the directory contract alone. Every decoded
//! `register` event adds an escrow address to the registry, and the next
//! poll widens its `getEvents` filters to include it. One request can
//! carry at most [`rpc::MAX_FILTERS`] × [`rpc::MAX_IDS_PER_FILTER`]
//! contract ids; beyond that the most recently registered escrows win and
//! a warning names how many fell outside the window.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::errors::IndexerError;
use crate::rpc;

const MAX_WATCHED_CONTRACTS: usize = rpc::MAX_FILTERS * rpc::MAX_IDS_PER_FILTER;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Spawn the indexer loop as a background [`tokio`] task. Returns when
/// `shutdown` is cancelled.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!(
        "Indexer starting — directory: {}",
        state.config.directory_contract_id
    );

    // Load the cursor from the DB; fall back to config start_ledger.
    let last_ledger = db::get_last_ledger(&state.pool).await.unwrap_or(0);
    let cursor_str = db::get_cursor_string(&state.pool).await.unwrap_or(None);

    let mut current_ledger = if last_ledger > 0 {
        last_ledger as u32
    } else {
        state.config.start_ledger
    };
    let mut cursor: Option<String> = cursor_str;

    info!("Resuming from ledger {current_ledger}");

    loop {
        match poll_once(
            &state.pool,
            &state.client,
            &state.config,
            current_ledger,
            cursor.as_deref(),
            &shutdown,
        )
        .await
        {
            Ok((next_ledger, next_cursor)) => {
                current_ledger = next_ledger;
                cursor = next_cursor;
            }
            Err(IndexerError::Shutdown) => {
                info!("Indexer shutting down");
                return;
            }
            Err(e) => {
                error!("Indexer poll error: {e}");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Indexer shutting down");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }
}

/// The contract ids to pass to `getEvents`: the directory first, then known
/// escrows newest-registration-first, truncated to the RPC filter bound.
async fn watch_set(pool: &SqlitePool, config: &Config) -> crate::errors::Result<Vec<String>> {
    let mut ids = vec![config.directory_contract_id.clone()];
    let escrows = db::list_escrows(pool).await?;
    for row in &escrows {
        ids.push(row.address.clone());
    }
    if ids.len() > MAX_WATCHED_CONTRACTS {
        warn!(
            "{} escrows exceed the {}-contract filter window; the oldest {} are not being polled",
            escrows.len(),
            MAX_WATCHED_CONTRACTS,
            ids.len() - MAX_WATCHED_CONTRACTS
        );
        ids.truncate(MAX_WATCHED_CONTRACTS);
    }
    Ok(ids)
}

/// Perform a single poll iteration.
///
/// Returns `(next_start_ledger, next_cursor)`.
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    start_ledger: u32,
    cursor: Option<&str>,
    shutdown: &CancellationToken,
) -> crate::errors::Result<(u32, Option<String>)> {
    let contract_ids = watch_set(pool, config).await?;

    let (raw_events, next_cursor, latest_ledger) = rpc::fetch_events(
        client,
        &config.rpc_url,
        &contract_ids,
        start_ledger,
        cursor,
        config.events_per_page,
        shutdown,
    )
    .await?;

    if !raw_events.is_empty() {
        // New registrations first, so their escrows join the next poll.
        for reg in rpc::decode_registrations(&raw_events) {
            if db::insert_escrow(pool, &reg).await? {
                info!(
                    "Watching new escrow {} (directory id {:?})",
                    reg.escrow, reg.directory_id
                );
            }
        }

        let decoded = rpc::decode_events(&raw_events);
        let inserted = db::insert_events(pool, &decoded).await?;
        info!(
            "Polled {} raw events → {} new records stored",
            raw_events.len(),
            inserted
        );
    }

    // Advance the ledger cursor:
    // - If there is a next_cursor string, keep the same start_ledger so the next
    //   call paginates within the same ledger range.
    // - Otherwise advance to the latest known ledger.
    let next_ledger = latest_ledger
        .map(|l| (l as u32).max(start_ledger))
        .unwrap_or(start_ledger);

    // Persist cursor so restarts are deterministic.
    db::save_cursor(pool, next_ledger as i64, next_cursor.as_deref()).await?;

    Ok((next_ledger, next_cursor))
}
