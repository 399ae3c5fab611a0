//! Database layer — migrations, queries, cursor and escrow-registry management.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::events::{EscrowEvent, EscrowRegistration, EscrowRow, EventRecord};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Read the last-seen ledger from the cursor row.
/// Returns `0` when no cursor has been persisted yet.
pub async fn get_last_ledger(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_ledger FROM indexer_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Persist the last-seen ledger (and optionally a pagination cursor string).
pub async fn save_cursor(
    pool: &SqlitePool,
    last_ledger: i64,
    last_cursor: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET last_ledger = ?1, last_cursor = ?2 WHERE id = 1")
        .bind(last_ledger)
        .bind(last_cursor)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read back the raw cursor string (used to resume pagination mid-ledger).
pub async fn get_cursor_string(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(v,)| v))
}

// ─────────────────────────────────────────────────────────
// Escrow registry
// ─────────────────────────────────────────────────────────

/// Record an escrow discovered through a directory `register` event.
/// Re-registrations of the same address keep the first row.
pub async fn insert_escrow(pool: &SqlitePool, reg: &EscrowRegistration) -> Result<bool> {
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO escrows
            (address, directory_id, owner, name, registered_ledger)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&reg.escrow)
    .bind(reg.directory_id)
    .bind(&reg.owner)
    .bind(&reg.name)
    .bind(reg.ledger)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

/// All known escrows, most recently registered first (the poll loop watches
/// from the head of this list).
pub async fn list_escrows(pool: &SqlitePool) -> Result<Vec<EscrowRow>> {
    let rows = sqlx::query_as::<_, EscrowRow>(
        r#"
        SELECT address, directory_id, owner, name, registered_ledger
        FROM   escrows
        ORDER  BY registered_ledger DESC, address ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events.  The RPC's unique event id is the
/// dedup key, so re-polling the boundary ledger silently ignores rows the
/// indexer has already stored; events an RPC delivers without an id get a
/// synthesized key from their identifying fields.
pub async fn insert_events(pool: &SqlitePool, events: &[EscrowEvent]) -> Result<usize> {
    let mut count = 0usize;
    for ev in events {
        let event_id = ev
            .event_id
            .clone()
            .unwrap_or_else(|| synthetic_event_id(ev));
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, event_type, contract_id, actor, amount, ledger, timestamp, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event_id)
        .bind(&ev.event_type)
        .bind(&ev.contract_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.tx_hash)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

/// Stable stand-in key for RPCs that omit the event id. NULL-able fields
/// fold to empty strings so two deliveries of the same event always
/// produce the same key.
fn synthetic_event_id(ev: &EscrowEvent) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}",
        ev.ledger,
        ev.event_type,
        ev.contract_id,
        ev.actor.as_deref().unwrap_or(""),
        ev.amount.as_deref().unwrap_or(""),
        ev.tx_hash.as_deref().unwrap_or(""),
    )
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events emitted by one contract (an escrow instance, or the
/// directory), ordered by ledger ascending.
pub async fn get_events_for_contract(
    pool: &SqlitePool,
    contract_id: &str,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_id, event_type, contract_id, actor, amount, ledger,
               timestamp, tx_hash, created_at
        FROM   events
        WHERE  contract_id = ?1
        ORDER  BY ledger ASC, id ASC
        "#,
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, ordered by ledger ascending.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_id, event_type, contract_id, actor, amount, ledger,
               timestamp, tx_hash, created_at
        FROM   events
        ORDER  BY ledger ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
