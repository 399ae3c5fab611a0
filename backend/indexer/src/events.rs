//! Canonical event types emitted by the on-chain contracts.
//!
//! These mirror the Soroban events defined in
//! `contracts/funding_escrow/src/events.rs` (topics `init`, `contrib`,
//! `final`, `refund`) and `contracts/project_directory/src/lib.rs`
//! (topic `register`).

use serde::{Deserialize, Serialize};

/// All recognised event kinds across the escrow and directory contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An escrow fixed its parameters (`init` topic).
    Initialized,
    /// A contribution entered an escrow's pool (`contrib` topic).
    Contributed,
    /// An escrow closed and paid its beneficiary (`final` topic).
    Finalized,
    /// A contributor consumed their refund claim (`refund` topic).
    Refunded,
    /// A project was listed in the directory (`register` topic).
    Registered,
    /// An event from a watched contract that we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the leading topic symbol string produced by Soroban into an [`EventKind`].
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "init" => Self::Initialized,
            "contrib" => Self::Contributed,
            "final" => Self::Finalized,
            "refund" => Self::Refunded,
            "register" => Self::Registered,
            _ => Self::Unknown,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Contributed => "contributed",
            Self::Finalized => "finalized",
            Self::Refunded => "refunded",
            Self::Registered => "registered",
            Self::Unknown => "unknown",
        }
    }
}

/// A fully decoded contract event, ready to be stored in the database.
///
/// `contract_id` is the emitting contract — an escrow instance, or the
/// directory for `registered` events. `actor` is the contributor, creator,
/// or registrant, depending on the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEvent {
    /// The RPC's globally unique event id; the dedup key for re-polled
    /// ledger ranges. `None` when an RPC omits it.
    pub event_id: Option<String>,
    pub event_type: String,
    pub contract_id: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub tx_hash: Option<String>,
}

/// A directory `register` event unpacked far enough to feed the escrow
/// registry: the poller widens its watch set with each new address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowRegistration {
    pub escrow: String,
    pub directory_id: Option<i64>,
    pub owner: Option<String>,
    pub name: Option<String>,
    pub ledger: i64,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub contract_id: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

/// A registered escrow as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EscrowRow {
    pub address: String,
    pub directory_id: Option<i64>,
    pub owner: Option<String>,
    pub name: Option<String>,
    pub registered_ledger: i64,
}
