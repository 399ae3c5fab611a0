//! # Storage
//!
//! Typed helpers over Soroban's two storage tiers:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key      | Type           | Description                          |
//! |----------|----------------|--------------------------------------|
//! | `Config` | `EscrowConfig` | Immutable parameters, set by `init`  |
//! | `State`  | `EscrowState`  | Aggregate total and close outcome    |
//! | `Guard`  | `bool`         | Reentrancy flag                      |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day
//! remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                     | Type                | Description           |
//! |-------------------------|---------------------|-----------------------|
//! | `Contributor(Address)`  | `ContributorRecord` | Cumulative deposit and claim flag |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days
//! remaining.
//!
//! ## Why per-contributor entries instead of one map?
//!
//! Contributions are the high-frequency write. Keying each contributor's
//! record separately keeps every contribution write at ~20 bytes and keeps
//! contributors isolated: a claim touches only the claimant's entry plus
//! nothing else, and there is no shared table across escrow instances —
//! each deployed instance owns its own keyed records.

use soroban_sdk::{contracttype, Address, Env};

use crate::types::{ContributorRecord, EscrowConfig, EscrowState};

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

/// All contract storage keys.
///
/// `Config`, `State`, and `Guard` live in instance storage for the life of
/// the contract. `Contributor` entries live in persistent storage with
/// independent TTLs.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Immutable escrow parameters (Instance).
    Config,
    /// Mutable escrow state (Instance).
    State,
    /// Reentrancy guard flag (Instance).
    Guard,
    /// Per-contributor deposit record (Persistent).
    Contributor(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

/// Extend instance storage TTL if it falls below the threshold.
fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

/// True once `init` has written the immutable config.
pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

/// Write the immutable config. Called exactly once, from `init`.
pub fn save_config(env: &Env, config: &EscrowConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

/// Load the immutable config.
/// Panics if the escrow has not been initialized.
pub fn load_config(env: &Env) -> EscrowConfig {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .expect("escrow not initialized")
}

/// Write the mutable state.
pub fn save_state(env: &Env, state: &EscrowState) {
    env.storage().instance().set(&DataKey::State, state);
    bump_instance(env);
}

/// Load the mutable state.
/// Panics if the escrow has not been initialized.
pub fn load_state(env: &Env) -> EscrowState {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::State)
        .expect("escrow not initialized")
}

// ── Persistent Storage Helpers ───────────────────────────────────────

/// Extend the TTL for a persistent storage key.
fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Load a contributor's record, defaulting to an empty one for addresses
/// that never contributed.
pub fn load_contributor(env: &Env, contributor: &Address) -> ContributorRecord {
    let key = DataKey::Contributor(contributor.clone());
    match env.storage().persistent().get(&key) {
        Some(record) => {
            bump_persistent(env, &key);
            record
        }
        None => ContributorRecord {
            deposited: 0,
            refund_claimed: false,
        },
    }
}

/// Save a contributor's record.
pub fn save_contributor(env: &Env, contributor: &Address, record: &ContributorRecord) {
    let key = DataKey::Contributor(contributor.clone());
    env.storage().persistent().set(&key, record);
    bump_persistent(env, &key);
}
