//! # Types
//!
//! Shared data structures for the funding escrow contract.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! An escrow is internally stored as two separate ledger entries:
//!
//! - [`EscrowConfig`] — written once by `init`; never mutated. There are no
//!   setters anywhere in the contract, so token, creator, beneficiary, goal,
//!   deadline, and contribution floor are fixed for the life of the instance.
//! - [`EscrowState`] — written on every contribution and once at finalize.
//!
//! The public API exposes the reconstructed [`EscrowInfo`] for convenience.
//!
//! ### Lifecycle as a one-way machine
//!
//! ```text
//! open ──contribute*──► open ──finalize──► closed (successful)
//!                                             │
//!                                             └──claim_refund (once per contributor)
//! ```
//!
//! `closed` and `successful` never revert, `finalized_amount` and
//! `refund_pool` are written exactly once, and each contributor's
//! `refund_claimed` flag is one-way. The instance is never destroyed; it
//! stays queryable after close.

use soroban_sdk::{contracttype, Address};

/// Immutable escrow parameters, written once by `init`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowConfig {
    /// Token contract every transfer in and out of the pool uses. The
    /// instance holds exactly this one asset; there is no other inbound
    /// path, so payments in any other asset cannot reach the pool.
    pub token: Address,
    /// Identity that created the instance; the only party allowed to
    /// finalize.
    pub creator: Address,
    /// Identity that receives the finalized payout.
    pub beneficiary: Address,
    /// Minimum aggregate needed for a successful finalize. Always > 0.
    pub goal: i128,
    /// Ledger timestamp after which contributions are rejected.
    pub deadline: u64,
    /// Floor for any single contribution. 0 means no floor.
    pub min_contribution: i128,
}

/// Mutable escrow state, updated on contributions and at finalize.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowState {
    /// Running sum of all accepted contributions. Never decremented —
    /// refunds are tracked per contributor, not subtracted here.
    pub aggregate_total: i128,
    /// One-way flag set by finalize.
    pub closed: bool,
    /// Terminal outcome recorded at close. The current finalize rule only
    /// ever records `true`; the failed branch survives in the read helpers.
    pub successful: bool,
    /// Amount sent to the beneficiary at finalize. Set exactly once.
    pub finalized_amount: i128,
    /// `aggregate_total - finalized_amount`, computed once at finalize and
    /// never recomputed. Non-negative because finalize enforces
    /// `finalized_amount <= aggregate_total` first.
    pub refund_pool: i128,
}

impl EscrowState {
    /// Fresh state for a newly initialized escrow.
    pub fn new() -> Self {
        EscrowState {
            aggregate_total: 0,
            closed: false,
            successful: false,
            finalized_amount: 0,
            refund_pool: 0,
        }
    }
}

/// Per-contributor deposit record, keyed by contributor address.
///
/// `deposited` is cumulative across all of that contributor's calls and is
/// NOT zeroed when the refund is claimed — only `refund_claimed` flips, so
/// the original deposit stays readable afterwards.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributorRecord {
    pub deposited: i128,
    pub refund_claimed: bool,
}

/// Combined per-contributor refund status returned by `get_refund_status`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundStatus {
    /// True once the contributor's one-time claim has been consumed.
    pub claimed: bool,
    /// What a claim would pay out right now; 0 when open or already
    /// claimed. For a closed-as-failed escrow this is the full deposit
    /// (unreachable under the current finalize rule, kept for parity with
    /// the legacy `refund` entry point).
    pub refundable: i128,
    /// The contributor's cumulative deposit, unchanged by claiming.
    pub deposited: i128,
}

/// Full public view of an escrow, reconstructed from the split
/// [`EscrowConfig`] + [`EscrowState`] storage entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowInfo {
    pub token: Address,
    pub creator: Address,
    pub beneficiary: Address,
    pub goal: i128,
    pub deadline: u64,
    pub min_contribution: i128,
    pub aggregate_total: i128,
    pub closed: bool,
    pub successful: bool,
    pub finalized_amount: i128,
    pub refund_pool: i128,
}
