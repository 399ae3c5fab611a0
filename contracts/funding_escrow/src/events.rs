//! Contract events.
//!
//! Every state transition publishes a typed event so off-chain indexers and
//! dashboards can follow an escrow without polling its storage. Topics are
//! `(symbol, key)` pairs; data is a `#[contracttype]` struct decodable with
//! `try_into_val` on the consumer side.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

/// Emitted once when `init` fixes the escrow parameters.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowInitialized {
    pub creator: Address,
    pub token: Address,
    pub beneficiary: Address,
    pub goal: i128,
    pub deadline: u64,
    pub min_contribution: i128,
}

pub fn emit_initialized(env: &Env, event: EscrowInitialized) {
    env.events().publish((symbol_short!("init"),), event);
}

/// Emitted on every accepted contribution, including the creator's
/// initial one. Carries the post-contribution aggregate.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionReceived {
    pub contributor: Address,
    pub amount: i128,
    pub aggregate_total: i128,
}

pub fn emit_contribution(env: &Env, event: ContributionReceived) {
    let topics = (symbol_short!("contrib"), event.contributor.clone());
    env.events().publish(topics, event);
}

/// Emitted exactly once, when the creator closes the escrow.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowFinalized {
    pub success: bool,
    pub finalized_amount: i128,
    pub aggregate_total: i128,
}

pub fn emit_finalized(env: &Env, event: EscrowFinalized) {
    env.events().publish((symbol_short!("final"),), event);
}

/// Emitted when a contributor consumes their one-time refund claim.
/// `amount` is 0 when the pool had nothing left for them; the claim is
/// still a state transition worth observing.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundIssued {
    pub contributor: Address,
    pub amount: i128,
}

pub fn emit_refund(env: &Env, event: RefundIssued) {
    let topics = (symbol_short!("refund"), event.contributor.clone());
    env.events().publish(topics, event);
}
