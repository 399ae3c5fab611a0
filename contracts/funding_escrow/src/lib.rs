//! # Funding Escrow Contract
//!
//! One instance of this Soroban contract is deployed per funded project.
//! It pools contributions of a single token toward a goal, lets the
//! creator decide — once the goal is met — how much of the pool the
//! beneficiary receives, and returns the remainder to contributors in
//! proportion to what they put in.
//!
//! | Phase        | Entry Point(s)                                  |
//! |--------------|-------------------------------------------------|
//! | Bootstrap    | [`FundingEscrow::init`]                         |
//! | Funding      | [`FundingEscrow::contribute`]                   |
//! | Settlement   | [`FundingEscrow::finalize`]                     |
//! | Distribution | [`FundingEscrow::claim_refund`], [`FundingEscrow::refund`] |
//! | Queries      | `deposited_of`, `is_open`, `can_finalize`, `get_min_contribution`, `calculate_refund`, `get_refund_status`, `get_escrow` |
//!
//! ## Architecture
//!
//! Storage access is fully delegated to [`storage`], the refund arithmetic
//! to [`math`], and the reentrancy flag to [`reentrancy`]. This file holds
//! the entry points, their precondition checks, and event emission.
//!
//! Every state-changing entry point finishes all of its own writes before
//! the external token transfer and holds the reentrancy guard across the
//! whole call. The pool only ever moves the one token fixed at `init`;
//! no entry point accepts any other asset.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, token, Address, Env};

mod events;
mod math;
mod reentrancy;
mod storage;
mod types;

#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_refunds;

use events::{ContributionReceived, EscrowFinalized, EscrowInitialized, RefundIssued};
pub use types::{ContributorRecord, EscrowConfig, EscrowInfo, EscrowState, RefundStatus};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidParams = 3,
    BelowMinimum = 4,
    AlreadyClosed = 5,
    PastDeadline = 6,
    NotCreator = 7,
    ExceedsTotal = 8,
    BelowGoal = 9,
    NotClosed = 10,
    NoDeposit = 11,
}

#[contract]
pub struct FundingEscrow;

#[contractimpl]
impl FundingEscrow {
    // ─────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────

    /// Fix the escrow parameters and optionally seed the pool.
    ///
    /// Must be called exactly once, right after deployment, by the project
    /// creator — who becomes the only identity allowed to finalize. All
    /// parameters are immutable afterwards; no setter exists.
    ///
    /// Validation: `goal` must be positive, `deadline` strictly in the
    /// future, `min_contribution` and `initial_contribution` non-negative.
    /// A non-zero `initial_contribution` is pulled from the creator through
    /// the same deposit path as [`FundingEscrow::contribute`], so the
    /// contribution floor applies to it identically.
    pub fn init(
        env: Env,
        creator: Address,
        token: Address,
        beneficiary: Address,
        goal: i128,
        deadline: u64,
        min_contribution: i128,
        initial_contribution: i128,
    ) -> Result<(), Error> {
        reentrancy::lock(&env);
        creator.require_auth();

        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        if goal <= 0 {
            return Err(Error::InvalidParams);
        }
        if deadline <= env.ledger().timestamp() {
            return Err(Error::InvalidParams);
        }
        if min_contribution < 0 || initial_contribution < 0 {
            return Err(Error::InvalidParams);
        }

        let config = EscrowConfig {
            token,
            creator: creator.clone(),
            beneficiary,
            goal,
            deadline,
            min_contribution,
        };
        let mut state = EscrowState::new();
        storage::save_config(&env, &config);
        storage::save_state(&env, &state);

        events::emit_initialized(
            &env,
            EscrowInitialized {
                creator: config.creator.clone(),
                token: config.token.clone(),
                beneficiary: config.beneficiary.clone(),
                goal: config.goal,
                deadline: config.deadline,
                min_contribution: config.min_contribution,
            },
        );

        if initial_contribution > 0 {
            deposit_into_pool(&env, &config, &mut state, &creator, initial_contribution)?;
        }

        reentrancy::unlock(&env);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Contribute `amount` of the escrow's token to the pool.
    ///
    /// Repeatable: a contributor may call this any number of times while
    /// the escrow is open; deposits accumulate under one record.
    ///
    /// # Errors
    /// * `AlreadyClosed` — the escrow has been finalized
    /// * `PastDeadline` — the funding deadline has passed
    /// * `InvalidParams` — `amount` is zero or negative
    /// * `BelowMinimum` — `amount` is under a non-zero contribution floor
    pub fn contribute(env: Env, contributor: Address, amount: i128) -> Result<(), Error> {
        reentrancy::lock(&env);
        contributor.require_auth();

        if !storage::is_initialized(&env) {
            return Err(Error::NotInitialized);
        }
        let config = storage::load_config(&env);
        let mut state = storage::load_state(&env);

        deposit_into_pool(&env, &config, &mut state, &contributor, amount)?;

        reentrancy::unlock(&env);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────

    /// Close the escrow and pay `final_amount` to the beneficiary.
    ///
    /// Only the creator may call this, exactly once. `final_amount` must
    /// lie in `[goal, aggregate_total]`; whatever is left above it becomes
    /// the refund pool, fixed at this moment and distributed pro rata
    /// through [`FundingEscrow::claim_refund`].
    ///
    /// # Errors
    /// * `NotCreator` — caller is not the creator
    /// * `AlreadyClosed` — the escrow was already finalized
    /// * `ExceedsTotal` — `final_amount` exceeds the pooled total
    /// * `BelowGoal` — `final_amount` is under the funding goal
    pub fn finalize(env: Env, caller: Address, final_amount: i128) -> Result<(), Error> {
        reentrancy::lock(&env);
        caller.require_auth();

        if !storage::is_initialized(&env) {
            return Err(Error::NotInitialized);
        }
        let config = storage::load_config(&env);
        let mut state = storage::load_state(&env);

        if caller != config.creator {
            return Err(Error::NotCreator);
        }
        if state.closed {
            return Err(Error::AlreadyClosed);
        }
        if final_amount > state.aggregate_total {
            return Err(Error::ExceedsTotal);
        }
        if final_amount < config.goal {
            return Err(Error::BelowGoal);
        }

        state.closed = true;
        state.successful = true;
        state.finalized_amount = final_amount;
        state.refund_pool = state.aggregate_total - final_amount;
        storage::save_state(&env, &state);

        events::emit_finalized(
            &env,
            EscrowFinalized {
                success: state.successful,
                finalized_amount: final_amount,
                aggregate_total: state.aggregate_total,
            },
        );

        let token_client = token::Client::new(&env, &config.token);
        token_client.transfer(
            &env.current_contract_address(),
            &config.beneficiary,
            &final_amount,
        );

        reentrancy::unlock(&env);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Distribution
    // ─────────────────────────────────────────────────────────

    /// Withdraw the caller's proportional share of the refund pool.
    ///
    /// Pays `floor(deposited * refund_pool / aggregate_total)`, exactly
    /// once per contributor. A computed share of 0 still consumes the
    /// claim but moves no tokens. Division truncation can strand a few
    /// smallest units in the contract; that dust is never distributed.
    ///
    /// # Errors
    /// * `NotClosed` — the escrow has not been finalized yet
    /// * `NoDeposit` — caller never contributed, or already claimed
    pub fn claim_refund(env: Env, contributor: Address) -> Result<(), Error> {
        reentrancy::lock(&env);
        contributor.require_auth();

        if !storage::is_initialized(&env) {
            return Err(Error::NotInitialized);
        }
        let config = storage::load_config(&env);
        let state = storage::load_state(&env);

        if !state.closed || !state.successful {
            return Err(Error::NotClosed);
        }
        let mut record = storage::load_contributor(&env, &contributor);
        if record.deposited == 0 || record.refund_claimed {
            return Err(Error::NoDeposit);
        }

        let amount =
            math::proportional_share(record.deposited, state.refund_pool, state.aggregate_total);

        record.refund_claimed = true;
        storage::save_contributor(&env, &contributor, &record);

        events::emit_refund(
            &env,
            RefundIssued {
                contributor: contributor.clone(),
                amount,
            },
        );

        if amount > 0 {
            let token_client = token::Client::new(&env, &config.token);
            token_client.transfer(&env.current_contract_address(), &contributor, &amount);
        }

        reentrancy::unlock(&env);
        Ok(())
    }

    /// Withdraw the caller's full deposit from an escrow that closed
    /// without a successful finalize.
    ///
    /// [`FundingEscrow::finalize`] always records success, so no reachable
    /// state satisfies this entry point today; it is kept because the
    /// external interface documents it, and it fails with `NotClosed` for
    /// every escrow that is open or closed successfully.
    ///
    /// # Errors
    /// * `NotClosed` — the escrow is open, or closed in the successful state
    /// * `NoDeposit` — caller never contributed, or already claimed
    pub fn refund(env: Env, contributor: Address) -> Result<(), Error> {
        reentrancy::lock(&env);
        contributor.require_auth();

        if !storage::is_initialized(&env) {
            return Err(Error::NotInitialized);
        }
        let config = storage::load_config(&env);
        let state = storage::load_state(&env);

        if !state.closed || state.successful {
            return Err(Error::NotClosed);
        }
        let mut record = storage::load_contributor(&env, &contributor);
        if record.deposited == 0 || record.refund_claimed {
            return Err(Error::NoDeposit);
        }

        let amount = record.deposited;
        record.refund_claimed = true;
        storage::save_contributor(&env, &contributor, &record);

        events::emit_refund(
            &env,
            RefundIssued {
                contributor: contributor.clone(),
                amount,
            },
        );

        let token_client = token::Client::new(&env, &config.token);
        token_client.transfer(&env.current_contract_address(), &contributor, &amount);

        reentrancy::unlock(&env);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Cumulative amount `contributor` has deposited. 0 for unknown
    /// addresses; unchanged by claiming a refund.
    pub fn deposited_of(env: Env, contributor: Address) -> i128 {
        storage::load_contributor(&env, &contributor).deposited
    }

    /// True while the escrow still accepts contributions: not closed and
    /// the deadline has not passed.
    pub fn is_open(env: Env) -> bool {
        let config = storage::load_config(&env);
        let state = storage::load_state(&env);
        !state.closed && env.ledger().timestamp() <= config.deadline
    }

    /// True if `caller` could finalize right now: escrow open, caller is
    /// the creator, and the pooled total has reached the goal.
    pub fn can_finalize(env: Env, caller: Address) -> bool {
        let config = storage::load_config(&env);
        let state = storage::load_state(&env);
        !state.closed && caller == config.creator && state.aggregate_total >= config.goal
    }

    /// The contribution floor fixed at `init`. 0 means no floor.
    pub fn get_min_contribution(env: Env) -> i128 {
        storage::load_config(&env).min_contribution
    }

    /// Pure projection of what [`FundingEscrow::claim_refund`] would pay
    /// `contributor` right now, without consuming the claim. 0 while the
    /// escrow is open, after the claim, or for unknown addresses.
    pub fn calculate_refund(env: Env, contributor: Address) -> i128 {
        let state = storage::load_state(&env);
        let record = storage::load_contributor(&env, &contributor);
        if !state.closed || !state.successful || record.refund_claimed || record.deposited == 0 {
            return 0;
        }
        math::proportional_share(record.deposited, state.refund_pool, state.aggregate_total)
    }

    /// Combined refund status for `contributor`: whether the claim was
    /// consumed, what remains claimable, and the original deposit.
    ///
    /// For an escrow closed without success the claimable amount is the
    /// full deposit — the terminal state the legacy
    /// [`FundingEscrow::refund`] path serves.
    pub fn get_refund_status(env: Env, contributor: Address) -> RefundStatus {
        let state = storage::load_state(&env);
        let record = storage::load_contributor(&env, &contributor);

        let refundable = if !state.closed || record.refund_claimed || record.deposited == 0 {
            0
        } else if state.successful {
            math::proportional_share(record.deposited, state.refund_pool, state.aggregate_total)
        } else {
            record.deposited
        };

        RefundStatus {
            claimed: record.refund_claimed,
            refundable,
            deposited: record.deposited,
        }
    }

    /// Full escrow view, reconstructed from the split config and state
    /// storage entries.
    pub fn get_escrow(env: Env) -> EscrowInfo {
        let config = storage::load_config(&env);
        let state = storage::load_state(&env);
        EscrowInfo {
            token: config.token,
            creator: config.creator,
            beneficiary: config.beneficiary,
            goal: config.goal,
            deadline: config.deadline,
            min_contribution: config.min_contribution,
            aggregate_total: state.aggregate_total,
            closed: state.closed,
            successful: state.successful,
            finalized_amount: state.finalized_amount,
            refund_pool: state.refund_pool,
        }
    }
}

/// Shared deposit path for `init`'s seed contribution and `contribute`.
///
/// Both go through the same checks so the contribution floor cannot be
/// enforced differently at creation time than at runtime. Bookkeeping is
/// written and the event emitted before the inbound token transfer.
fn deposit_into_pool(
    env: &Env,
    config: &EscrowConfig,
    state: &mut EscrowState,
    contributor: &Address,
    amount: i128,
) -> Result<(), Error> {
    if state.closed {
        return Err(Error::AlreadyClosed);
    }
    if env.ledger().timestamp() > config.deadline {
        return Err(Error::PastDeadline);
    }
    if amount <= 0 {
        return Err(Error::InvalidParams);
    }
    if config.min_contribution > 0 && amount < config.min_contribution {
        return Err(Error::BelowMinimum);
    }

    let mut record = storage::load_contributor(env, contributor);
    record.deposited += amount;
    state.aggregate_total += amount;
    storage::save_contributor(env, contributor, &record);
    storage::save_state(env, state);

    events::emit_contribution(
        env,
        ContributionReceived {
            contributor: contributor.clone(),
            amount,
            aggregate_total: state.aggregate_total,
        },
    );

    let token_client = token::Client::new(env, &config.token);
    token_client.transfer(contributor, &env.current_contract_address(), &amount);

    Ok(())
}
