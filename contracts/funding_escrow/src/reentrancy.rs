//! Reentrancy guard.
//!
//! Every state-changing entry point performs an external token transfer.
//! State is always written before the transfer, and this flag rejects any
//! attempt by the transfer's execution to re-enter contribute/finalize/
//! claim_refund/refund before the outer call returns. Soroban rolls back
//! all storage on panic or `Err` return, so the flag cannot get
//! permanently stuck.

use soroban_sdk::Env;

use crate::storage::DataKey;

/// Take the guard for the duration of a guarded entry point.
///
/// # Panics
/// Panics with `"reentrant call"` if the guard is already held.
pub fn lock(env: &Env) {
    let held: bool = env
        .storage()
        .instance()
        .get(&DataKey::Guard)
        .unwrap_or(false);
    if held {
        panic!("reentrant call");
    }
    env.storage().instance().set(&DataKey::Guard, &true);
}

/// Release the guard on the way out of a guarded entry point.
pub fn unlock(env: &Env) {
    env.storage().instance().set(&DataKey::Guard, &false);
}
