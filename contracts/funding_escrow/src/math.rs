//! Proportional refund arithmetic.
//!
//! ## Rounding policy
//!
//! Refund shares use **floor (round-down)** integer division. The pool is
//! never overpaid: across all contributors the truncation can leave up to
//! (contributors − 1) smallest units unclaimed, and that residue simply
//! stays in the contract as dust. All amounts are i128 smallest units;
//! there is no fixed-point scaling anywhere in the contract.

/// Floor of `deposited * refund_pool / aggregate_total`.
///
/// An empty pool or an empty aggregate short-circuits to 0, so the
/// division never sees a zero denominator. Stellar asset amounts fit in
/// i64, so the product fits i128 for any real token; the checked ops are
/// kept so a pathological custom token degrades to 0 instead of trapping.
pub fn proportional_share(deposited: i128, refund_pool: i128, aggregate_total: i128) -> i128 {
    if refund_pool == 0 || aggregate_total == 0 {
        return 0;
    }
    deposited
        .checked_mul(refund_pool)
        .and_then(|scaled| scaled.checked_div(aggregate_total))
        .unwrap_or(0)
}
