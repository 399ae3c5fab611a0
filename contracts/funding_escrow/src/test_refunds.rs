extern crate std;

use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, Address, Env,
};

use crate::{invariants, Error, FundingEscrow, FundingEscrowClient};

const BASE_TIME: u64 = 1_700_000_000;
const DAY: u64 = 86_400;
const GOAL: i128 = 10_000;

fn create_token_contract<'a>(
    env: &Env,
    admin: &Address,
) -> (token::Client<'a>, token::StellarAssetClient<'a>) {
    let contract = env.register_stellar_asset_contract_v2(admin.clone());
    let addr = contract.address();
    (
        token::Client::new(env, &addr),
        token::StellarAssetClient::new(env, &addr),
    )
}

struct Setup<'a> {
    env: Env,
    client: FundingEscrowClient<'a>,
    token: token::Client<'a>,
    token_admin: token::StellarAssetClient<'a>,
    creator: Address,
    beneficiary: Address,
    deadline: u64,
}

impl<'a> Setup<'a> {
    fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.ledger().set_timestamp(BASE_TIME);

        let contract_id = env.register(FundingEscrow, ());
        let client = FundingEscrowClient::new(&env, &contract_id);

        let admin = Address::generate(&env);
        let (token, token_admin) = create_token_contract(&env, &admin);

        let creator = Address::generate(&env);
        let beneficiary = Address::generate(&env);
        token_admin.mint(&creator, &1_000_000_i128);

        Self {
            env,
            client,
            token,
            token_admin,
            creator,
            beneficiary,
            deadline: BASE_TIME + DAY,
        }
    }

    fn init(&self, goal: i128) {
        self.client.init(
            &self.creator,
            &self.token.address,
            &self.beneficiary,
            &goal,
            &self.deadline,
            &0,
            &0,
        );
    }

    fn contribute(&self, amount: i128) -> Address {
        let addr = Address::generate(&self.env);
        self.token_admin.mint(&addr, &amount);
        self.client.contribute(&addr, &amount);
        addr
    }
}

/// The canonical overfunded split: a 10_000 goal, 8_000 + 7_000
/// contributed, 10_000 finalized. The 5_000 surplus pays out as
/// floor(8_000 * 5_000 / 15_000) = 2_666 and
/// floor(7_000 * 5_000 / 15_000) = 2_333, stranding 1 unit of dust.
#[test]
fn test_overfunded_split_with_dust() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);
    let bob = s.contribute(7_000);

    s.client.finalize(&s.creator, &10_000);
    assert_eq!(s.client.get_escrow().refund_pool, 5_000);

    s.client.claim_refund(&alice);
    s.client.claim_refund(&bob);

    assert_eq!(s.token.balance(&alice), 2_666);
    assert_eq!(s.token.balance(&bob), 2_333);
    assert_eq!(s.token.balance(&s.beneficiary), 10_000);
    // The floor division strands one unit in the contract forever.
    assert_eq!(s.token.balance(&s.client.address), 1);

    invariants::assert_claims_bounded_by_pool(&[2_666, 2_333], 5_000);
}

/// With nothing above the goal, a claim pays 0 but still consumes the
/// contributor's one-time claim.
#[test]
fn test_exact_goal_claim_pays_zero_and_consumes_claim() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(10_000);

    s.client.finalize(&s.creator, &10_000);
    assert_eq!(s.client.get_escrow().refund_pool, 0);

    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&alice), 0);

    let status = s.client.get_refund_status(&alice);
    assert!(status.claimed);
    assert_eq!(status.refundable, 0);
    assert_eq!(status.deposited, 10_000);

    let res = s.client.try_claim_refund(&alice);
    assert_eq!(res, Err(Ok(Error::NoDeposit)));
}

#[test]
fn test_double_claim_fails() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(15_000);

    s.client.finalize(&s.creator, &10_000);
    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&alice), 5_000);

    let res = s.client.try_claim_refund(&alice);
    assert_eq!(res, Err(Ok(Error::NoDeposit)));
    // The first payout is not repeated.
    assert_eq!(s.token.balance(&alice), 5_000);
}

#[test]
fn test_claim_before_close_fails() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);

    let res = s.client.try_claim_refund(&alice);
    assert_eq!(res, Err(Ok(Error::NotClosed)));
}

#[test]
fn test_claim_by_non_contributor_fails() {
    let s = Setup::new();
    s.init(GOAL);
    s.contribute(12_000);
    s.client.finalize(&s.creator, &10_000);

    let stranger = Address::generate(&s.env);
    let res = s.client.try_claim_refund(&stranger);
    assert_eq!(res, Err(Ok(Error::NoDeposit)));
}

/// `calculate_refund` is a pure projection of `claim_refund`: 0 while
/// open, the exact payout once closed, 0 again after the claim.
#[test]
fn test_calculate_refund_matches_actual_payout() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);
    let bob = s.contribute(7_000);

    assert_eq!(s.client.calculate_refund(&alice), 0);

    s.client.finalize(&s.creator, &10_000);
    let projected_alice = s.client.calculate_refund(&alice);
    let projected_bob = s.client.calculate_refund(&bob);
    assert_eq!(projected_alice, 2_666);
    assert_eq!(projected_bob, 2_333);

    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&alice), projected_alice);
    assert_eq!(s.client.calculate_refund(&alice), 0);

    // Alice's claim does not move Bob's projection.
    assert_eq!(s.client.calculate_refund(&bob), projected_bob);
}

#[test]
fn test_refund_status_lifecycle() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);
    s.contribute(7_000);

    let status = s.client.get_refund_status(&alice);
    assert!(!status.claimed);
    assert_eq!(status.refundable, 0);
    assert_eq!(status.deposited, 8_000);

    s.client.finalize(&s.creator, &10_000);
    let status = s.client.get_refund_status(&alice);
    assert!(!status.claimed);
    assert_eq!(status.refundable, 2_666);

    s.client.claim_refund(&alice);
    let status = s.client.get_refund_status(&alice);
    assert!(status.claimed);
    assert_eq!(status.refundable, 0);
    // The deposit record survives the claim.
    assert_eq!(status.deposited, 8_000);
    assert_eq!(s.client.deposited_of(&alice), 8_000);
}

/// Shares are fixed by the pool and aggregate at finalize, so claim
/// order cannot change anyone's payout.
#[test]
fn test_claim_order_does_not_change_shares() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);
    let bob = s.contribute(7_000);

    s.client.finalize(&s.creator, &10_000);

    s.client.claim_refund(&bob);
    s.client.claim_refund(&alice);

    assert_eq!(s.token.balance(&bob), 2_333);
    assert_eq!(s.token.balance(&alice), 2_666);
}

/// A sole contributor owns the whole aggregate, so the proportional
/// share is the whole pool and no dust is left behind.
#[test]
fn test_single_contributor_collects_entire_pool() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(15_000);

    s.client.finalize(&s.creator, &10_000);
    s.client.claim_refund(&alice);

    assert_eq!(s.token.balance(&alice), 5_000);
    assert_eq!(s.token.balance(&s.client.address), 0);
}

/// A creator seed deposit is an ordinary contribution and earns its
/// proportional share like any other.
#[test]
fn test_seed_contribution_participates_in_refunds() {
    let s = Setup::new();
    s.client.init(
        &s.creator,
        &s.token.address,
        &s.beneficiary,
        &GOAL,
        &s.deadline,
        &0,
        &5_000,
    );
    let alice = s.contribute(10_000);

    s.client.finalize(&s.creator, &10_000);

    // Pool 5_000 split over 15_000 total.
    s.client.claim_refund(&s.creator);
    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&s.creator), 1_000_000 - 5_000 + 1_666);
    assert_eq!(s.token.balance(&alice), 3_333);
    assert_eq!(s.token.balance(&s.client.address), 1);
}

/// Awkward amounts: every payout is floored individually and the sum of
/// payouts plus retained dust equals the refund pool exactly.
#[test]
fn test_refund_pool_conservation_across_many_claims() {
    let s = Setup::new();
    s.init(GOAL);
    let amounts = [3_333_i128, 3_334, 3_333, 7_000];
    let contributors: std::vec::Vec<Address> =
        amounts.iter().map(|a| s.contribute(*a)).collect();

    s.client.finalize(&s.creator, &10_000);
    let pool = s.client.get_escrow().refund_pool;
    assert_eq!(pool, 7_000);

    let expected_shares = [1_372_i128, 1_372, 1_372, 2_882];
    let mut paid = 0_i128;
    for ((contributor, deposited), share) in contributors
        .iter()
        .zip(amounts.iter())
        .zip(expected_shares.iter())
    {
        s.client.claim_refund(contributor);
        assert_eq!(s.token.balance(contributor), *share);
        assert_eq!(s.client.deposited_of(contributor), *deposited);
        paid += *share;
    }

    invariants::assert_claims_bounded_by_pool(&expected_shares, pool);
    assert_eq!(s.token.balance(&s.client.address), pool - paid);
    assert_eq!(pool - paid, 2);
}

#[test]
fn test_claim_long_after_deadline_allowed() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(15_000);
    s.client.finalize(&s.creator, &10_000);

    s.env.ledger().set_timestamp(s.deadline + 365 * DAY);
    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&alice), 5_000);
}

// ==================== LEGACY FULL-DEPOSIT REFUND ====================

/// The full-deposit `refund` path serves only escrows closed without a
/// successful finalize, and no entry point produces that state, so it
/// rejects every reachable escrow with NotClosed.
#[test]
fn test_legacy_refund_rejects_open_escrow() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(8_000);

    let res = s.client.try_refund(&alice);
    assert_eq!(res, Err(Ok(Error::NotClosed)));
}

#[test]
fn test_legacy_refund_rejects_successfully_closed_escrow() {
    let s = Setup::new();
    s.init(GOAL);
    let alice = s.contribute(15_000);
    s.client.finalize(&s.creator, &10_000);

    let res = s.client.try_refund(&alice);
    assert_eq!(res, Err(Ok(Error::NotClosed)));

    // The proportional path stays available.
    s.client.claim_refund(&alice);
    assert_eq!(s.token.balance(&alice), 5_000);
}
