extern crate std;

use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events, Ledger},
    token, vec, Address, Env, IntoVal, TryIntoVal, Val, Vec,
};

use crate::events::{ContributionReceived, EscrowFinalized, EscrowInitialized, RefundIssued};
use crate::{FundingEscrow, FundingEscrowClient};

const BASE_TIME: u64 = 1_700_000_000;
const GOAL: i128 = 10_000;

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
        let sac = env.register_stellar_asset_contract_v2(admin.clone());
        let token = token::Client::new(&env, &sac.address());
        let token_admin = token::StellarAssetClient::new(&env, &sac.address());

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
            deadline: BASE_TIME + 86_400,
        }
    }

    fn init_with(&self, min_contribution: i128, initial_contribution: i128) {
        self.client.init(
            &self.creator,
            &self.token.address,
            &self.beneficiary,
            &GOAL,
            &self.deadline,
            &min_contribution,
            &initial_contribution,
        );
    }

    fn contribute(&self, amount: i128) -> Address {
        let addr = Address::generate(&self.env);
        self.token_admin.mint(&addr, &amount);
        self.client.contribute(&addr, &amount);
        addr
    }
}

/// Last event published by `contract` in the most recent invocation.
/// The escrow emits before it transfers, so the token contract's own
/// transfer event usually sits behind it in the log.
fn last_event_of(env: &Env, contract: &Address) -> (Address, Vec<Val>, Val) {
    let mut found = None;
    for event in env.events().all().iter() {
        if event.0 == *contract {
            found = Some(event);
        }
    }
    found.expect("no event published by contract")
}

#[test]
fn test_initialized_event() {
    let s = Setup::new();
    s.init_with(25, 0);

    let (contract, topics, data) = last_event_of(&s.env, &s.client.address);
    assert_eq!(contract, s.client.address);

    // Topic: (symbol_short!("init"),)
    let expected_topics = vec![&s.env, symbol_short!("init").into_val(&s.env)];
    assert_eq!(topics, expected_topics);

    let event: EscrowInitialized = data.try_into_val(&s.env).unwrap();
    assert_eq!(
        event,
        EscrowInitialized {
            creator: s.creator.clone(),
            token: s.token.address.clone(),
            beneficiary: s.beneficiary.clone(),
            goal: GOAL,
            deadline: s.deadline,
            min_contribution: 25,
        }
    );
}

#[test]
fn test_contribution_event_carries_running_total() {
    let s = Setup::new();
    s.init_with(0, 0);
    let alice = s.contribute(2_000);

    let (_, topics, data) = last_event_of(&s.env, &s.client.address);

    // Topic: (symbol_short!("contrib"), contributor)
    let expected_topics = vec![
        &s.env,
        symbol_short!("contrib").into_val(&s.env),
        alice.into_val(&s.env),
    ];
    assert_eq!(topics, expected_topics);

    let event: ContributionReceived = data.try_into_val(&s.env).unwrap();
    assert_eq!(
        event,
        ContributionReceived {
            contributor: alice.clone(),
            amount: 2_000,
            aggregate_total: 2_000,
        }
    );
}

/// An init with a seed publishes the init event first and then the same
/// contribution event a plain `contribute` would.
#[test]
fn test_seed_contribution_event_at_init() {
    let s = Setup::new();
    s.init_with(0, 5_000);

    let (_, topics, data) = last_event_of(&s.env, &s.client.address);

    let expected_topics = vec![
        &s.env,
        symbol_short!("contrib").into_val(&s.env),
        s.creator.into_val(&s.env),
    ];
    assert_eq!(topics, expected_topics);

    let event: ContributionReceived = data.try_into_val(&s.env).unwrap();
    assert_eq!(event.contributor, s.creator);
    assert_eq!(event.amount, 5_000);
    assert_eq!(event.aggregate_total, 5_000);
}

#[test]
fn test_finalized_event() {
    let s = Setup::new();
    s.init_with(0, 0);
    s.contribute(8_000);
    s.contribute(7_000);

    s.client.finalize(&s.creator, &10_000);

    let (_, topics, data) = last_event_of(&s.env, &s.client.address);

    // Topic: (symbol_short!("final"),)
    let expected_topics = vec![&s.env, symbol_short!("final").into_val(&s.env)];
    assert_eq!(topics, expected_topics);

    let event: EscrowFinalized = data.try_into_val(&s.env).unwrap();
    assert_eq!(
        event,
        EscrowFinalized {
            success: true,
            finalized_amount: 10_000,
            aggregate_total: 15_000,
        }
    );
}

#[test]
fn test_refund_event() {
    let s = Setup::new();
    s.init_with(0, 0);
    let alice = s.contribute(8_000);
    s.contribute(7_000);
    s.client.finalize(&s.creator, &10_000);

    s.client.claim_refund(&alice);

    let (_, topics, data) = last_event_of(&s.env, &s.client.address);

    // Topic: (symbol_short!("refund"), contributor)
    let expected_topics = vec![
        &s.env,
        symbol_short!("refund").into_val(&s.env),
        alice.into_val(&s.env),
    ];
    assert_eq!(topics, expected_topics);

    let event: RefundIssued = data.try_into_val(&s.env).unwrap();
    assert_eq!(
        event,
        RefundIssued {
            contributor: alice.clone(),
            amount: 2_666,
        }
    );
}

/// A zero-amount claim moves no tokens, so the refund event is the only
/// entry in the invocation's log.
#[test]
fn test_zero_refund_claim_still_emits() {
    let s = Setup::new();
    s.init_with(0, 0);
    let alice = s.contribute(10_000);
    s.client.finalize(&s.creator, &10_000);

    s.client.claim_refund(&alice);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");
    assert_eq!(last_event.0, s.client.address);

    let event: RefundIssued = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(event.contributor, alice);
    assert_eq!(event.amount, 0);
}
