//! # Project Directory Contract
//!
//! Append-only on-chain registry mapping sequential ids to deployed
//! funding escrow instances, so wallets and indexers can discover
//! projects without scanning the ledger. The directory never calls
//! into the escrows it lists; a listing is a pointer, not an
//! endorsement, and a bogus entry cannot touch anyone's funds.
//!
//! Ids are assigned 1, 2, 3, … in registration order. Id 0 is never
//! assigned, so `lookup(0)` always fails. Entries cannot be updated or
//! removed; there are no entry points for either.

#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, Env, String,
};


const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const ENTRY_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const ENTRY_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    InvalidParams = 1,
    NotFound = 2,
}

/// One directory listing. `name` and `metadata` are stored verbatim;
/// `metadata` is a free-form pointer (URL, IPFS hash, JSON blob) the
/// contract never interprets.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectEntry {
    pub id: u64,
    pub owner: Address,
    pub escrow: Address,
    pub name: String,
    pub metadata: String,
}

/// Emitted for every new listing. Topic: `("register", id)`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectRegistered {
    pub id: u64,
    pub owner: Address,
    pub escrow: Address,
    pub name: String,
}

#[contracttype]
pub enum DataKey {
    /// Highest assigned id (Instance). Missing means no entries yet.
    Count,
    /// Directory listing by id (Persistent).
    Entry(u64),
}

#[contract]
pub struct ProjectDirectory;

#[contractimpl]
impl ProjectDirectory {
    /// List a project. Returns the assigned id; the first entry gets 1.
    ///
    /// # Errors
    /// * `InvalidParams` — `name` is empty
    pub fn register(
        env: Env,
        owner: Address,
        name: String,
        escrow: Address,
        metadata: String,
    ) -> Result<u64, Error> {
        owner.require_auth();

        if name.len() == 0 {
            return Err(Error::InvalidParams);
        }

        let id = next_id(&env);
        let entry = ProjectEntry {
            id,
            owner: owner.clone(),
            escrow: escrow.clone(),
            name: name.clone(),
            metadata,
        };
        let key = DataKey::Entry(id);
        env.storage().persistent().set(&key, &entry);
        env.storage()
            .persistent()
            .extend_ttl(&key, ENTRY_LIFETIME_THRESHOLD, ENTRY_BUMP_AMOUNT);

        env.events().publish(
            (symbol_short!("register"), id),
            ProjectRegistered {
                id,
                owner,
                escrow,
                name,
            },
        );

        Ok(id)
    }

    /// Fetch a listing by id.
    ///
    /// # Errors
    /// * `NotFound` — `id` is 0 or has not been assigned
    pub fn lookup(env: Env, id: u64) -> Result<ProjectEntry, Error> {
        if id == 0 {
            return Err(Error::NotFound);
        }
        let key = DataKey::Entry(id);
        match env.storage().persistent().get(&key) {
            Some(entry) => {
                env.storage().persistent().extend_ttl(
                    &key,
                    ENTRY_LIFETIME_THRESHOLD,
                    ENTRY_BUMP_AMOUNT,
                );
                Ok(entry)
            }
            None => Err(Error::NotFound),
        }
    }

    /// Number of listings, which equals the highest assigned id.
    pub fn count(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::Count)
            .unwrap_or(0u64)
    }
}

/// Advance the id counter and return the newly assigned id. Ids start
/// at 1; 0 stays permanently unassigned.
fn next_id(env: &Env) -> u64 {
    let current: u64 = env
        .storage()
        .instance()
        .get(&DataKey::Count)
        .unwrap_or(0u64);
    let id = current + 1;
    env.storage().instance().set(&DataKey::Count, &id);
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    id
}
