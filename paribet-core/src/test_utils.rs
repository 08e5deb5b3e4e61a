//! Common test utilities for paribet-core tests.
//!
//! Shared fixtures across module and integration tests: deterministic
//! identities, a funded in-memory escrow, and standard market and oracle
//! definitions.

use crate::address::{AccountId, AssetId};
use crate::escrow::MemoryEscrow;
use crate::ledger::Ledger;
use crate::market::MarketParams;
use crate::oracle::{CategorySet, MarketCategory, OracleParams};
use sha2::{Digest, Sha256};

/// Deterministic 32-byte identity derived from a label, for reproducible
/// tests.
pub fn account(label: &str) -> AccountId {
    let mut hasher = Sha256::new();
    hasher.update(b"test_account");
    hasher.update(label.as_bytes());
    AccountId::new(hasher.finalize().into())
}

/// Stake asset used across tests.
pub fn asset() -> AssetId {
    AssetId::new([0xa5; 32])
}

/// Protocol admin identity.
pub fn admin() -> AccountId {
    account("admin")
}

/// Protocol treasury account.
pub fn treasury() -> AccountId {
    account("treasury")
}

/// Standard market creator.
pub fn creator() -> AccountId {
    account("creator")
}

/// Numbered bettor identity.
pub fn bettor(index: u8) -> AccountId {
    account(&format!("bettor-{index}"))
}

/// Fresh ledger run by [`admin`] with fees at their defaults.
pub fn new_ledger() -> Ledger {
    Ledger::new(admin(), treasury())
}

/// In-memory escrow with [`constants::FUND`] of the test asset minted to
/// each given account.
pub fn funded_escrow(accounts: &[AccountId]) -> MemoryEscrow {
    let mut escrow = MemoryEscrow::new();
    for account in accounts {
        escrow.mint(&asset(), account, constants::FUND).unwrap();
    }
    escrow
}

/// Standard Yes/No sports market definition.
pub fn market_params(market_id: u64) -> MarketParams {
    MarketParams {
        market_id,
        asset: asset(),
        category: MarketCategory::Sports,
        title: "Will the home team win the final?".to_string(),
        description: "Settles on the official result.".to_string(),
        outcomes: vec!["Yes".to_string(), "No".to_string()],
        bet_amount: constants::BET_AMOUNT,
        betting_deadline: constants::BETTING_DEADLINE,
        resolution_deadline: constants::RESOLUTION_DEADLINE,
        creator_fee_wallet: None,
        external_event_id: None,
    }
}

/// All-category oracle definition whose authority is `account("oracle-{id}")`.
pub fn oracle_params(oracle_id: u64) -> OracleParams {
    OracleParams {
        oracle_id,
        authority: account(&format!("oracle-{oracle_id}")),
        name: format!("Oracle {oracle_id}"),
        categories: CategorySet::all(),
        data_source: "https://feeds.example/results".to_string(),
    }
}

/// Common test constants
pub mod constants {
    /// Reference current time for tests (Nov 14, 2023)
    pub const NOW: i64 = 1_700_000_000;

    /// Standard betting deadline, one day past [`NOW`]
    pub const BETTING_DEADLINE: i64 = NOW + 86_400;

    /// Standard resolution deadline, two days past [`NOW`]
    pub const RESOLUTION_DEADLINE: i64 = NOW + 172_800;

    /// Fixed stake of the standard test market
    pub const BET_AMOUNT: u64 = 10_000_000;

    /// Starting balance minted to each test account
    pub const FUND: u64 = 100_000_000;
}
