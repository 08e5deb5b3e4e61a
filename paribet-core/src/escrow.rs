//! # Funds Movement Boundary
//!
//! The ledger never holds value itself; it instructs an [`Escrow`] collaborator
//! to move stake-asset balances between accounts. The host guarantees that the
//! transfers of one ledger operation and the record writes that follow them
//! commit or roll back together. The ledger checks the debited account against
//! [`Escrow::balance`] before the first leg of a multi-transfer operation, so
//! under that guarantee a conforming backend only sees transfers it can honor.

use crate::address::{AccountId, AssetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure at the escrow seam.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Debit would overdraw the source account
    #[error("Insufficient funds: account {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: AccountId,
        required: u64,
        available: u64,
    },

    /// Backend-specific refusal (e.g. a credit would overflow)
    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Asset-transfer collaborator. Balances are keyed by (asset, account);
/// markets address their value through derived vault accounts.
pub trait Escrow {
    /// Current balance of `account` in `asset`. Unknown accounts hold zero.
    fn balance(&self, asset: &AssetId, account: &AccountId) -> u64;

    /// Move `amount` of `asset` from one account to another. Must debit and
    /// credit atomically; must fail (not wrap) if the debit would overdraw.
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> std::result::Result<(), EscrowError>;
}

/// In-memory escrow for tests and single-process embedders.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryEscrow {
    balances: BTreeMap<AssetId, BTreeMap<AccountId, u64>>,
}

impl MemoryEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account out of thin air. Funding hook for tests and
    /// embedders; real deployments deposit through their own rails.
    pub fn mint(
        &mut self,
        asset: &AssetId,
        account: &AccountId,
        amount: u64,
    ) -> std::result::Result<(), EscrowError> {
        let entry = self
            .balances
            .entry(*asset)
            .or_default()
            .entry(*account)
            .or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| EscrowError::Rejected("mint would overflow balance".to_string()))?;
        Ok(())
    }
}

impl Escrow for MemoryEscrow {
    fn balance(&self, asset: &AssetId, account: &AccountId) -> u64 {
        self.balances
            .get(asset)
            .and_then(|accounts| accounts.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> std::result::Result<(), EscrowError> {
        let from_balance = self.balance(asset, from);
        if from_balance < amount {
            return Err(EscrowError::InsufficientFunds {
                account: *from,
                required: amount,
                available: from_balance,
            });
        }

        // Self-transfer is a funded no-op; writing both legs would double-count.
        if from == to || amount == 0 {
            return Ok(());
        }

        let to_balance = self.balance(asset, to);
        let credited = to_balance
            .checked_add(amount)
            .ok_or_else(|| EscrowError::Rejected("credit would overflow balance".to_string()))?;

        let accounts = self.balances.entry(*asset).or_default();
        accounts.insert(*from, from_balance - amount);
        accounts.insert(*to, credited);
        Ok(())
    }
}
