//! # Identities and Deterministic Addressing
//!
//! Every on-ledger record and escrow balance lives at a 32-byte address derived
//! from a fixed domain tag plus the record's natural key. Caller identities share
//! the same 32-byte space and are asserted by the host; the ledger only ever
//! compares them for equality.

use crate::{error::Result, LedgerError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Domain tag for market record addresses
pub const MARKET_TAG: &[u8] = b"market";

/// Domain tag for bet record addresses
pub const BET_TAG: &[u8] = b"bet";

/// Domain tag for oracle record addresses
pub const ORACLE_TAG: &[u8] = b"oracle";

/// Domain tag for license record addresses
pub const LICENSE_TAG: &[u8] = b"license";

/// Domain tag for a market's stake vault balance
pub const STAKE_VAULT_TAG: &[u8] = b"stake_vault";

/// Domain tag for a market's bonus-pool vault balance
pub const BONUS_VAULT_TAG: &[u8] = b"bonus_vault";

/// A 32-byte identity: a host-asserted caller, a derived record address, or a
/// vault. Rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// Wrap raw bytes as an identity.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(parse_hex32(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccountId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of the fungible stake asset a market escrows (e.g. a token mint).
/// Opaque to the ledger; escrow balances are keyed by (asset, account).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId([u8; 32]);

impl AssetId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(parse_hex32(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.to_hex())
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AssetId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_hex32(s: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidIdentity(s.to_string()))
}

/// Derive a 32-byte address from a domain tag and the record's natural key
/// parts. SHA-256 over the tag-prefixed concatenation; all key parts are
/// fixed-width (u64 little-endian or 32-byte ids), so distinct keys can never
/// produce the same preimage.
pub fn derive_address(tag: &[u8], parts: &[&[u8]]) -> AccountId {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    AccountId(hasher.finalize().into())
}

/// Address of the market record for a caller-chosen market id.
pub fn market_address(market_id: u64) -> AccountId {
    derive_address(MARKET_TAG, &[&market_id.to_le_bytes()])
}

/// Address of the bet record for a (market, bettor) pair. One bet per pair:
/// the pair IS the record's identity.
pub fn bet_address(market: &AccountId, bettor: &AccountId) -> AccountId {
    derive_address(BET_TAG, &[market.as_bytes(), bettor.as_bytes()])
}

/// Address of the oracle record for an oracle id.
pub fn oracle_address(oracle_id: u64) -> AccountId {
    derive_address(ORACLE_TAG, &[&oracle_id.to_le_bytes()])
}

/// Escrow account holding a market's net stakes.
pub fn stake_vault_address(market: &AccountId) -> AccountId {
    derive_address(STAKE_VAULT_TAG, &[market.as_bytes()])
}

/// Escrow account holding a market's accumulated pool fees.
pub fn bonus_vault_address(market: &AccountId) -> AccountId {
    derive_address(BONUS_VAULT_TAG, &[market.as_bytes()])
}
