//! # License Registry
//!
//! Licenses gate market creation when the protocol's enforcement toggle is on.
//! A license carries per-type feature flags, a market quota, an expiry, and
//! optional wallet/domain allow-lists. Records are admin-issued and never
//! deleted; revocation clears the active flag.

use crate::address::{derive_address, AccountId, LICENSE_TAG};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum entries in a license's domain allow-list
pub const MAX_ALLOWED_DOMAINS: usize = 5;

/// Maximum entries in a license's wallet allow-list
pub const MAX_ALLOWED_WALLETS: usize = 10;

/// Maximum domain-name length in bytes
pub const MAX_DOMAIN_LEN: usize = 64;

/// License tier; determines default quota and feature flags.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LicenseType {
    Basic,
    Pro,
    Enterprise,
    Custom,
}

impl LicenseType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LicenseType::Basic),
            1 => Some(LicenseType::Pro),
            2 => Some(LicenseType::Enterprise),
            3 => Some(LicenseType::Custom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LicenseType::Basic => "Basic",
            LicenseType::Pro => "Pro",
            LicenseType::Enterprise => "Enterprise",
            LicenseType::Custom => "Custom",
        }
    }

    /// Default market quota for the tier.
    pub fn default_max_markets(&self) -> u32 {
        match self {
            LicenseType::Basic => 5,
            LicenseType::Pro => 50,
            LicenseType::Enterprise => u32::MAX,
            LicenseType::Custom => u32::MAX,
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability flags carried by a license.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LicenseFeatures {
    pub can_create_markets: bool,
    pub can_use_oracles: bool,
    /// Wallet-locked markets
    pub can_create_private_markets: bool,
    /// Per-market fee overrides, within protocol limits
    pub can_set_custom_fees: bool,
    /// Reserved flag slots, carried through serialization untouched
    pub reserved: [bool; 4],
}

impl LicenseFeatures {
    /// Default feature set for a license tier.
    pub fn for_license_type(license_type: LicenseType) -> Self {
        match license_type {
            LicenseType::Basic | LicenseType::Custom => LicenseFeatures {
                can_create_markets: true,
                ..Default::default()
            },
            LicenseType::Pro => LicenseFeatures {
                can_create_markets: true,
                can_use_oracles: true,
                can_create_private_markets: true,
                ..Default::default()
            },
            LicenseType::Enterprise => LicenseFeatures {
                can_create_markets: true,
                can_use_oracles: true,
                can_create_private_markets: true,
                can_set_custom_fees: true,
                ..Default::default()
            },
        }
    }
}

/// Opaque 32-byte license identifier, content-addressed from an issuer-chosen
/// seed. Rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LicenseKey([u8; 32]);

impl LicenseKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a key from an issuer-chosen seed. Deterministic, so an issuer
    /// can recover the key from its own records.
    pub fn derive(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"license_key");
        hasher.update(seed);
        Self(hasher.finalize().into())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| LedgerError::InvalidIdentity(s.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Address of the license record for this key.
    pub fn address(&self) -> AccountId {
        derive_address(LICENSE_TAG, &[&self.0])
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LicenseKey({})", self.to_hex())
    }
}

impl Serialize for LicenseKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LicenseKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LicenseKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Issued capability grant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct License {
    pub license_key: LicenseKey,
    pub holder: AccountId,
    pub license_type: LicenseType,
    pub features: LicenseFeatures,
    /// Empty means any domain
    pub allowed_domains: Vec<String>,
    /// Empty means no wallet restriction; the holder is always authorized
    pub allowed_wallets: Vec<AccountId>,
    pub max_markets: u32,
    pub markets_created: u32,
    pub is_active: bool,
    pub is_transferable: bool,
    pub issued_at: i64,
    /// Unix seconds; 0 means never
    pub expires_at: i64,
    pub last_used_at: Option<i64>,
    pub issued_by: AccountId,
}

/// Issue input for a new license.
#[derive(Clone, Debug)]
pub struct LicenseParams {
    pub license_key: LicenseKey,
    pub holder: AccountId,
    pub license_type: LicenseType,
    /// Honored only for [`LicenseType::Custom`]; other tiers keep their
    /// type-derived defaults
    pub features: Option<LicenseFeatures>,
    pub allowed_domains: Vec<String>,
    pub allowed_wallets: Vec<AccountId>,
    /// 0 means the tier default
    pub max_markets: u32,
    pub is_transferable: bool,
    /// Unix seconds; 0 means never
    pub expires_at: i64,
}

/// Admin patch for an existing license; `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct LicenseUpdate {
    pub max_markets: Option<u32>,
    pub expires_at: Option<i64>,
    pub features: Option<LicenseFeatures>,
    pub is_transferable: Option<bool>,
}

impl License {
    pub fn new(params: LicenseParams, issued_by: AccountId, now: i64) -> Result<Self> {
        if params.allowed_domains.len() > MAX_ALLOWED_DOMAINS {
            return Err(LedgerError::TooManyDomains);
        }
        for domain in &params.allowed_domains {
            validate_domain(domain)?;
        }
        if params.allowed_wallets.len() > MAX_ALLOWED_WALLETS {
            return Err(LedgerError::TooManyWallets);
        }

        let license_type = params.license_type;
        let features = match (license_type, params.features) {
            (LicenseType::Custom, Some(overrides)) => overrides,
            _ => LicenseFeatures::for_license_type(license_type),
        };
        let max_markets = if params.max_markets == 0 {
            license_type.default_max_markets()
        } else {
            params.max_markets
        };

        Ok(Self {
            license_key: params.license_key,
            holder: params.holder,
            license_type,
            features,
            allowed_domains: params.allowed_domains,
            allowed_wallets: params.allowed_wallets,
            max_markets,
            markets_created: 0,
            is_active: true,
            is_transferable: params.is_transferable,
            issued_at: now,
            expires_at: params.expires_at,
            last_used_at: None,
            issued_by,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != 0 && now > self.expires_at
    }

    /// The holder is always authorized; an empty allow-list places no
    /// restriction on other wallets.
    pub fn wallet_authorized(&self, wallet: &AccountId) -> bool {
        *wallet == self.holder
            || self.allowed_wallets.is_empty()
            || self.allowed_wallets.contains(wallet)
    }

    /// An empty allow-list admits any domain, including an undeclared one; a
    /// non-empty list requires a declared, listed domain.
    pub fn domain_authorized(&self, domain: Option<&str>) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        match domain {
            Some(domain) => self.allowed_domains.iter().any(|d| d == domain),
            None => false,
        }
    }

    /// Decide whether `wallet` may create a market under this license right
    /// now. Checks run in a fixed order so callers see stable errors:
    /// active, expiry, quota, wallet, domain.
    pub fn check(&self, wallet: &AccountId, domain: Option<&str>, now: i64) -> Result<()> {
        if !self.is_active {
            return Err(LedgerError::LicenseInactive);
        }
        if self.is_expired(now) {
            return Err(LedgerError::LicenseExpired);
        }
        if self.markets_created >= self.max_markets {
            return Err(LedgerError::LicenseQuotaExceeded {
                created: self.markets_created,
                max: self.max_markets,
            });
        }
        if !self.wallet_authorized(wallet) {
            return Err(LedgerError::WalletNotAuthorized);
        }
        if !self.domain_authorized(domain) {
            return Err(LedgerError::DomainNotAuthorized);
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: LicenseUpdate) {
        if let Some(max_markets) = update.max_markets {
            self.max_markets = max_markets;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(features) = update.features {
            self.features = features;
        }
        if let Some(is_transferable) = update.is_transferable {
            self.is_transferable = is_transferable;
        }
    }
}

pub(crate) fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(LedgerError::DomainTooLong);
    }
    Ok(())
}
