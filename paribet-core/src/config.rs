//! # Protocol Configuration
//!
//! Singleton record holding the admin identity, treasury, fee schedule, the
//! license-requirement toggle, and running protocol counters. Only the admin
//! mutates it, through [`crate::ledger::Ledger::update_protocol`]; every
//! successful mutation bumps the version counter.

use crate::address::AccountId;
use crate::error::Result;
use crate::fees::FeeSchedule;
use serde::{Deserialize, Serialize};

/// Protocol-wide configuration and counters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Admin identity; the only account allowed to mutate this record
    pub authority: AccountId,
    /// Destination for protocol fees
    pub treasury: AccountId,
    pub fees: FeeSchedule,
    /// When set, market creation requires a valid license
    pub require_license: bool,
    pub total_markets: u64,
    /// Gross stake volume across all markets, in base units
    pub total_volume: u128,
    pub total_oracles: u64,
    pub total_licenses: u64,
    /// Bumped on every successful admin mutation
    pub version: u64,
}

/// Admin patch for the protocol configuration; `None` fields are left
/// unchanged.
#[derive(Clone, Debug, Default)]
pub struct ProtocolUpdate {
    pub treasury: Option<AccountId>,
    pub protocol_fee_bps: Option<u16>,
    pub creator_fee_bps: Option<u16>,
    pub pool_fee_bps: Option<u16>,
    pub require_license: Option<bool>,
}

impl ProtocolConfig {
    /// Create the initial configuration with default fees and license
    /// enforcement off.
    pub fn new(authority: AccountId, treasury: AccountId) -> Self {
        Self {
            authority,
            treasury,
            fees: FeeSchedule::default(),
            require_license: false,
            total_markets: 0,
            total_volume: 0,
            total_oracles: 0,
            total_licenses: 0,
            version: 1,
        }
    }

    /// Apply an admin patch. The merged fee schedule is validated before
    /// anything is written, so a rejected patch leaves the record untouched.
    pub fn apply_update(&mut self, update: ProtocolUpdate) -> Result<()> {
        let fees = FeeSchedule {
            protocol_bps: update.protocol_fee_bps.unwrap_or(self.fees.protocol_bps),
            creator_bps: update.creator_fee_bps.unwrap_or(self.fees.creator_bps),
            pool_bps: update.pool_fee_bps.unwrap_or(self.fees.pool_bps),
        };
        fees.validate()?;

        if let Some(treasury) = update.treasury {
            self.treasury = treasury;
        }
        if let Some(require_license) = update.require_license {
            self.require_license = require_license;
        }
        self.fees = fees;
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::fees::{DEFAULT_CREATOR_FEE_BPS, DEFAULT_POOL_FEE_BPS, DEFAULT_PROTOCOL_FEE_BPS};

    fn config() -> ProtocolConfig {
        ProtocolConfig::new(AccountId::new([0xaa; 32]), AccountId::new([0xbb; 32]))
    }

    #[test]
    fn test_initial_configuration() {
        let config = config();
        assert_eq!(config.fees.protocol_bps, DEFAULT_PROTOCOL_FEE_BPS);
        assert_eq!(config.fees.creator_bps, DEFAULT_CREATOR_FEE_BPS);
        assert_eq!(config.fees.pool_bps, DEFAULT_POOL_FEE_BPS);
        assert!(!config.require_license);
        assert_eq!(config.total_markets, 0);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let mut config = config();
        config
            .apply_update(ProtocolUpdate {
                pool_fee_bps: Some(300),
                require_license: Some(true),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.fees.pool_bps, 300);
        assert_eq!(config.fees.protocol_bps, DEFAULT_PROTOCOL_FEE_BPS);
        assert!(config.require_license);
        assert_eq!(config.treasury, AccountId::new([0xbb; 32]));
        assert_eq!(config.version, 2);
    }

    #[test]
    fn test_rejected_update_leaves_record_untouched() {
        let mut config = config();
        let before = config.clone();

        let result = config.apply_update(ProtocolUpdate {
            protocol_fee_bps: Some(600),
            pool_fee_bps: Some(500),
            require_license: Some(true),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(LedgerError::InvalidFeeConfiguration { total_bps: 1150 })
        ));
        assert_eq!(config, before);
    }

    #[test]
    fn test_version_bumps_per_successful_update() {
        let mut config = config();
        for expected in 2..5 {
            config.apply_update(ProtocolUpdate::default()).unwrap();
            assert_eq!(config.version, expected);
        }
    }
}
