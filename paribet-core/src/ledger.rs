//! # Ledger Operations
//!
//! The central state machine. A [`Ledger`] owns every market, bet, oracle,
//! and license record plus the protocol configuration, and exposes the whole
//! operation surface: market lifecycle, stake movement through an [`Escrow`],
//! the oracle and license registries, and read accessors.
//!
//! The ledger never reads a clock and never authenticates anyone. Callers
//! supply an asserted identity and the current unix time with each call;
//! the ledger compares identities for equality and timestamps against the
//! stored deadlines, nothing more.
//!
//! Every operation orders its fallible work (validation, checked arithmetic,
//! escrow movement) ahead of the first record write. A failed call returns
//! an error and leaves all records exactly as they were.

use crate::address::{
    bet_address, bonus_vault_address, market_address, oracle_address, stake_vault_address,
    AccountId,
};
use crate::config::{ProtocolConfig, ProtocolUpdate};
use crate::error::{LedgerError, Result};
use crate::escrow::Escrow;
use crate::fees::{compute_fees, compute_potential_winnings};
use crate::license::{
    License, LicenseKey, LicenseParams, LicenseUpdate, MAX_ALLOWED_DOMAINS, MAX_ALLOWED_WALLETS,
};
use crate::market::{Bet, Market, MarketParams, MarketStatus, MAX_EVENT_ID_LEN};
use crate::oracle::{Oracle, OracleParams, OracleUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Complete ledger state: configuration plus every record, keyed by derived
/// address. Serializes to a deterministic JSON document, so two ledgers that
/// went through the same operations render byte-identically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    config: ProtocolConfig,
    markets: BTreeMap<AccountId, Market>,
    bets: BTreeMap<AccountId, Bet>,
    oracles: BTreeMap<AccountId, Oracle>,
    licenses: BTreeMap<AccountId, License>,
}

impl Ledger {
    /// Create an empty ledger with default fees and license enforcement off.
    pub fn new(authority: AccountId, treasury: AccountId) -> Self {
        Self {
            config: ProtocolConfig::new(authority, treasury),
            markets: BTreeMap::new(),
            bets: BTreeMap::new(),
            oracles: BTreeMap::new(),
            licenses: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Protocol administration
    // ------------------------------------------------------------------

    /// Apply an admin patch to the protocol configuration.
    pub fn update_protocol(&mut self, caller: &AccountId, update: ProtocolUpdate) -> Result<()> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized);
        }
        self.config.apply_update(update)?;
        info!(
            version = self.config.version,
            protocol_bps = self.config.fees.protocol_bps,
            creator_bps = self.config.fees.creator_bps,
            pool_bps = self.config.fees.pool_bps,
            require_license = self.config.require_license,
            "Protocol configuration updated"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Oracle registry
    // ------------------------------------------------------------------

    /// Register a new oracle. Admin only; the oracle's own authority is
    /// carried in `params` and is what resolution later checks.
    pub fn register_oracle(
        &mut self,
        caller: &AccountId,
        params: OracleParams,
        now: i64,
    ) -> Result<AccountId> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized);
        }
        let oracle_id = params.oracle_id;
        let address = oracle_address(oracle_id);
        if self.oracles.contains_key(&address) {
            return Err(LedgerError::OracleAlreadyExists { oracle_id });
        }
        let oracle = Oracle::new(params, now)?;
        let total_oracles = self
            .config
            .total_oracles
            .checked_add(1)
            .ok_or(LedgerError::Overflow("oracle counter"))?;

        self.config.total_oracles = total_oracles;
        info!(oracle_id, name = %oracle.name, "Oracle registered");
        self.oracles.insert(address, oracle);
        Ok(address)
    }

    /// Update oracle settings. Admin only.
    pub fn update_oracle(
        &mut self,
        caller: &AccountId,
        oracle_id: u64,
        update: OracleUpdate,
    ) -> Result<()> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized);
        }
        let oracle = self
            .oracles
            .get_mut(&oracle_address(oracle_id))
            .ok_or(LedgerError::OracleNotFound { oracle_id })?;
        oracle.apply_update(update)?;
        info!(oracle_id, name = %oracle.name, "Oracle updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // License registry
    // ------------------------------------------------------------------

    /// Issue a license. Admin only; duplicate keys are rejected.
    pub fn issue_license(
        &mut self,
        caller: &AccountId,
        params: LicenseParams,
        now: i64,
    ) -> Result<AccountId> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized);
        }
        let address = params.license_key.address();
        if self.licenses.contains_key(&address) {
            return Err(LedgerError::LicenseAlreadyExists);
        }
        let license = License::new(params, *caller, now)?;
        let total_licenses = self
            .config
            .total_licenses
            .checked_add(1)
            .ok_or(LedgerError::Overflow("license counter"))?;

        self.config.total_licenses = total_licenses;
        info!(
            holder = %license.holder,
            license_type = %license.license_type,
            "License issued"
        );
        self.licenses.insert(address, license);
        Ok(address)
    }

    /// Deactivate a license. Admin only; the record stays.
    pub fn revoke_license(&mut self, caller: &AccountId, key: &LicenseKey) -> Result<()> {
        let license = self.admin_license_mut(caller, key)?;
        license.is_active = false;
        info!(holder = %license.holder, "License revoked");
        Ok(())
    }

    /// Reactivate a previously revoked license. Admin only.
    pub fn activate_license(&mut self, caller: &AccountId, key: &LicenseKey) -> Result<()> {
        let license = self.admin_license_mut(caller, key)?;
        license.is_active = true;
        info!(holder = %license.holder, "License activated");
        Ok(())
    }

    /// Patch quota, expiry, features, or transferability. Admin only.
    pub fn update_license(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        update: LicenseUpdate,
    ) -> Result<()> {
        let license = self.admin_license_mut(caller, key)?;
        license.apply_update(update);
        info!(holder = %license.holder, "License updated");
        Ok(())
    }

    /// Hand the license to a new holder. Current holder only, and only when
    /// the license was issued transferable. The wallet allow-list is cleared
    /// so grants made by the old holder do not carry over.
    pub fn transfer_license(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        new_holder: AccountId,
    ) -> Result<()> {
        let license = self.holder_license_mut(caller, key)?;
        if !license.is_transferable {
            return Err(LedgerError::LicenseNotTransferable);
        }
        let old_holder = license.holder;
        license.holder = new_holder;
        license.allowed_wallets.clear();
        info!(from = %old_holder, to = %new_holder, "License transferred");
        Ok(())
    }

    /// Grant a wallet the right to create markets under this license.
    /// Holder only; adding a present entry is a no-op.
    pub fn add_authorized_wallet(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        wallet: AccountId,
    ) -> Result<()> {
        let license = self.holder_license_mut(caller, key)?;
        if license.allowed_wallets.len() >= MAX_ALLOWED_WALLETS {
            return Err(LedgerError::TooManyWallets);
        }
        if !license.allowed_wallets.contains(&wallet) {
            license.allowed_wallets.push(wallet);
            debug!(wallet = %wallet, "Wallet added to license");
        }
        Ok(())
    }

    /// Remove a wallet grant. Holder only; removing an absent entry is a
    /// no-op.
    pub fn remove_authorized_wallet(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        wallet: &AccountId,
    ) -> Result<()> {
        let license = self.holder_license_mut(caller, key)?;
        license.allowed_wallets.retain(|w| w != wallet);
        debug!(wallet = %wallet, "Wallet removed from license");
        Ok(())
    }

    /// Add a domain to the license allow-list. Holder only.
    pub fn add_authorized_domain(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        domain: String,
    ) -> Result<()> {
        let license = self.holder_license_mut(caller, key)?;
        if license.allowed_domains.len() >= MAX_ALLOWED_DOMAINS {
            return Err(LedgerError::TooManyDomains);
        }
        crate::license::validate_domain(&domain)?;
        if !license.allowed_domains.contains(&domain) {
            debug!(domain = %domain, "Domain added to license");
            license.allowed_domains.push(domain);
        }
        Ok(())
    }

    /// Remove a domain from the allow-list. Holder only.
    pub fn remove_authorized_domain(
        &mut self,
        caller: &AccountId,
        key: &LicenseKey,
        domain: &str,
    ) -> Result<()> {
        let license = self.holder_license_mut(caller, key)?;
        license.allowed_domains.retain(|d| d != domain);
        debug!(domain = %domain, "Domain removed from license");
        Ok(())
    }

    fn admin_license_mut(&mut self, caller: &AccountId, key: &LicenseKey) -> Result<&mut License> {
        if *caller != self.config.authority {
            return Err(LedgerError::Unauthorized);
        }
        self.licenses
            .get_mut(&key.address())
            .ok_or(LedgerError::LicenseNotFound)
    }

    fn holder_license_mut(&mut self, caller: &AccountId, key: &LicenseKey) -> Result<&mut License> {
        let license = self
            .licenses
            .get_mut(&key.address())
            .ok_or(LedgerError::LicenseNotFound)?;
        if license.holder != *caller {
            return Err(LedgerError::Unauthorized);
        }
        Ok(license)
    }

    // ------------------------------------------------------------------
    // Market lifecycle
    // ------------------------------------------------------------------

    /// Create a market. Input bounds are enforced first, then the license
    /// decision when enforcement is on. On success the creator's license
    /// usage and the protocol market counter move atomically with the
    /// insert.
    ///
    /// # Arguments
    ///
    /// * `caller` - Creator identity asserted by the host
    /// * `params` - Market definition; see [`MarketParams`]
    /// * `license_key` - License to create under, required only when the
    ///   protocol demands one
    /// * `domain` - Origin domain declared by the caller, checked against
    ///   the license's domain allow-list
    /// * `now` - Current unix time in seconds
    ///
    /// # Returns
    ///
    /// Address of the new market record.
    pub fn create_market(
        &mut self,
        caller: &AccountId,
        params: MarketParams,
        license_key: Option<&LicenseKey>,
        domain: Option<&str>,
        now: i64,
    ) -> Result<AccountId> {
        let market_id = params.market_id;
        let address = market_address(market_id);
        if self.markets.contains_key(&address) {
            return Err(LedgerError::MarketAlreadyExists { market_id });
        }

        let market = Market::new(params, *caller, now)?;

        let license_address = if self.config.require_license {
            let key = license_key.ok_or(LedgerError::LicenseRequired)?;
            let license_address = key.address();
            let license = self
                .licenses
                .get(&license_address)
                .ok_or(LedgerError::LicenseNotFound)?;
            license.check(caller, domain, now)?;
            if !license.features.can_create_markets {
                return Err(LedgerError::FeatureDisabled);
            }
            Some(license_address)
        } else {
            None
        };

        let total_markets = self
            .config
            .total_markets
            .checked_add(1)
            .ok_or(LedgerError::Overflow("market counter"))?;

        if let Some(license_address) = license_address {
            if let Some(license) = self.licenses.get_mut(&license_address) {
                // The quota check above bounds markets_created strictly
                // below max_markets, so the increment cannot overflow.
                license.markets_created += 1;
                license.last_used_at = Some(now);
            }
        }
        self.config.total_markets = total_markets;
        info!(
            market_id,
            category = %market.category,
            outcomes = market.outcomes.len(),
            bet_amount = market.bet_amount,
            "Market created"
        );
        self.markets.insert(address, market);
        Ok(address)
    }

    /// Attach an oracle to an open market for automated resolution.
    /// Creator only; the oracle is vetted for liveness and category fit at
    /// assignment so a dead reference is caught early, and vetted again at
    /// resolution time.
    pub fn assign_oracle(
        &mut self,
        caller: &AccountId,
        market_id: u64,
        oracle_id: u64,
        external_event_id: Option<String>,
    ) -> Result<()> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        if market.creator != *caller {
            return Err(LedgerError::Unauthorized);
        }
        if market.has_oracle() {
            return Err(LedgerError::MarketAlreadyHasOracle);
        }
        if let Some(event_id) = &external_event_id {
            if event_id.len() > MAX_EVENT_ID_LEN {
                return Err(LedgerError::EventIdTooLong);
            }
        }
        let oracle_addr = oracle_address(oracle_id);
        let oracle = self
            .oracles
            .get(&oracle_addr)
            .ok_or(LedgerError::OracleNotFound { oracle_id })?;
        if !oracle.is_active {
            return Err(LedgerError::OracleInactive);
        }
        if !oracle.covers(market.category) {
            return Err(LedgerError::OracleCategoryMismatch {
                category: market.category.name(),
            });
        }

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.oracle = Some(oracle_addr);
            if external_event_id.is_some() {
                market.external_event_id = external_event_id;
            }
        }
        info!(market_id, oracle_id, "Oracle assigned to market");
        Ok(())
    }

    /// Escrow the fixed stake on one outcome of an open market.
    ///
    /// The stake splits against the current fee schedule, not a per-market
    /// snapshot: net stake to the market's stake vault, pool fee to its
    /// bonus vault, protocol fee to the treasury, creator fee to the
    /// creator's fee wallet. One bet per caller per market.
    ///
    /// # Returns
    ///
    /// Address of the new bet record.
    pub fn place_bet(
        &mut self,
        escrow: &mut dyn Escrow,
        caller: &AccountId,
        market_id: u64,
        outcome_index: u8,
        now: i64,
    ) -> Result<AccountId> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        if market.betting_closed(now) {
            return Err(LedgerError::BettingClosed);
        }
        if (outcome_index as usize) >= market.outcomes.len() {
            return Err(LedgerError::InvalidOutcome {
                index: outcome_index,
                count: market.outcomes.len(),
            });
        }
        let bet_addr = bet_address(&market_addr, caller);
        if self.bets.contains_key(&bet_addr) {
            return Err(LedgerError::AlreadyBet);
        }

        let amount = market.bet_amount;
        let breakdown = compute_fees(amount, &self.config.fees);

        let available = escrow.balance(&market.asset, caller);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *caller,
                required: amount,
                available,
            });
        }

        let total_pool = market
            .total_pool
            .checked_add(breakdown.net_amount)
            .ok_or(LedgerError::Overflow("market stake pool"))?;
        let bonus_pool = market
            .bonus_pool
            .checked_add(breakdown.pool_fee)
            .ok_or(LedgerError::Overflow("market bonus pool"))?;
        let outcome = &market.outcomes[outcome_index as usize];
        let outcome_total = outcome
            .total_amount
            .checked_add(breakdown.net_amount)
            .ok_or(LedgerError::Overflow("outcome total"))?;
        let bettor_count = outcome
            .bettor_count
            .checked_add(1)
            .ok_or(LedgerError::Overflow("outcome bettor count"))?;
        let total_volume = self
            .config
            .total_volume
            .checked_add(amount as u128)
            .ok_or(LedgerError::Overflow("protocol volume"))?;

        let asset = market.asset;
        let treasury = self.config.treasury;
        let creator_fee_wallet = market.creator_fee_wallet;
        let stake_vault = stake_vault_address(&market_addr);
        let bonus_vault = bonus_vault_address(&market_addr);

        // The balance check above covers the whole stake, so none of these
        // legs can come up short.
        escrow.transfer(&asset, caller, &stake_vault, breakdown.net_amount)?;
        escrow.transfer(&asset, caller, &bonus_vault, breakdown.pool_fee)?;
        escrow.transfer(&asset, caller, &treasury, breakdown.protocol_fee)?;
        escrow.transfer(&asset, caller, &creator_fee_wallet, breakdown.creator_fee)?;

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.total_pool = total_pool;
            market.bonus_pool = bonus_pool;
            let outcome = &mut market.outcomes[outcome_index as usize];
            outcome.total_amount = outcome_total;
            outcome.bettor_count = bettor_count;
        }
        self.config.total_volume = total_volume;
        let bet = Bet {
            market: market_addr,
            bettor: *caller,
            outcome_index,
            original_amount: amount,
            pool_amount: breakdown.net_amount,
            claimed: false,
            placed_at: now,
        };
        debug!(
            market_id,
            outcome_index,
            amount,
            net = breakdown.net_amount,
            "Bet placed"
        );
        self.bets.insert(bet_addr, bet);
        Ok(bet_addr)
    }

    /// Take back a stake while the betting window is still open. Returns
    /// the net amount; fees are not refunded.
    pub fn withdraw_bet(
        &mut self,
        escrow: &mut dyn Escrow,
        caller: &AccountId,
        market_id: u64,
        now: i64,
    ) -> Result<u64> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        let bet_addr = bet_address(&market_addr, caller);
        let bet = self
            .bets
            .get(&bet_addr)
            .ok_or(LedgerError::BetNotFound { market_id })?;
        if bet.claimed {
            return Err(LedgerError::AlreadyClaimed);
        }
        if market.betting_closed(now) {
            return Err(LedgerError::BettingClosed);
        }

        let amount = bet.pool_amount;
        let outcome_index = bet.outcome_index as usize;
        let total_pool = market
            .total_pool
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow("market stake pool"))?;
        let outcome = &market.outcomes[outcome_index];
        let outcome_total = outcome
            .total_amount
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow("outcome total"))?;
        let bettor_count = outcome
            .bettor_count
            .checked_sub(1)
            .ok_or(LedgerError::Overflow("outcome bettor count"))?;
        let asset = market.asset;
        let stake_vault = stake_vault_address(&market_addr);

        escrow.transfer(&asset, &stake_vault, caller, amount)?;

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.total_pool = total_pool;
            let outcome = &mut market.outcomes[outcome_index];
            outcome.total_amount = outcome_total;
            outcome.bettor_count = bettor_count;
        }
        if let Some(bet) = self.bets.get_mut(&bet_addr) {
            bet.claimed = true;
        }
        debug!(market_id, amount, "Bet withdrawn");
        Ok(amount)
    }

    /// Settle an open market on one outcome. Creator only, once the betting
    /// window has closed.
    pub fn resolve_market(
        &mut self,
        caller: &AccountId,
        market_id: u64,
        winning_outcome: u8,
        now: i64,
    ) -> Result<()> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        if market.creator != *caller {
            return Err(LedgerError::Unauthorized);
        }
        if (winning_outcome as usize) >= market.outcomes.len() {
            return Err(LedgerError::InvalidOutcome {
                index: winning_outcome,
                count: market.outcomes.len(),
            });
        }
        if !market.betting_closed(now) {
            return Err(LedgerError::BettingNotClosed);
        }

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.status = MarketStatus::Resolved;
            market.winning_outcome = Some(winning_outcome);
            market.resolved_at = Some(now);
            market.resolved_by_oracle = false;
        }
        info!(market_id, winning_outcome, "Market resolved by creator");
        Ok(())
    }

    /// Settle an open market through its assigned oracle. The caller must
    /// be the oracle's authority; the oracle must still be active and still
    /// cover the market's category.
    pub fn oracle_resolve_market(
        &mut self,
        caller: &AccountId,
        market_id: u64,
        winning_outcome: u8,
        now: i64,
    ) -> Result<()> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        let oracle_addr = market.oracle.ok_or(LedgerError::OracleNotAssigned)?;
        let oracle = self
            .oracles
            .get(&oracle_addr)
            .ok_or(LedgerError::OracleNotAssigned)?;
        if !oracle.is_active {
            return Err(LedgerError::OracleInactive);
        }
        if oracle.authority != *caller {
            return Err(LedgerError::Unauthorized);
        }
        if (winning_outcome as usize) >= market.outcomes.len() {
            return Err(LedgerError::InvalidOutcome {
                index: winning_outcome,
                count: market.outcomes.len(),
            });
        }
        if !oracle.covers(market.category) {
            return Err(LedgerError::OracleCategoryMismatch {
                category: market.category.name(),
            });
        }
        if !market.betting_closed(now) {
            return Err(LedgerError::BettingNotClosed);
        }
        let markets_resolved = oracle
            .markets_resolved
            .checked_add(1)
            .ok_or(LedgerError::Overflow("oracle resolution counter"))?;

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.status = MarketStatus::Resolved;
            market.winning_outcome = Some(winning_outcome);
            market.resolved_at = Some(now);
            market.resolved_by_oracle = true;
        }
        if let Some(oracle) = self.oracles.get_mut(&oracle_addr) {
            oracle.markets_resolved = markets_resolved;
            oracle.last_resolution_at = Some(now);
        }
        info!(market_id, winning_outcome, "Market resolved by oracle");
        Ok(())
    }

    /// Call off an open market. Creator only, allowed at any time while
    /// Open. Bettors recover their net stakes through [`Self::claim_refund`];
    /// fees already paid out stay where they went.
    pub fn cancel_market(&mut self, caller: &AccountId, market_id: u64) -> Result<()> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if !market.is_open() {
            return Err(LedgerError::MarketNotOpen);
        }
        if market.creator != *caller {
            return Err(LedgerError::Unauthorized);
        }

        if let Some(market) = self.markets.get_mut(&market_addr) {
            market.status = MarketStatus::Cancelled;
        }
        info!(market_id, "Market cancelled");
        Ok(())
    }

    /// Pay out a winning bet on a resolved market.
    ///
    /// The payout is drawn from the stake vault first and the bonus vault
    /// for the remainder, and the bet is marked claimed atomically with the
    /// transfer.
    ///
    /// # Returns
    ///
    /// The amount paid out.
    pub fn claim_winnings(
        &mut self,
        escrow: &mut dyn Escrow,
        caller: &AccountId,
        market_id: u64,
    ) -> Result<u64> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if market.status != MarketStatus::Resolved {
            return Err(LedgerError::MarketNotResolved);
        }
        let bet_addr = bet_address(&market_addr, caller);
        let bet = self
            .bets
            .get(&bet_addr)
            .ok_or(LedgerError::BetNotFound { market_id })?;
        if bet.claimed {
            return Err(LedgerError::AlreadyClaimed);
        }
        let payout = market.winnings_for(bet)?;

        let asset = market.asset;
        let stake_vault = stake_vault_address(&market_addr);
        let bonus_vault = bonus_vault_address(&market_addr);

        let stake_draw = payout.min(escrow.balance(&asset, &stake_vault));
        let bonus_draw = payout - stake_draw;
        if stake_draw > 0 {
            escrow.transfer(&asset, &stake_vault, caller, stake_draw)?;
        }
        if bonus_draw > 0 {
            escrow.transfer(&asset, &bonus_vault, caller, bonus_draw)?;
        }

        if let Some(bet) = self.bets.get_mut(&bet_addr) {
            bet.claimed = true;
        }
        info!(market_id, payout, "Winnings claimed");
        Ok(payout)
    }

    /// Recover the net stake of a bet on a cancelled market. Fees are not
    /// returned.
    ///
    /// # Returns
    ///
    /// The amount refunded.
    pub fn claim_refund(
        &mut self,
        escrow: &mut dyn Escrow,
        caller: &AccountId,
        market_id: u64,
    ) -> Result<u64> {
        let market_addr = market_address(market_id);
        let market = self
            .markets
            .get(&market_addr)
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if market.status != MarketStatus::Cancelled {
            return Err(LedgerError::MarketNotCancelled);
        }
        let bet_addr = bet_address(&market_addr, caller);
        let bet = self
            .bets
            .get(&bet_addr)
            .ok_or(LedgerError::BetNotFound { market_id })?;
        if bet.claimed {
            return Err(LedgerError::AlreadyClaimed);
        }

        let amount = bet.pool_amount;
        let asset = market.asset;
        let stake_vault = stake_vault_address(&market_addr);

        escrow.transfer(&asset, &stake_vault, caller, amount)?;

        if let Some(bet) = self.bets.get_mut(&bet_addr) {
            bet.claimed = true;
        }
        info!(market_id, amount, "Refund claimed");
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Estimate the payout a new fixed-stake bet on `outcome_index` would
    /// earn if that outcome won with the pools as they stand, under the
    /// current fee schedule. Later bets shift the estimate.
    pub fn potential_winnings(&self, market_id: u64, outcome_index: u8) -> Result<u64> {
        let market = self
            .markets
            .get(&market_address(market_id))
            .ok_or(LedgerError::MarketNotFound { market_id })?;
        if (outcome_index as usize) >= market.outcomes.len() {
            return Err(LedgerError::InvalidOutcome {
                index: outcome_index,
                count: market.outcomes.len(),
            });
        }
        compute_potential_winnings(
            market.bet_amount,
            market.outcomes[outcome_index as usize].total_amount,
            market.total_pool,
            market.bonus_pool,
            &self.config.fees,
        )
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn market(&self, market_id: u64) -> Option<&Market> {
        self.markets.get(&market_address(market_id))
    }

    pub fn bet(&self, market_id: u64, bettor: &AccountId) -> Option<&Bet> {
        self.bets.get(&bet_address(&market_address(market_id), bettor))
    }

    pub fn oracle(&self, oracle_id: u64) -> Option<&Oracle> {
        self.oracles.get(&oracle_address(oracle_id))
    }

    pub fn license(&self, key: &LicenseKey) -> Option<&License> {
        self.licenses.get(&key.address())
    }

    /// All markets, in address order.
    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Serialize the full ledger state to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a ledger from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::license::{LicenseFeatures, LicenseType};
    use crate::oracle::{CategorySet, MarketCategory};
    use crate::test_utils::constants::{BETTING_DEADLINE, BET_AMOUNT, FUND, NOW};
    use crate::test_utils::{
        account, admin, asset, bettor, creator, funded_escrow, market_params, new_ledger,
        oracle_params, treasury,
    };

    fn license_params(holder: AccountId, license_type: LicenseType) -> LicenseParams {
        LicenseParams {
            license_key: LicenseKey::derive(b"ledger-test-license"),
            holder,
            license_type,
            features: None,
            allowed_domains: vec![],
            allowed_wallets: vec![],
            max_markets: 0,
            is_transferable: false,
            expires_at: 0,
        }
    }

    #[test]
    fn test_create_market_records_and_counters() {
        let mut ledger = new_ledger();
        let address = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();

        assert_eq!(address, market_address(1));
        let market = ledger.market(1).unwrap();
        assert_eq!(market.status, MarketStatus::Open);
        assert_eq!(market.creator, creator());
        assert_eq!(market.total_pool, 0);
        assert_eq!(ledger.config().total_markets, 1);
    }

    #[test]
    fn test_create_market_duplicate_id() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let err = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap_err();
        assert!(matches!(err, LedgerError::MarketAlreadyExists { market_id: 1 }));
        assert_eq!(err.kind(), ErrorKind::StateViolation);
        assert_eq!(ledger.config().total_markets, 1);
    }

    #[test]
    fn test_create_market_input_rejected_before_license_check() {
        let mut ledger = new_ledger();
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    require_license: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        // Bad input fails on its own terms even with no license supplied.
        let mut params = market_params(1);
        params.outcomes.truncate(1);
        assert!(matches!(
            ledger.create_market(&creator(), params, None, None, NOW),
            Err(LedgerError::InvalidOutcomeCount { count: 1 })
        ));
    }

    #[test]
    fn test_create_market_license_enforcement() {
        let mut ledger = new_ledger();
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    require_license: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), None, None, NOW),
            Err(LedgerError::LicenseRequired)
        ));

        let key = LicenseKey::derive(b"ledger-test-license");
        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), Some(&key), None, NOW),
            Err(LedgerError::LicenseNotFound)
        ));

        ledger
            .issue_license(&admin(), license_params(creator(), LicenseType::Basic), NOW)
            .unwrap();
        ledger
            .create_market(&creator(), market_params(1), Some(&key), None, NOW)
            .unwrap();

        let license = ledger.license(&key).unwrap();
        assert_eq!(license.markets_created, 1);
        assert_eq!(license.last_used_at, Some(NOW));
        assert_eq!(ledger.config().total_licenses, 1);
    }

    #[test]
    fn test_create_market_license_gates() {
        let mut ledger = new_ledger();
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    require_license: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let key = LicenseKey::derive(b"ledger-test-license");
        ledger
            .issue_license(&admin(), license_params(creator(), LicenseType::Basic), NOW)
            .unwrap();

        ledger.revoke_license(&admin(), &key).unwrap();
        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), Some(&key), None, NOW),
            Err(LedgerError::LicenseInactive)
        ));
        ledger.activate_license(&admin(), &key).unwrap();

        ledger
            .update_license(
                &admin(),
                &key,
                LicenseUpdate {
                    expires_at: Some(NOW - 1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), Some(&key), None, NOW),
            Err(LedgerError::LicenseExpired)
        ));
        ledger
            .update_license(
                &admin(),
                &key,
                LicenseUpdate {
                    expires_at: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();

        // A custom license with market creation switched off trips the
        // feature gate after the allow-list checks pass.
        let custom_key = LicenseKey::derive(b"custom-no-create");
        let mut custom = license_params(creator(), LicenseType::Custom);
        custom.license_key = custom_key;
        custom.features = Some(LicenseFeatures::default());
        ledger.issue_license(&admin(), custom, NOW).unwrap();
        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), Some(&custom_key), None, NOW),
            Err(LedgerError::FeatureDisabled)
        ));

        // Domain allow-list applies to the declared origin.
        ledger
            .add_authorized_domain(&creator(), &key, "markets.example".to_string())
            .unwrap();
        assert!(matches!(
            ledger.create_market(&creator(), market_params(1), Some(&key), None, NOW),
            Err(LedgerError::DomainNotAuthorized)
        ));
        ledger
            .create_market(
                &creator(),
                market_params(1),
                Some(&key),
                Some("markets.example"),
                NOW,
            )
            .unwrap();
    }

    #[test]
    fn test_license_quota_exhaustion_via_creation() {
        let mut ledger = new_ledger();
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    require_license: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let key = LicenseKey::derive(b"ledger-test-license");
        let mut params = license_params(creator(), LicenseType::Basic);
        params.max_markets = 2;
        ledger.issue_license(&admin(), params, NOW).unwrap();

        for market_id in 1..=2 {
            ledger
                .create_market(&creator(), market_params(market_id), Some(&key), None, NOW)
                .unwrap();
        }
        assert!(matches!(
            ledger.create_market(&creator(), market_params(3), Some(&key), None, NOW),
            Err(LedgerError::LicenseQuotaExceeded { created: 2, max: 2 })
        ));
    }

    #[test]
    fn test_place_bet_moves_fees_and_records() {
        let mut ledger = new_ledger();
        let market_addr = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);

        let bet_addr = ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW + 10)
            .unwrap();

        assert_eq!(bet_addr, bet_address(&market_addr, &bettor(1)));
        assert_eq!(escrow.balance(&asset(), &bettor(1)), FUND - BET_AMOUNT);
        assert_eq!(
            escrow.balance(&asset(), &stake_vault_address(&market_addr)),
            9_400_000
        );
        assert_eq!(
            escrow.balance(&asset(), &bonus_vault_address(&market_addr)),
            500_000
        );
        assert_eq!(escrow.balance(&asset(), &treasury()), 50_000);
        assert_eq!(escrow.balance(&asset(), &creator()), 50_000);

        let market = ledger.market(1).unwrap();
        assert_eq!(market.total_pool, 9_400_000);
        assert_eq!(market.bonus_pool, 500_000);
        assert_eq!(market.outcomes[0].total_amount, 9_400_000);
        assert_eq!(market.outcomes[0].bettor_count, 1);
        assert_eq!(market.outcomes[1].total_amount, 0);

        let bet = ledger.bet(1, &bettor(1)).unwrap();
        assert_eq!(bet.original_amount, BET_AMOUNT);
        assert_eq!(bet.pool_amount, 9_400_000);
        assert!(!bet.claimed);
        assert_eq!(bet.placed_at, NOW + 10);

        assert_eq!(ledger.config().total_volume, BET_AMOUNT as u128);
    }

    #[test]
    fn test_place_bet_rejections() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1), bettor(2)]);

        assert!(matches!(
            ledger.place_bet(&mut escrow, &bettor(1), 9, 0, NOW),
            Err(LedgerError::MarketNotFound { market_id: 9 })
        ));
        assert!(matches!(
            ledger.place_bet(&mut escrow, &bettor(1), 1, 2, NOW),
            Err(LedgerError::InvalidOutcome { index: 2, count: 2 })
        ));
        // The deadline instant itself is closed.
        assert!(matches!(
            ledger.place_bet(&mut escrow, &bettor(1), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::BettingClosed)
        ));

        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();
        assert!(matches!(
            ledger.place_bet(&mut escrow, &bettor(1), 1, 1, NOW),
            Err(LedgerError::AlreadyBet)
        ));

        // A short bettor fails before anything moves.
        let broke = account("broke");
        let before = ledger.to_json().unwrap();
        let err = ledger
            .place_bet(&mut escrow, &broke, 1, 0, NOW)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required,
                available: 0,
                ..
            } if required == BET_AMOUNT
        ));
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
        assert_eq!(ledger.to_json().unwrap(), before);

        ledger
            .resolve_market(&creator(), 1, 0, BETTING_DEADLINE)
            .unwrap();
        assert!(matches!(
            ledger.place_bet(&mut escrow, &bettor(2), 1, 0, NOW),
            Err(LedgerError::MarketNotOpen)
        ));
    }

    #[test]
    fn test_place_bet_uses_live_fee_schedule() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1), bettor(2)]);

        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    protocol_fee_bps: Some(100),
                    creator_fee_bps: Some(100),
                    pool_fee_bps: Some(300),
                    ..Default::default()
                },
            )
            .unwrap();
        ledger
            .place_bet(&mut escrow, &bettor(2), 1, 0, NOW)
            .unwrap();

        // First bet at 50/50/500 bps, second at 100/100/300: same market,
        // different splits.
        assert_eq!(ledger.bet(1, &bettor(1)).unwrap().pool_amount, 9_400_000);
        assert_eq!(ledger.bet(1, &bettor(2)).unwrap().pool_amount, 9_500_000);
        let market = ledger.market(1).unwrap();
        assert_eq!(market.bonus_pool, 500_000 + 300_000);
        assert_eq!(escrow.balance(&asset(), &treasury()), 50_000 + 100_000);
    }

    #[test]
    fn test_withdraw_bet_restores_stake() {
        let mut ledger = new_ledger();
        let market_addr = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();

        let returned = ledger
            .withdraw_bet(&mut escrow, &bettor(1), 1, NOW + 100)
            .unwrap();
        assert_eq!(returned, 9_400_000);
        // Fees stay where they went; only the net stake comes back.
        assert_eq!(
            escrow.balance(&asset(), &bettor(1)),
            FUND - BET_AMOUNT + 9_400_000
        );
        assert_eq!(escrow.balance(&asset(), &stake_vault_address(&market_addr)), 0);
        assert_eq!(
            escrow.balance(&asset(), &bonus_vault_address(&market_addr)),
            500_000
        );

        let market = ledger.market(1).unwrap();
        assert_eq!(market.total_pool, 0);
        assert_eq!(market.outcomes[0].total_amount, 0);
        assert_eq!(market.outcomes[0].bettor_count, 0);
        assert!(ledger.bet(1, &bettor(1)).unwrap().claimed);

        assert!(matches!(
            ledger.withdraw_bet(&mut escrow, &bettor(1), 1, NOW + 101),
            Err(LedgerError::AlreadyClaimed)
        ));
    }

    #[test]
    fn test_withdraw_bet_window_and_identity() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();

        // Someone without a bet has no record at their derived address.
        assert!(matches!(
            ledger.withdraw_bet(&mut escrow, &bettor(2), 1, NOW),
            Err(LedgerError::BetNotFound { market_id: 1 })
        ));
        assert!(matches!(
            ledger.withdraw_bet(&mut escrow, &bettor(1), 1, BETTING_DEADLINE),
            Err(LedgerError::BettingClosed)
        ));
    }

    #[test]
    fn test_resolve_market_paths() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();

        assert!(matches!(
            ledger.resolve_market(&creator(), 1, 0, BETTING_DEADLINE - 1),
            Err(LedgerError::BettingNotClosed)
        ));
        assert!(matches!(
            ledger.resolve_market(&bettor(1), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::Unauthorized)
        ));
        assert!(matches!(
            ledger.resolve_market(&creator(), 1, 5, BETTING_DEADLINE),
            Err(LedgerError::InvalidOutcome { index: 5, count: 2 })
        ));

        // The betting deadline instant is already resolvable.
        ledger
            .resolve_market(&creator(), 1, 1, BETTING_DEADLINE)
            .unwrap();
        let market = ledger.market(1).unwrap();
        assert_eq!(market.status, MarketStatus::Resolved);
        assert_eq!(market.winning_outcome, Some(1));
        assert_eq!(market.resolved_at, Some(BETTING_DEADLINE));
        assert!(!market.resolved_by_oracle);

        assert!(matches!(
            ledger.resolve_market(&creator(), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::MarketNotOpen)
        ));
    }

    #[test]
    fn test_assign_oracle_rules() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(7), NOW)
            .unwrap();

        assert!(matches!(
            ledger.assign_oracle(&bettor(1), 1, 7, None),
            Err(LedgerError::Unauthorized)
        ));
        assert!(matches!(
            ledger.assign_oracle(&creator(), 1, 99, None),
            Err(LedgerError::OracleNotFound { oracle_id: 99 })
        ));
        assert!(matches!(
            ledger.assign_oracle(&creator(), 1, 7, Some("e".repeat(65))),
            Err(LedgerError::EventIdTooLong)
        ));

        ledger
            .assign_oracle(&creator(), 1, 7, Some("match-1234".to_string()))
            .unwrap();
        let market = ledger.market(1).unwrap();
        assert_eq!(market.oracle, Some(oracle_address(7)));
        assert_eq!(market.external_event_id.as_deref(), Some("match-1234"));

        assert!(matches!(
            ledger.assign_oracle(&creator(), 1, 7, None),
            Err(LedgerError::MarketAlreadyHasOracle)
        ));
    }

    #[test]
    fn test_assign_oracle_vets_liveness_and_category() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(7), NOW)
            .unwrap();

        ledger
            .update_oracle(
                &admin(),
                7,
                OracleUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.assign_oracle(&creator(), 1, 7, None),
            Err(LedgerError::OracleInactive)
        ));

        ledger
            .update_oracle(
                &admin(),
                7,
                OracleUpdate {
                    is_active: Some(true),
                    categories: Some(CategorySet::from(MarketCategory::Politics)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.assign_oracle(&creator(), 1, 7, None),
            Err(LedgerError::OracleCategoryMismatch { category: "Sports" })
        ));
    }

    #[test]
    fn test_oracle_resolution() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(7), NOW)
            .unwrap();

        assert!(matches!(
            ledger.oracle_resolve_market(&account("oracle-7"), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::OracleNotAssigned)
        ));

        ledger.assign_oracle(&creator(), 1, 7, None).unwrap();

        assert!(matches!(
            ledger.oracle_resolve_market(&creator(), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::Unauthorized)
        ));
        assert!(matches!(
            ledger.oracle_resolve_market(&account("oracle-7"), 1, 0, BETTING_DEADLINE - 1),
            Err(LedgerError::BettingNotClosed)
        ));

        ledger
            .oracle_resolve_market(&account("oracle-7"), 1, 0, BETTING_DEADLINE)
            .unwrap();
        let market = ledger.market(1).unwrap();
        assert_eq!(market.status, MarketStatus::Resolved);
        assert!(market.resolved_by_oracle);
        let oracle = ledger.oracle(7).unwrap();
        assert_eq!(oracle.markets_resolved, 1);
        assert_eq!(oracle.last_resolution_at, Some(BETTING_DEADLINE));
    }

    #[test]
    fn test_oracle_resolution_rechecks_oracle_state() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(7), NOW)
            .unwrap();
        ledger.assign_oracle(&creator(), 1, 7, None).unwrap();

        // Deactivated after assignment: the resolution gate still holds.
        ledger
            .update_oracle(
                &admin(),
                7,
                OracleUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.oracle_resolve_market(&account("oracle-7"), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::OracleInactive)
        ));

        // Reactivated but no longer covering the market's category.
        ledger
            .update_oracle(
                &admin(),
                7,
                OracleUpdate {
                    is_active: Some(true),
                    categories: Some(CategorySet::from(MarketCategory::Finance)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.oracle_resolve_market(&account("oracle-7"), 1, 0, BETTING_DEADLINE),
            Err(LedgerError::OracleCategoryMismatch { category: "Sports" })
        ));
    }

    #[test]
    fn test_cancel_and_refund() {
        let mut ledger = new_ledger();
        let market_addr = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1), bettor(2)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();
        ledger
            .place_bet(&mut escrow, &bettor(2), 1, 1, NOW)
            .unwrap();

        assert!(matches!(
            ledger.claim_refund(&mut escrow, &bettor(1), 1),
            Err(LedgerError::MarketNotCancelled)
        ));
        assert!(matches!(
            ledger.cancel_market(&bettor(1), 1),
            Err(LedgerError::Unauthorized)
        ));

        ledger.cancel_market(&creator(), 1).unwrap();
        assert_eq!(ledger.market(1).unwrap().status, MarketStatus::Cancelled);
        assert!(matches!(
            ledger.cancel_market(&creator(), 1),
            Err(LedgerError::MarketNotOpen)
        ));

        let refunded = ledger.claim_refund(&mut escrow, &bettor(1), 1).unwrap();
        assert_eq!(refunded, 9_400_000);
        assert!(matches!(
            ledger.claim_refund(&mut escrow, &bettor(1), 1),
            Err(LedgerError::AlreadyClaimed)
        ));
        ledger.claim_refund(&mut escrow, &bettor(2), 1).unwrap();

        // Net stakes all came back; the bonus pool stays in its vault.
        assert_eq!(escrow.balance(&asset(), &stake_vault_address(&market_addr)), 0);
        assert_eq!(
            escrow.balance(&asset(), &bonus_vault_address(&market_addr)),
            1_000_000
        );
    }

    #[test]
    fn test_claim_winnings_flow() {
        let mut ledger = new_ledger();
        let market_addr = ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1), bettor(2)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();
        ledger
            .place_bet(&mut escrow, &bettor(2), 1, 1, NOW)
            .unwrap();

        assert!(matches!(
            ledger.claim_winnings(&mut escrow, &bettor(1), 1),
            Err(LedgerError::MarketNotResolved)
        ));

        ledger
            .resolve_market(&creator(), 1, 0, BETTING_DEADLINE)
            .unwrap();

        let payout = ledger.claim_winnings(&mut escrow, &bettor(1), 1).unwrap();
        assert_eq!(payout, 19_800_000);
        assert_eq!(
            escrow.balance(&asset(), &bettor(1)),
            FUND - BET_AMOUNT + 19_800_000
        );
        // Pools fully drained: the winner took both vaults.
        assert_eq!(escrow.balance(&asset(), &stake_vault_address(&market_addr)), 0);
        assert_eq!(escrow.balance(&asset(), &bonus_vault_address(&market_addr)), 0);

        assert!(matches!(
            ledger.claim_winnings(&mut escrow, &bettor(1), 1),
            Err(LedgerError::AlreadyClaimed)
        ));
        assert!(matches!(
            ledger.claim_winnings(&mut escrow, &bettor(2), 1),
            Err(LedgerError::WrongOutcome)
        ));
        assert!(matches!(
            ledger.claim_winnings(&mut escrow, &account("stranger"), 1),
            Err(LedgerError::BetNotFound { market_id: 1 })
        ));
    }

    #[test]
    fn test_potential_winnings_tracks_live_pools() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);

        // First bet on an empty market wins back exactly its own net stake
        // plus its own pool fee.
        assert_eq!(ledger.potential_winnings(1, 0).unwrap(), 9_900_000);

        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 1, NOW)
            .unwrap();
        // A bet on the empty side now would also sweep the existing pools.
        assert_eq!(ledger.potential_winnings(1, 0).unwrap(), 19_800_000);

        assert!(matches!(
            ledger.potential_winnings(1, 9),
            Err(LedgerError::InvalidOutcome { index: 9, count: 2 })
        ));
        assert!(matches!(
            ledger.potential_winnings(42, 0),
            Err(LedgerError::MarketNotFound { market_id: 42 })
        ));
    }

    #[test]
    fn test_update_protocol_gates_and_versioning() {
        let mut ledger = new_ledger();
        assert!(matches!(
            ledger.update_protocol(&bettor(1), ProtocolUpdate::default()),
            Err(LedgerError::Unauthorized)
        ));

        assert!(matches!(
            ledger.update_protocol(
                &admin(),
                ProtocolUpdate {
                    pool_fee_bps: Some(2_000),
                    ..Default::default()
                }
            ),
            Err(LedgerError::InvalidFeeConfiguration { total_bps: 2_100 })
        ));
        assert_eq!(ledger.config().version, 1);

        let new_treasury = account("new-treasury");
        ledger
            .update_protocol(
                &admin(),
                ProtocolUpdate {
                    treasury: Some(new_treasury),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(ledger.config().treasury, new_treasury);
        assert_eq!(ledger.config().version, 2);
    }

    #[test]
    fn test_license_admin_and_holder_ops() {
        let mut ledger = new_ledger();
        let key = LicenseKey::derive(b"ledger-test-license");
        let holder = creator();

        assert!(matches!(
            ledger.issue_license(&holder, license_params(holder, LicenseType::Pro), NOW),
            Err(LedgerError::Unauthorized)
        ));
        ledger
            .issue_license(&admin(), license_params(holder, LicenseType::Pro), NOW)
            .unwrap();
        assert!(matches!(
            ledger.issue_license(&admin(), license_params(holder, LicenseType::Pro), NOW),
            Err(LedgerError::LicenseAlreadyExists)
        ));

        // Wallet list is holder-territory, not admin-territory.
        assert!(matches!(
            ledger.add_authorized_wallet(&admin(), &key, bettor(1)),
            Err(LedgerError::Unauthorized)
        ));
        ledger
            .add_authorized_wallet(&holder, &key, bettor(1))
            .unwrap();
        // Re-adding is a no-op.
        ledger
            .add_authorized_wallet(&holder, &key, bettor(1))
            .unwrap();
        assert_eq!(ledger.license(&key).unwrap().allowed_wallets.len(), 1);
        ledger
            .remove_authorized_wallet(&holder, &key, &bettor(1))
            .unwrap();
        assert!(ledger.license(&key).unwrap().allowed_wallets.is_empty());

        ledger
            .add_authorized_domain(&holder, &key, "markets.example".to_string())
            .unwrap();
        assert!(matches!(
            ledger.add_authorized_domain(&holder, &key, "d".repeat(65)),
            Err(LedgerError::DomainTooLong)
        ));
        ledger
            .remove_authorized_domain(&holder, &key, "markets.example")
            .unwrap();
        assert!(ledger.license(&key).unwrap().allowed_domains.is_empty());

        // Transfers need the transferable flag and the current holder.
        assert!(matches!(
            ledger.transfer_license(&holder, &key, bettor(2)),
            Err(LedgerError::LicenseNotTransferable)
        ));
        ledger
            .update_license(
                &admin(),
                &key,
                LicenseUpdate {
                    is_transferable: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            ledger.transfer_license(&bettor(2), &key, bettor(2)),
            Err(LedgerError::Unauthorized)
        ));
        ledger
            .add_authorized_wallet(&holder, &key, bettor(1))
            .unwrap();
        ledger.transfer_license(&holder, &key, bettor(2)).unwrap();
        let license = ledger.license(&key).unwrap();
        assert_eq!(license.holder, bettor(2));
        assert!(license.allowed_wallets.is_empty());
    }

    #[test]
    fn test_wallet_capacity_checked_before_membership() {
        let mut ledger = new_ledger();
        let key = LicenseKey::derive(b"ledger-test-license");
        let holder = creator();
        ledger
            .issue_license(&admin(), license_params(holder, LicenseType::Pro), NOW)
            .unwrap();

        for i in 0..10u8 {
            ledger
                .add_authorized_wallet(&holder, &key, account(&format!("wallet-{i}")))
                .unwrap();
        }
        // Full list rejects even an entry that is already present.
        assert!(matches!(
            ledger.add_authorized_wallet(&holder, &key, account("wallet-0")),
            Err(LedgerError::TooManyWallets)
        ));
    }

    #[test]
    fn test_registry_counters_and_accessors() {
        let mut ledger = new_ledger();
        ledger
            .register_oracle(&admin(), oracle_params(1), NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(2), NOW)
            .unwrap();
        assert!(matches!(
            ledger.register_oracle(&admin(), oracle_params(2), NOW),
            Err(LedgerError::OracleAlreadyExists { oracle_id: 2 })
        ));
        assert!(matches!(
            ledger.register_oracle(&bettor(1), oracle_params(3), NOW),
            Err(LedgerError::Unauthorized)
        ));
        assert_eq!(ledger.config().total_oracles, 2);
        assert!(ledger.oracle(1).is_some());
        assert!(ledger.oracle(3).is_none());

        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .create_market(&creator(), market_params(2), None, None, NOW)
            .unwrap();
        assert_eq!(ledger.markets().count(), 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        ledger
            .register_oracle(&admin(), oracle_params(7), NOW)
            .unwrap();
        ledger
            .issue_license(&admin(), license_params(creator(), LicenseType::Basic), NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();

        let json = ledger.to_json().unwrap();
        let restored = Ledger::from_json(&json).unwrap();
        assert_eq!(restored, ledger);
        assert_eq!(restored.to_json().unwrap(), json);
    }

    #[test]
    fn test_failed_resolution_leaves_state_identical() {
        let mut ledger = new_ledger();
        ledger
            .create_market(&creator(), market_params(1), None, None, NOW)
            .unwrap();
        let mut escrow = funded_escrow(&[bettor(1)]);
        ledger
            .place_bet(&mut escrow, &bettor(1), 1, 0, NOW)
            .unwrap();
        let before = ledger.to_json().unwrap();

        let attempts: [LedgerError; 3] = [
            ledger
                .resolve_market(&creator(), 1, 0, BETTING_DEADLINE - 1)
                .unwrap_err(),
            ledger
                .resolve_market(&bettor(1), 1, 0, BETTING_DEADLINE)
                .unwrap_err(),
            ledger
                .claim_winnings(&mut escrow, &bettor(1), 1)
                .unwrap_err(),
        ];
        assert!(matches!(attempts[0], LedgerError::BettingNotClosed));
        assert!(matches!(attempts[1], LedgerError::Unauthorized));
        assert!(matches!(attempts[2], LedgerError::MarketNotResolved));
        assert_eq!(ledger.to_json().unwrap(), before);
    }
}
