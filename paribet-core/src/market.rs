//! # Market Records
//!
//! Fixed-stake parimutuel markets and the bets placed on them. Every
//! participant escrows the same stake amount on one of up to ten outcomes.
//! On resolution the stake pool and the accumulated bonus pool are split
//! pro rata among the bets on the winning outcome; on cancellation each
//! bettor recovers their net stake.
//!
//! Records here are pure data plus read helpers. All state transitions and
//! fund movements go through [`crate::ledger::Ledger`].

use crate::address::{market_address, AccountId, AssetId};
use crate::error::{LedgerError, Result};
use crate::oracle::MarketCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of outcomes for a market
pub const MIN_OUTCOMES: usize = 2;
/// Maximum number of outcomes for a market (e.g. Yes/No = 2, or multiple choice)
pub const MAX_OUTCOMES: usize = 10;
/// Maximum title length in bytes
pub const MAX_TITLE_LEN: usize = 128;
/// Maximum description length in bytes
pub const MAX_DESCRIPTION_LEN: usize = 512;
/// Maximum outcome label length in bytes
pub const MAX_OUTCOME_LABEL_LEN: usize = 64;
/// Maximum external event id length in bytes
pub const MAX_EVENT_ID_LEN: usize = 64;

/// Lifecycle state of a market. Transitions are one-directional: a market
/// opens once and ends in exactly one terminal state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketStatus {
    /// Accepting bets until the betting deadline
    Open,
    /// Outcome decided; winners may claim
    Resolved,
    /// Called off; bettors may reclaim their net stake
    Cancelled,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketStatus::Open => "Open",
            MarketStatus::Resolved => "Resolved",
            MarketStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// One possible result of a market's event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub label: String,
    /// Net stake credited to this outcome, in base units
    pub total_amount: u64,
    pub bettor_count: u32,
}

/// A prediction market with a fixed per-participant stake.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Market {
    /// Caller-chosen unique identifier
    pub market_id: u64,
    pub creator: AccountId,
    /// Destination for creator fees; defaults to the creator
    pub creator_fee_wallet: AccountId,
    /// Stake asset all amounts are denominated in
    pub asset: AssetId,
    pub category: MarketCategory,
    /// Record address of the assigned oracle, if any
    pub oracle: Option<AccountId>,
    /// External event reference for oracle resolution (match id, ticker, ...)
    pub external_event_id: Option<String>,
    pub title: String,
    pub description: String,
    /// Fixed stake, identical for every participant
    pub bet_amount: u64,
    /// Unix seconds; betting is open strictly before this instant
    pub betting_deadline: i64,
    /// Unix seconds; advisory target for resolution
    pub resolution_deadline: i64,
    pub status: MarketStatus,
    /// Some only when status is Resolved
    pub winning_outcome: Option<u8>,
    /// Sum of net stakes across all outcomes
    pub total_pool: u64,
    /// Accumulated pool fees, distributed to winners on top of the stakes
    pub bonus_pool: u64,
    pub outcomes: Vec<Outcome>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
    /// Whether the resolution came through the oracle path
    pub resolved_by_oracle: bool,
}

/// Creation input for a new market.
#[derive(Clone, Debug)]
pub struct MarketParams {
    pub market_id: u64,
    pub asset: AssetId,
    pub category: MarketCategory,
    pub title: String,
    pub description: String,
    /// Outcome labels, in index order
    pub outcomes: Vec<String>,
    pub bet_amount: u64,
    pub betting_deadline: i64,
    pub resolution_deadline: i64,
    /// Defaults to the creator when `None`
    pub creator_fee_wallet: Option<AccountId>,
    /// External event reference, may also be set later via oracle assignment
    pub external_event_id: Option<String>,
}

/// A single participant's stake in a market.
///
/// Exactly one bet exists per (market, bettor) pair; the pair forms the
/// record's address. Records are never deleted, so a settled bet keeps
/// serving as the double-claim guard.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    /// Address of the market this bet belongs to
    pub market: AccountId,
    pub bettor: AccountId,
    pub outcome_index: u8,
    /// Gross stake before fees
    pub original_amount: u64,
    /// Net stake credited to the outcome pool
    pub pool_amount: u64,
    /// Set once the stake has been withdrawn, refunded, or paid out
    pub claimed: bool,
    pub placed_at: i64,
}

impl Market {
    /// Validate creation input and build an open market with empty pools.
    ///
    /// # Arguments
    ///
    /// * `params` - Creation input; see [`MarketParams`]
    /// * `creator` - Identity that will own lifecycle decisions
    /// * `now` - Current unix time in seconds
    ///
    /// # Returns
    ///
    /// The market in its initial state, or an input-bound error. Deadlines
    /// must satisfy `resolution_deadline > betting_deadline > now`.
    pub fn new(params: MarketParams, creator: AccountId, now: i64) -> Result<Self> {
        if params.title.len() > MAX_TITLE_LEN {
            return Err(LedgerError::TitleTooLong);
        }
        if params.description.len() > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::DescriptionTooLong);
        }
        let count = params.outcomes.len();
        if !(MIN_OUTCOMES..=MAX_OUTCOMES).contains(&count) {
            return Err(LedgerError::InvalidOutcomeCount { count });
        }
        for (index, label) in params.outcomes.iter().enumerate() {
            if label.is_empty() {
                return Err(LedgerError::OutcomeLabelEmpty { index });
            }
            if label.len() > MAX_OUTCOME_LABEL_LEN {
                return Err(LedgerError::OutcomeLabelTooLong { index });
            }
        }
        if params.bet_amount == 0 {
            return Err(LedgerError::InvalidBetAmount);
        }
        if let Some(event_id) = &params.external_event_id {
            if event_id.len() > MAX_EVENT_ID_LEN {
                return Err(LedgerError::EventIdTooLong);
            }
        }
        if params.betting_deadline <= now || params.resolution_deadline <= params.betting_deadline {
            return Err(LedgerError::InvalidDeadline);
        }

        let outcomes = params
            .outcomes
            .into_iter()
            .map(|label| Outcome {
                label,
                total_amount: 0,
                bettor_count: 0,
            })
            .collect();

        Ok(Self {
            market_id: params.market_id,
            creator_fee_wallet: params.creator_fee_wallet.unwrap_or(creator),
            creator,
            asset: params.asset,
            category: params.category,
            oracle: None,
            external_event_id: params.external_event_id,
            title: params.title,
            description: params.description,
            bet_amount: params.bet_amount,
            betting_deadline: params.betting_deadline,
            resolution_deadline: params.resolution_deadline,
            status: MarketStatus::Open,
            winning_outcome: None,
            total_pool: 0,
            bonus_pool: 0,
            outcomes,
            created_at: now,
            resolved_at: None,
            resolved_by_oracle: false,
        })
    }

    /// Address of this market's record.
    pub fn address(&self) -> AccountId {
        market_address(self.market_id)
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    /// Whether the betting window has closed. The deadline instant itself
    /// already counts as closed, so the resolvable window starts exactly
    /// where the betting window ends.
    pub fn betting_closed(&self, now: i64) -> bool {
        now >= self.betting_deadline
    }

    /// Whether the advisory resolution target has passed.
    pub fn past_resolution_deadline(&self, now: i64) -> bool {
        now > self.resolution_deadline
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Total number of bettors across all outcomes.
    pub fn total_bettors(&self) -> u32 {
        self.outcomes.iter().map(|o| o.bettor_count).sum()
    }

    /// Stake pool plus bonus pool, the full amount paid out to winners.
    pub fn distributable(&self) -> Result<u64> {
        self.total_pool
            .checked_add(self.bonus_pool)
            .ok_or(LedgerError::Overflow("distributable pool"))
    }

    /// Payout owed to a winning bet on this resolved market.
    ///
    /// The share is `pool_amount * (total_pool + bonus_pool) /
    /// winning_outcome_total` in integer arithmetic; division truncates and
    /// the residue stays in the vaults. A winning outcome with an empty pool
    /// (every winner withdrew before the deadline) pays the claimant the full
    /// distributable amount rather than trapping it.
    pub fn winnings_for(&self, bet: &Bet) -> Result<u64> {
        if self.status != MarketStatus::Resolved {
            return Err(LedgerError::MarketNotResolved);
        }
        let winning = self.winning_outcome.ok_or(LedgerError::MarketNotResolved)?;
        if bet.outcome_index != winning {
            return Err(LedgerError::WrongOutcome);
        }

        let distributable = self.distributable()?;
        let denominator = self.outcomes[winning as usize].total_amount;
        if denominator == 0 {
            return Ok(distributable);
        }

        let share = (bet.pool_amount as u128) * (distributable as u128) / (denominator as u128);
        u64::try_from(share).map_err(|_| LedgerError::Overflow("payout share"))
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Market #{}: {}", self.market_id, self.title)?;
        writeln!(f, "  Status: {} | Category: {}", self.status, self.category)?;
        writeln!(
            f,
            "  Stake: {} | Pool: {} | Bonus: {}",
            self.bet_amount, self.total_pool, self.bonus_pool
        )?;
        writeln!(
            f,
            "  Betting closes: {}",
            format_timestamp(self.betting_deadline)
        )?;
        writeln!(
            f,
            "  Resolution due: {}",
            format_timestamp(self.resolution_deadline)
        )?;
        for (index, outcome) in self.outcomes.iter().enumerate() {
            let marker = match self.winning_outcome {
                Some(winning) if winning as usize == index => " [winner]",
                _ => "",
            };
            writeln!(
                f,
                "  [{}] {} - {} from {} bettors{}",
                index, outcome.label, outcome.total_amount, outcome.bettor_count, marker
            )?;
        }
        Ok(())
    }
}
