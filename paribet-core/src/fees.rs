//! # Fee Engine
//!
//! Pure integer fee arithmetic: the three-way split of a gross stake into
//! pool, creator and protocol fees plus the net amount credited to the
//! outcome pool, and the prospective-winnings estimator built on top of it.
//! Deterministic and side-effect-free; all intermediates are u128 so results
//! are byte-identical across platforms.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Fee fractions are integers over this denominator.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Cap on the combined fee schedule (10%).
pub const MAX_TOTAL_FEE_BPS: u32 = 1_000;

/// Default protocol fee (0.5%)
pub const DEFAULT_PROTOCOL_FEE_BPS: u16 = 50;

/// Default creator fee (0.5%)
pub const DEFAULT_CREATOR_FEE_BPS: u16 = 50;

/// Default pool fee (5%), accumulated into the bonus pool for winners
pub const DEFAULT_POOL_FEE_BPS: u16 = 500;

/// The three fee rates applied to every bet, in basis points.
///
/// Lives inside the protocol configuration and is passed explicitly into
/// every fee computation; nothing reads it ambiently.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSchedule {
    pub protocol_bps: u16,
    pub creator_bps: u16,
    pub pool_bps: u16,
}

impl FeeSchedule {
    /// Build a schedule, rejecting combined rates above [`MAX_TOTAL_FEE_BPS`].
    pub fn new(protocol_bps: u16, creator_bps: u16, pool_bps: u16) -> Result<Self> {
        let schedule = Self {
            protocol_bps,
            creator_bps,
            pool_bps,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Combined rate across all three components.
    pub fn combined_bps(&self) -> u32 {
        self.protocol_bps as u32 + self.creator_bps as u32 + self.pool_bps as u32
    }

    pub fn validate(&self) -> Result<()> {
        let total_bps = self.combined_bps();
        if total_bps > MAX_TOTAL_FEE_BPS {
            return Err(LedgerError::InvalidFeeConfiguration { total_bps });
        }
        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            protocol_bps: DEFAULT_PROTOCOL_FEE_BPS,
            creator_bps: DEFAULT_CREATOR_FEE_BPS,
            pool_bps: DEFAULT_POOL_FEE_BPS,
        }
    }
}

/// Where one gross stake goes: three fees plus the net amount staked.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Accumulates into the market's bonus pool
    pub pool_fee: u64,
    /// Paid to the market creator's fee wallet
    pub creator_fee: u64,
    /// Paid to the protocol treasury
    pub protocol_fee: u64,
    /// Credited to the chosen outcome's pool
    pub net_amount: u64,
}

impl FeeBreakdown {
    pub fn total_fees(&self) -> u64 {
        self.pool_fee + self.creator_fee + self.protocol_fee
    }
}

/// Split `amount` according to `schedule`.
///
/// Each fee is `floor(amount * bps / 10_000)`, computed independently; the
/// rounding residue of all three divisions stays in `net_amount` because the
/// net is defined as `amount - total_fees`. The schedule must already be
/// validated (combined rate at most [`MAX_TOTAL_FEE_BPS`]).
pub fn compute_fees(amount: u64, schedule: &FeeSchedule) -> FeeBreakdown {
    debug_assert!(schedule.combined_bps() as u64 <= BPS_DENOMINATOR);

    let portion =
        |bps: u16| -> u64 { ((amount as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64 };

    let pool_fee = portion(schedule.pool_bps);
    let creator_fee = portion(schedule.creator_bps);
    let protocol_fee = portion(schedule.protocol_bps);
    let net_amount = amount - (pool_fee + creator_fee + protocol_fee);

    FeeBreakdown {
        pool_fee,
        creator_fee,
        protocol_fee,
        net_amount,
    }
}

/// Estimate the payout a bet of `bet_amount` would earn if its outcome wins
/// under the current totals.
///
/// Simulates the fee split, then applies the settlement share rule to the
/// totals as they would stand after the bet:
/// `share = net * (total_pool + bonus_pool + net) / (outcome_total + net)`.
/// A zero denominator (only possible for a zero bet on an empty outcome)
/// yields the full distributable amount. Settlement recomputes from final
/// totals; given identical inputs the two agree.
pub fn compute_potential_winnings(
    bet_amount: u64,
    outcome_total_before: u64,
    total_pool: u64,
    bonus_pool: u64,
    schedule: &FeeSchedule,
) -> Result<u64> {
    let net = compute_fees(bet_amount, schedule).net_amount;

    let distributable = total_pool
        .checked_add(bonus_pool)
        .and_then(|pool| pool.checked_add(net))
        .ok_or(LedgerError::Overflow("distributable pool"))?;
    let outcome_total_after = outcome_total_before
        .checked_add(net)
        .ok_or(LedgerError::Overflow("outcome total"))?;

    if outcome_total_after == 0 {
        return Ok(distributable);
    }

    let share = (net as u128 * distributable as u128) / outcome_total_after as u128;
    Ok(share as u64)
}
