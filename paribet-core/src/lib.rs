//! # Paribet Core
//!
//! Core ledger library for fixed-stake parimutuel prediction markets.
//!
//! Every participant in a market escrows the same stake on one of up to ten
//! outcomes. When the market resolves, the bets on the winning outcome split
//! the stake pool plus an accumulated bonus pool pro rata; when it is
//! cancelled, every bettor recovers their net stake. The ledger itself is a
//! pure state machine: the host supplies the caller identity, the current
//! time, and an [`Escrow`] implementation for fund movement, and the ledger
//! does the bookkeeping deterministically.
//!
//! ## Features
//!
//! - **Market Lifecycle**: Open markets with 2-10 outcomes, creator or
//!   oracle resolution, cancellation with refunds
//! - **Fixed-Stake Betting**: One identical stake per bettor per market,
//!   split by a basis-point fee schedule into stake pool, bonus pool,
//!   treasury, and creator fees
//! - **Oracle Registry**: Admin-registered oracles vetted by category for
//!   automated resolution
//! - **License Registry**: Optional license gate on market creation with
//!   quotas, expiry, and wallet/domain allow-lists
//! - **Deterministic Addressing**: Every record lives at a SHA-256 address
//!   derived from a domain tag and its natural key
//!
//! ## Examples
//!
//! ```rust
//! use paribet_core::address::{AccountId, AssetId};
//! use paribet_core::ledger::Ledger;
//! use paribet_core::market::MarketParams;
//! use paribet_core::oracle::MarketCategory;
//! use paribet_core::MemoryEscrow;
//!
//! let admin = AccountId::new([1; 32]);
//! let treasury = AccountId::new([2; 32]);
//! let creator = AccountId::new([3; 32]);
//! let bettor = AccountId::new([4; 32]);
//! let asset = AssetId::new([9; 32]);
//!
//! let mut ledger = Ledger::new(admin, treasury);
//! let mut escrow = MemoryEscrow::new();
//! escrow.mint(&asset, &bettor, 50_000_000)?;
//!
//! ledger.create_market(
//!     &creator,
//!     MarketParams {
//!         market_id: 1,
//!         asset,
//!         category: MarketCategory::Sports,
//!         title: "Will the home team win the final?".to_string(),
//!         description: "Settles on the official result.".to_string(),
//!         outcomes: vec!["Yes".to_string(), "No".to_string()],
//!         bet_amount: 10_000_000,
//!         betting_deadline: 1_700_086_400,
//!         resolution_deadline: 1_700_172_800,
//!         creator_fee_wallet: None,
//!         external_event_id: None,
//!     },
//!     None,
//!     None,
//!     1_700_000_000,
//! )?;
//!
//! // The sole bettor wins their own net stake back plus the bonus pool.
//! ledger.place_bet(&mut escrow, &bettor, 1, 0, 1_700_000_100)?;
//! ledger.resolve_market(&creator, 1, 0, 1_700_086_400)?;
//! let payout = ledger.claim_winnings(&mut escrow, &bettor, 1)?;
//! assert_eq!(payout, 9_900_000);
//! Ok::<(), paribet_core::LedgerError>(())
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod escrow;
pub mod fees;
pub mod ledger;
pub mod license;
pub mod market;
pub mod oracle;
pub mod test_utils;

pub use error::{ErrorKind, LedgerError, Result};
pub use escrow::{Escrow, MemoryEscrow};
pub use ledger::Ledger;
pub use market::{Bet, Market, MarketParams, MarketStatus};
