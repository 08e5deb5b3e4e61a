//! Error types for paribet-core

use crate::address::AccountId;
use crate::escrow::EscrowError;
use std::fmt;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse classification of a failed operation. Callers that only route or
/// log failures can branch on the kind instead of the full variant set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks standing: authority, license, funds. Never retried
    /// automatically; surfaced verbatim.
    PolicyViolation,
    /// The requested transition is illegal from the current record state.
    StateViolation,
    /// Malformed request parameters, rejected before any state is read.
    InputViolation,
    /// Overflow or underflow in a fee or payout computation; fatal to the
    /// single operation, never silently clamped.
    ArithmeticFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PolicyViolation => "policy violation",
            ErrorKind::StateViolation => "state violation",
            ErrorKind::InputViolation => "input violation",
            ErrorKind::ArithmeticFault => "arithmetic fault",
        };
        f.write_str(name)
    }
}

/// Error types for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    // --- policy ---
    /// Caller identity does not match the required authority
    #[error("Unauthorized action")]
    Unauthorized,

    /// License enforcement is on and no license was presented
    #[error("Valid license required to perform this action")]
    LicenseRequired,

    /// License has been revoked or never activated
    #[error("License is not active")]
    LicenseInactive,

    /// License expiry instant has passed
    #[error("License has expired")]
    LicenseExpired,

    /// License has used up its market quota
    #[error("License market quota exceeded: {created} of {max} used")]
    LicenseQuotaExceeded { created: u32, max: u32 },

    /// Wallet absent from the license's non-empty allow-list
    #[error("Wallet not authorized under this license")]
    WalletNotAuthorized,

    /// Domain absent from the license's non-empty allow-list, or unverifiable
    #[error("Domain not authorized under this license")]
    DomainNotAuthorized,

    /// The license's feature flags do not grant the attempted capability
    #[error("Feature not enabled for this license")]
    FeatureDisabled,

    #[error("License is not transferable")]
    LicenseNotTransferable,

    #[error("Oracle is not active")]
    OracleInactive,

    /// Oracle's category bitmap excludes the market's category
    #[error("Oracle not authorized for category {category}")]
    OracleCategoryMismatch { category: &'static str },

    /// Account cannot fund the requested movement
    #[error("Insufficient funds: account {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: AccountId,
        required: u64,
        available: u64,
    },

    /// The escrow collaborator refused a transfer the ledger had validated
    #[error("Escrow rejected transfer: {0}")]
    EscrowRejected(String),

    // --- state ---
    #[error("Market is not open")]
    MarketNotOpen,

    #[error("Market has not been resolved")]
    MarketNotResolved,

    #[error("Market has not been cancelled")]
    MarketNotCancelled,

    /// Betting deadline has passed (bets and withdrawals are frozen)
    #[error("Betting is closed")]
    BettingClosed,

    /// Resolution attempted while the betting window is still open
    #[error("Betting has not closed yet")]
    BettingNotClosed,

    /// The bet was already claimed, refunded, or withdrawn
    #[error("Bet already claimed")]
    AlreadyClaimed,

    /// One bet per (market, bettor) pair
    #[error("Bet already placed on this market")]
    AlreadyBet,

    /// Bet's outcome is not the winning outcome
    #[error("Bet is not on the winning outcome")]
    WrongOutcome,

    #[error("Market has no assigned oracle")]
    OracleNotAssigned,

    #[error("Market already has an oracle assigned")]
    MarketAlreadyHasOracle,

    #[error("Market {market_id} already exists")]
    MarketAlreadyExists { market_id: u64 },

    #[error("Oracle {oracle_id} already exists")]
    OracleAlreadyExists { oracle_id: u64 },

    #[error("License already exists for this key")]
    LicenseAlreadyExists,

    #[error("Market {market_id} not found")]
    MarketNotFound { market_id: u64 },

    #[error("No bet on market {market_id} by caller")]
    BetNotFound { market_id: u64 },

    #[error("Oracle {oracle_id} not found")]
    OracleNotFound { oracle_id: u64 },

    #[error("License not found")]
    LicenseNotFound,

    // --- input ---
    /// Deadlines must satisfy resolution > betting > now
    #[error("Invalid deadline configuration")]
    InvalidDeadline,

    #[error("Invalid outcome count: {count} (need 2 to 10)")]
    InvalidOutcomeCount { count: usize },

    #[error("Invalid outcome index {index} (market has {count} outcomes)")]
    InvalidOutcome { index: u8, count: usize },

    /// Combined fee basis points exceed the protocol maximum
    #[error("Invalid fee configuration: {total_bps} bps combined")]
    InvalidFeeConfiguration { total_bps: u32 },

    #[error("Bet amount must be positive")]
    InvalidBetAmount,

    #[error("Title too long")]
    TitleTooLong,

    #[error("Description too long")]
    DescriptionTooLong,

    #[error("Outcome label {index} is empty")]
    OutcomeLabelEmpty { index: usize },

    #[error("Outcome label {index} too long")]
    OutcomeLabelTooLong { index: usize },

    #[error("Oracle name too long")]
    OracleNameTooLong,

    #[error("Data source descriptor too long")]
    DataSourceTooLong,

    #[error("External event id too long")]
    EventIdTooLong,

    #[error("Too many allowed domains")]
    TooManyDomains,

    #[error("Domain name too long")]
    DomainTooLong,

    #[error("Too many allowed wallets")]
    TooManyWallets,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Hex decoding errors
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Snapshot serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // --- arithmetic ---
    /// Checked arithmetic failed; names the computation that overflowed
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl LedgerError {
    /// Classify this error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            Unauthorized
            | LicenseRequired
            | LicenseInactive
            | LicenseExpired
            | LicenseQuotaExceeded { .. }
            | WalletNotAuthorized
            | DomainNotAuthorized
            | FeatureDisabled
            | LicenseNotTransferable
            | OracleInactive
            | OracleCategoryMismatch { .. }
            | InsufficientFunds { .. }
            | EscrowRejected(_) => ErrorKind::PolicyViolation,

            MarketNotOpen
            | MarketNotResolved
            | MarketNotCancelled
            | BettingClosed
            | BettingNotClosed
            | AlreadyClaimed
            | AlreadyBet
            | WrongOutcome
            | OracleNotAssigned
            | MarketAlreadyHasOracle
            | MarketAlreadyExists { .. }
            | OracleAlreadyExists { .. }
            | LicenseAlreadyExists
            | MarketNotFound { .. }
            | BetNotFound { .. }
            | OracleNotFound { .. }
            | LicenseNotFound => ErrorKind::StateViolation,

            InvalidDeadline
            | InvalidOutcomeCount { .. }
            | InvalidOutcome { .. }
            | InvalidFeeConfiguration { .. }
            | InvalidBetAmount
            | TitleTooLong
            | DescriptionTooLong
            | OutcomeLabelEmpty { .. }
            | OutcomeLabelTooLong { .. }
            | OracleNameTooLong
            | DataSourceTooLong
            | EventIdTooLong
            | TooManyDomains
            | DomainTooLong
            | TooManyWallets
            | InvalidIdentity(_)
            | Hex(_)
            | Json(_) => ErrorKind::InputViolation,

            Overflow(_) => ErrorKind::ArithmeticFault,
        }
    }
}

impl From<EscrowError> for LedgerError {
    fn from(err: EscrowError) -> Self {
        match err {
            EscrowError::InsufficientFunds {
                account,
                required,
                available,
            } => LedgerError::InsufficientFunds {
                account,
                required,
                available,
            },
            EscrowError::Rejected(msg) => LedgerError::EscrowRejected(msg),
        }
    }
}
