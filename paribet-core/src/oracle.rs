//! # Oracle Registry
//!
//! Oracles are authorities permitted to submit automated resolutions for
//! markets in specific categories. A record is independent of any market
//! until a creator assigns it; resolution then checks the oracle's authority
//! identity, active flag and category coverage.

use crate::address::AccountId;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum oracle display-name length in bytes
pub const MAX_ORACLE_NAME_LEN: usize = 64;

/// Maximum data-source descriptor length in bytes
pub const MAX_DATA_SOURCE_LEN: usize = 256;

/// Number of market categories; the category set is a 12-bit vector
pub const CATEGORY_COUNT: usize = 12;

/// Closed set of market categories.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketCategory {
    Politics,
    Sports,
    Finance,
    Crypto,
    Geopolitics,
    Earnings,
    Tech,
    Culture,
    World,
    Economy,
    Elections,
    Mentions,
}

impl MarketCategory {
    pub const ALL: [MarketCategory; CATEGORY_COUNT] = [
        MarketCategory::Politics,
        MarketCategory::Sports,
        MarketCategory::Finance,
        MarketCategory::Crypto,
        MarketCategory::Geopolitics,
        MarketCategory::Earnings,
        MarketCategory::Tech,
        MarketCategory::Culture,
        MarketCategory::World,
        MarketCategory::Economy,
        MarketCategory::Elections,
        MarketCategory::Mentions,
    ];

    /// Category from its wire discriminant (0 through 11).
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Wire discriminant, also the category's bit index in a [`CategorySet`].
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarketCategory::Politics => "Politics",
            MarketCategory::Sports => "Sports",
            MarketCategory::Finance => "Finance",
            MarketCategory::Crypto => "Crypto",
            MarketCategory::Geopolitics => "Geopolitics",
            MarketCategory::Earnings => "Earnings",
            MarketCategory::Tech => "Tech",
            MarketCategory::Culture => "Culture",
            MarketCategory::World => "World",
            MarketCategory::Economy => "Economy",
            MarketCategory::Elections => "Elections",
            MarketCategory::Mentions => "Mentions",
        }
    }
}

impl fmt::Display for MarketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit-packed membership vector over the twelve categories.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategorySet(u16);

impl CategorySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every category.
    pub const fn all() -> Self {
        Self((1 << CATEGORY_COUNT) - 1)
    }

    /// Builder-style insertion: `CategorySet::empty().with(Sports)`.
    pub fn with(mut self, category: MarketCategory) -> Self {
        self.insert(category);
        self
    }

    pub fn insert(&mut self, category: MarketCategory) {
        self.0 |= 1 << category.as_u8();
    }

    pub fn remove(&mut self, category: MarketCategory) {
        self.0 &= !(1 << category.as_u8());
    }

    pub fn contains(&self, category: MarketCategory) -> bool {
        self.0 & (1 << category.as_u8()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = MarketCategory> + '_ {
        MarketCategory::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }

    /// Bridge from the flag-array wire shape.
    pub fn from_flags(flags: [bool; CATEGORY_COUNT]) -> Self {
        let mut set = Self::empty();
        for (category, enabled) in MarketCategory::ALL.into_iter().zip(flags) {
            if enabled {
                set.insert(category);
            }
        }
        set
    }

    pub fn to_flags(&self) -> [bool; CATEGORY_COUNT] {
        let mut flags = [false; CATEGORY_COUNT];
        for (slot, category) in flags.iter_mut().zip(MarketCategory::ALL) {
            *slot = self.contains(category);
        }
        flags
    }
}

impl From<MarketCategory> for CategorySet {
    fn from(category: MarketCategory) -> Self {
        Self::empty().with(category)
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for category in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(category.name())?;
            first = false;
        }
        if first {
            f.write_str("(none)")?;
        }
        Ok(())
    }
}

/// Registered resolution authority.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Oracle {
    pub oracle_id: u64,
    /// Identity that may submit resolutions on this oracle's behalf
    pub authority: AccountId,
    pub name: String,
    pub categories: CategorySet,
    /// Opaque descriptor of where the oracle sources results
    pub data_source: String,
    pub is_active: bool,
    pub markets_resolved: u64,
    pub registered_at: i64,
    pub last_resolution_at: Option<i64>,
}

/// Registration input for a new oracle.
#[derive(Clone, Debug)]
pub struct OracleParams {
    pub oracle_id: u64,
    pub authority: AccountId,
    pub name: String,
    pub categories: CategorySet,
    pub data_source: String,
}

/// Admin patch for an existing oracle; `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct OracleUpdate {
    pub name: Option<String>,
    pub categories: Option<CategorySet>,
    pub data_source: Option<String>,
    pub is_active: Option<bool>,
}

impl Oracle {
    pub fn new(params: OracleParams, now: i64) -> Result<Self> {
        validate_name(&params.name)?;
        validate_data_source(&params.data_source)?;

        Ok(Self {
            oracle_id: params.oracle_id,
            authority: params.authority,
            name: params.name,
            categories: params.categories,
            data_source: params.data_source,
            is_active: true,
            markets_resolved: 0,
            registered_at: now,
            last_resolution_at: None,
        })
    }

    /// Whether this oracle's category bitmap includes `category`. Activity is
    /// checked separately so inactive and out-of-category rejections stay
    /// distinguishable.
    pub fn covers(&self, category: MarketCategory) -> bool {
        self.categories.contains(category)
    }

    /// Apply an admin patch. Validates every given field before writing any,
    /// so a rejected update leaves the record untouched.
    pub fn apply_update(&mut self, update: OracleUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(data_source) = &update.data_source {
            validate_data_source(data_source)?;
        }

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(data_source) = update.data_source {
            self.data_source = data_source;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_ORACLE_NAME_LEN {
        return Err(LedgerError::OracleNameTooLong);
    }
    Ok(())
}

fn validate_data_source(data_source: &str) -> Result<()> {
    if data_source.len() > MAX_DATA_SOURCE_LEN {
        return Err(LedgerError::DataSourceTooLong);
    }
    Ok(())
}
