use std::{fmt, str::FromStr};

use crate::domain::{Equipment, ParseCodeError};

const CHECKSUM_MODULUS: u64 = 10_000;

/// A short, non-cryptographic validation code derived from an equipment
/// record.
///
/// The code catches accidental drift between a record's fields and what was
/// last written. It is not a security control. Displayed as four zero-padded
/// digits, e.g. `0147`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(u16);

impl Checksum {
    /// Derives the checksum from the fields that contribute to it.
    ///
    /// The sum of `id + quantity + min_threshold` plus the code point of every
    /// character in `name`, reduced modulo 10000.
    #[must_use]
    pub fn from_fields(id: u32, quantity: u32, min_threshold: u32, name: &str) -> Self {
        let sum = name
            .chars()
            .map(|c| u64::from(u32::from(c)))
            .fold(
                u64::from(id) + u64::from(quantity) + u64::from(min_threshold),
                u64::wrapping_add,
            );

        // The modulus keeps the value well inside u16.
        Self(u16::try_from(sum % CHECKSUM_MODULUS).unwrap_or_default())
    }

    /// Reconstructs a checksum from its numeric value.
    ///
    /// Returns `None` if the value has more than four digits.
    #[must_use]
    pub fn from_value(value: u16) -> Option<Self> {
        (u64::from(value) < CHECKSUM_MODULUS).then_some(Self(value))
    }

    /// The numeric value of the code.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for Checksum {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCodeError::new("checksum", s);
        if s.is_empty() || s.len() > 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<u16>()
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(invalid)
    }
}

/// Computes the checksum of an equipment record from its current fields.
#[must_use]
pub fn compute_checksum(item: &Equipment) -> Checksum {
    Checksum::from_fields(
        item.id().get(),
        item.quantity(),
        item.min_threshold(),
        item.name(),
    )
}

/// Derived urgency classification of an equipment record's stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StockStatus {
    /// Stock is comfortably above the threshold.
    Ok,
    /// Stock is within half a threshold of running low.
    Watch,
    /// Stock is at or below the threshold and needs resupply.
    Low,
}

impl StockStatus {
    /// Classifies a quantity against a minimum threshold.
    ///
    /// `Low` when `quantity <= min_threshold`, `Watch` when
    /// `quantity <= floor(min_threshold * 1.5)`, `Ok` otherwise. At
    /// `quantity == min_threshold` the more urgent status wins.
    #[must_use]
    pub fn classify(quantity: u32, min_threshold: u32) -> Self {
        let quantity = u64::from(quantity);
        let threshold = u64::from(min_threshold);
        // floor(t * 1.5) computed exactly in integers
        let watch_limit = threshold + threshold / 2;

        if quantity <= threshold {
            Self::Low
        } else if quantity <= watch_limit {
            Self::Watch
        } else {
            Self::Ok
        }
    }

    /// The upper-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Watch => "WATCH",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Self::Ok),
            "WATCH" => Ok(Self::Watch),
            "LOW" => Ok(Self::Low),
            _ => Err(ParseCodeError::new("stock status", s)),
        }
    }
}

/// Classifies the stock level of an equipment record.
#[must_use]
pub fn stock_status(item: &Equipment) -> StockStatus {
    StockStatus::classify(item.quantity(), item.min_threshold())
}
