//! Amount type for fees, payments, and transfers.

use std::fmt::{self, Display};
use std::ops::{Add, Sub};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::ParseAmountError;

/// One nanocredit (10^-9 credits).
const NANOS_PER_CREDIT: u64 = 1_000_000_000;
/// One millicredit in nanocredits (10^-3 credits).
const NANOS_PER_MILLI: u64 = 1_000_000;

/// An amount of the network's native currency, with nanocredit precision.
///
/// All wire fields (fees, payments, transfer amounts) carry nanocredits;
/// the typed constructors keep unit confusion out of application code.
///
/// # Creating Amounts
///
/// ```
/// use ledger_kit::Amount;
///
/// let fee = Amount::credits(2);
/// let payment = Amount::millis(500);       // 0.5 credits
/// let dust = Amount::nanos(1);
/// ```
///
/// # Parsing from Strings
///
/// String parsing is available for runtime input (CLI, config files):
/// `"5 credits"`, `"1.5 credits"`, `"500 millis"`, `"100 nanos"`.
/// Raw numbers are NOT accepted to prevent unit confusion.
///
/// ```
/// use ledger_kit::Amount;
///
/// let amount: Amount = "1.5 credits".parse().unwrap();
/// assert_eq!(amount, Amount::millis(1500));
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One nanocredit.
    pub const ONE_NANO: Self = Self(1);
    /// One credit.
    pub const ONE_CREDIT: Self = Self(NANOS_PER_CREDIT);

    /// Create from whole credits.
    pub const fn credits(credits: u64) -> Self {
        Self(credits * NANOS_PER_CREDIT)
    }

    /// Create from millicredits (10^-3 credits).
    pub const fn millis(millis: u64) -> Self {
        Self(millis * NANOS_PER_MILLI)
    }

    /// Create from nanocredits (10^-9 credits).
    pub const fn nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// The raw value in nanocredits.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// The whole-credit part, truncating.
    pub const fn as_credits(self) -> u64 {
        self.0 / NANOS_PER_CREDIT
    }

    /// Checked addition.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANOS_PER_CREDIT;
        let frac = self.0 % NANOS_PER_CREDIT;
        if frac == 0 {
            write!(f, "{} credits", whole)
        } else {
            let digits = format!("{:09}", frac);
            write!(f, "{}.{} credits", whole, digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAmountError::InvalidFormat(s.to_string()));
        }

        let (number, unit) = s
            .split_once(char::is_whitespace)
            .ok_or_else(|| ParseAmountError::AmbiguousAmount(s.to_string()))?;
        let number = number.trim();
        let unit = unit.trim();

        match unit {
            "credit" | "credits" => parse_decimal_credits(number, s),
            "milli" | "millis" | "millicredit" | "millicredits" => {
                let n: u64 = number
                    .parse()
                    .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?;
                n.checked_mul(NANOS_PER_MILLI)
                    .map(Amount)
                    .ok_or(ParseAmountError::Overflow)
            }
            "nano" | "nanos" | "nanocredit" | "nanocredits" => number
                .parse()
                .map(Amount)
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string())),
            _ => Err(ParseAmountError::InvalidFormat(s.to_string())),
        }
    }
}

/// Parse a decimal credit amount like "1.5" into nanocredits.
fn parse_decimal_credits(number: &str, original: &str) -> Result<Amount, ParseAmountError> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };

    let whole: u64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| ParseAmountError::InvalidNumber(original.to_string()))?
    };

    if frac_part.len() > 9 {
        return Err(ParseAmountError::InvalidNumber(original.to_string()));
    }
    let frac: u64 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<9}", frac_part);
        padded
            .parse()
            .map_err(|_| ParseAmountError::InvalidNumber(original.to_string()))?
    };

    whole
        .checked_mul(NANOS_PER_CREDIT)
        .and_then(|n| n.checked_add(frac))
        .map(Amount)
        .ok_or(ParseAmountError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Amount::credits(5).as_nanos(), 5_000_000_000);
        assert_eq!(Amount::millis(500).as_nanos(), 500_000_000);
        assert_eq!(Amount::nanos(42).as_nanos(), 42);
        assert_eq!(Amount::ZERO.as_nanos(), 0);
        assert_eq!(Amount::ONE_CREDIT, Amount::credits(1));
    }

    #[test]
    fn test_as_credits_truncates() {
        assert_eq!(Amount::millis(2500).as_credits(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::credits(5).to_string(), "5 credits");
        assert_eq!(Amount::millis(1500).to_string(), "1.5 credits");
        assert_eq!(Amount::nanos(1).to_string(), "0.000000001 credits");
        assert_eq!(Amount::ZERO.to_string(), "0 credits");
    }

    #[test]
    fn test_parse_credits() {
        assert_eq!("5 credits".parse::<Amount>().unwrap(), Amount::credits(5));
        assert_eq!("1 credit".parse::<Amount>().unwrap(), Amount::credits(1));
        assert_eq!(
            "1.5 credits".parse::<Amount>().unwrap(),
            Amount::millis(1500)
        );
        assert_eq!(
            "0.000000001 credits".parse::<Amount>().unwrap(),
            Amount::nanos(1)
        );
    }

    #[test]
    fn test_parse_subunits() {
        assert_eq!("500 millis".parse::<Amount>().unwrap(), Amount::millis(500));
        assert_eq!("100 nanos".parse::<Amount>().unwrap(), Amount::nanos(100));
    }

    #[test]
    fn test_parse_rejects_bare_numbers() {
        assert!(matches!(
            "123".parse::<Amount>().unwrap_err(),
            ParseAmountError::AmbiguousAmount(_)
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_units() {
        assert!(matches!(
            "5 shekels".parse::<Amount>().unwrap_err(),
            ParseAmountError::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_parse_rejects_too_many_decimals() {
        assert!(matches!(
            "1.0000000001 credits".parse::<Amount>().unwrap_err(),
            ParseAmountError::InvalidNumber(_)
        ));
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            "99999999999999999999 credits".parse::<Amount>().unwrap_err(),
            ParseAmountError::InvalidNumber(_) | ParseAmountError::Overflow
        ));
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Amount::credits(1).checked_add(Amount::credits(2)),
            Some(Amount::credits(3))
        );
        assert_eq!(Amount::nanos(u64::MAX).checked_add(Amount::ONE_NANO), None);
        assert_eq!(Amount::credits(1).checked_sub(Amount::credits(2)), None);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Amount::nanos(1234)).unwrap();
        assert_eq!(json, "1234");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::nanos(1234));
    }
}
