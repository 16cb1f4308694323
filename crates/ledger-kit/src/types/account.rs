//! Ledger account ID type with validation.

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseAccountIdError;

/// A ledger account identifier, written as `realm.num`.
///
/// The bare form `"1001"` is accepted as shorthand for realm 0.
/// Node accounts on the public networks live in realm 0 with low
/// numbers (`0.3`, `0.4`, ...).
///
/// # Examples
///
/// ```
/// use ledger_kit::AccountId;
///
/// let payer: AccountId = "0.1001".parse().unwrap();
/// assert_eq!(payer, AccountId::new(0, 1001));
///
/// let shorthand: AccountId = "1001".parse().unwrap();
/// assert_eq!(shorthand, payer);
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
    BorshSerialize,
    BorshDeserialize,
)]
pub struct AccountId {
    /// The realm the account lives in.
    pub realm: u64,
    /// The account number within the realm.
    pub num: u64,
}

impl AccountId {
    /// Create an account ID from its parts.
    pub const fn new(realm: u64, num: u64) -> Self {
        Self { realm, num }
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.realm, self.num)
    }
}

impl FromStr for AccountId {
    type Err = ParseAccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAccountIdError::Empty);
        }

        let parse_num = |part: &str| -> Result<u64, ParseAccountIdError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseAccountIdError::InvalidNumber(s.to_string()));
            }
            part.parse()
                .map_err(|_| ParseAccountIdError::InvalidNumber(s.to_string()))
        };

        let mut parts = s.split('.');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self::new(0, parse_num(first)?)),
            (Some(second), None) => Ok(Self::new(parse_num(first)?, parse_num(second)?)),
            (Some(_), Some(_)) => Err(ParseAccountIdError::InvalidFormat(s.to_string())),
        }
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
