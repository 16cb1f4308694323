//! Transaction identifiers.
//!
//! A [`TransactionId`] is the `(payer, valid-start)` pair that uniquely
//! names one logical operation across the whole network. Every per-node
//! request built for an operation shares the same ID; only the target
//! node field differs. The network itself deduplicates on this pair, so
//! a retried submission that already reached consensus is rejected as a
//! duplicate instead of executing twice.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseTransactionIdError;

use super::{AccountId, Timestamp};

/// Uniquely names one logical transaction or paid query,
/// written as `payer@seconds.nanos`.
///
/// ```
/// use ledger_kit::TransactionId;
///
/// let id: TransactionId = "0.1001@1650000000.000000001".parse().unwrap();
/// assert_eq!(id.payer.num, 1001);
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
pub struct TransactionId {
    /// The account that pays for the operation.
    pub payer: AccountId,
    /// The start of the operation's validity window.
    pub valid_start: Timestamp,
}

/// Last valid-start issued, in unix nanos. Shared process-wide so that
/// concurrent freezes for the same payer never collide on the same
/// identifier.
static LAST_VALID_START: AtomicU64 = AtomicU64::new(0);

impl TransactionId {
    /// Create a transaction ID from explicit parts.
    pub const fn new(payer: AccountId, valid_start: Timestamp) -> Self {
        Self { payer, valid_start }
    }

    /// Generate a fresh ID for the given payer.
    ///
    /// Valid-start times are strictly increasing across the process:
    /// if the wall clock has not advanced since the previous call, the
    /// previous value plus one nanosecond is used instead.
    pub fn generate(payer: AccountId) -> Self {
        let now = Timestamp::now().as_unix_nanos();
        let mut prev = LAST_VALID_START.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST_VALID_START.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self::new(payer, Timestamp::from_unix_nanos(next)),
                Err(observed) => prev = observed,
            }
        }
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.payer, self.valid_start)
    }
}

impl FromStr for TransactionId {
    type Err = ParseTransactionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (payer, valid_start) = s
            .split_once('@')
            .ok_or_else(|| ParseTransactionIdError::InvalidFormat(s.to_string()))?;
        Ok(Self {
            payer: payer.parse()?,
            valid_start: valid_start.parse()?,
        })
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_display_roundtrip() {
        let id = TransactionId::new(AccountId::new(0, 1001), Timestamp::new(1650000000, 42));
        assert_eq!(id.to_string(), "0.1001@1650000000.000000042");
        let back: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "0.1001".parse::<TransactionId>().unwrap_err(),
            ParseTransactionIdError::InvalidFormat(_)
        ));
        assert!(matches!(
            "bad@1.0".parse::<TransactionId>().unwrap_err(),
            ParseTransactionIdError::InvalidAccountId(_)
        ));
        assert!(matches!(
            "0.1@bad".parse::<TransactionId>().unwrap_err(),
            ParseTransactionIdError::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn test_generate_is_unique() {
        let payer = AccountId::new(0, 1001);
        let ids: HashSet<_> = (0..1000).map(|_| TransactionId::generate(payer)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_generate_is_monotonic() {
        let payer = AccountId::new(0, 1001);
        let a = TransactionId::generate(payer);
        let b = TransactionId::generate(payer);
        assert!(a.valid_start < b.valid_start);
    }

    #[test]
    fn test_generate_unique_across_threads() {
        let payer = AccountId::new(0, 1001);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| TransactionId::generate(payer))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate id generated: {id}");
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_serde_as_string() {
        let id = TransactionId::new(AccountId::new(0, 7), Timestamp::new(10, 5));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0.7@10.000000005\"");
        let back: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
