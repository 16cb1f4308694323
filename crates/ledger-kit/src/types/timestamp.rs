//! Nanosecond-precision wall-clock timestamp.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseTimestampError;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A point in time with nanosecond precision, written as
/// `seconds.nanoseconds` (nanoseconds zero-padded to nine digits).
///
/// ```
/// use ledger_kit::Timestamp;
///
/// let ts: Timestamp = "1650000000.000000001".parse().unwrap();
/// assert_eq!(ts.seconds, 1650000000);
/// assert_eq!(ts.nanos, 1);
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
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub seconds: u64,
    /// Nanosecond fraction, always < 10^9.
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp from seconds and a nanosecond fraction.
    pub const fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Create from a total nanosecond count since the epoch.
    pub const fn from_unix_nanos(nanos: u64) -> Self {
        Self {
            seconds: nanos / NANOS_PER_SECOND,
            nanos: (nanos % NANOS_PER_SECOND) as u32,
        }
    }

    /// Total nanoseconds since the epoch.
    pub const fn as_unix_nanos(self) -> u64 {
        self.seconds * NANOS_PER_SECOND + self.nanos as u64
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_unix_nanos(elapsed.as_nanos() as u64)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (secs, nanos) = s
            .split_once('.')
            .ok_or_else(|| ParseTimestampError::InvalidFormat(s.to_string()))?;

        let seconds: u64 = secs
            .parse()
            .map_err(|_| ParseTimestampError::InvalidNumber(s.to_string()))?;
        if nanos.is_empty() || nanos.len() > 9 || !nanos.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseTimestampError::InvalidNumber(s.to_string()));
        }
        // "5" means 5 * 10^8 nanos, matching the zero-padded Display form
        let padded = format!("{:0<9}", nanos);
        let nanos: u32 = padded
            .parse()
            .map_err(|_| ParseTimestampError::InvalidNumber(s.to_string()))?;

        Ok(Self { seconds, nanos })
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_nanos() {
        let ts = Timestamp::new(1650000000, 1);
        assert_eq!(ts.to_string(), "1650000000.000000001");
    }

    #[test]
    fn test_parse_roundtrip() {
        let ts = Timestamp::new(1650000000, 123456789);
        let back: Timestamp = ts.to_string().parse().unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_nanos_conversion_roundtrip() {
        let ts = Timestamp::new(100, 999_999_999);
        assert_eq!(Timestamp::from_unix_nanos(ts.as_unix_nanos()), ts);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "1650000000".parse::<Timestamp>().unwrap_err(),
            ParseTimestampError::InvalidFormat(_)
        ));
        assert!(matches!(
            "1650000000.".parse::<Timestamp>().unwrap_err(),
            ParseTimestampError::InvalidNumber(_)
        ));
        assert!(matches!(
            "abc.123".parse::<Timestamp>().unwrap_err(),
            ParseTimestampError::InvalidNumber(_)
        ));
        assert!(matches!(
            "1.1234567890".parse::<Timestamp>().unwrap_err(),
            ParseTimestampError::InvalidNumber(_)
        ));
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::new(1, 0) < Timestamp::new(1, 1));
        assert!(Timestamp::new(1, 999_999_999) < Timestamp::new(2, 0));
    }

    #[test]
    fn test_now_is_recent() {
        let ts = Timestamp::now();
        // After 2020, before 2100
        assert!(ts.seconds > 1_577_836_800);
        assert!(ts.seconds < 4_102_444_800);
    }

    #[test]
    fn test_serde_as_string() {
        let ts = Timestamp::new(1650000000, 5);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1650000000.000000005\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
