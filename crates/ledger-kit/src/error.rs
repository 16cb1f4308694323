//! Error types for ledger-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) — Main error type, returned by most operations
//!   - [`TransportError`] — Channel-level failures (HTTP, connection, timeouts)
//!   - [`ParseAccountIdError`] — Invalid account ID format
//!   - [`ParseAmountError`] — Invalid amount format
//!   - [`ParseKeyError`] — Invalid key format
//!   - [`ParseTimestampError`] — Invalid timestamp format
//!   - [`ParseTransactionIdError`] — Invalid transaction ID format
//!   - [`SignerError`] — Signing operation failures
//!
//! # Distinguishing failure classes
//!
//! The dispatch engine folds every attempt into one of a few caller-visible
//! shapes. `Error::Precheck` means a node gave a definitive answer and
//! resubmitting the same request will not change it. `Error::Exhausted`
//! means the client never got a clean answer — the last transient failure
//! is attached as the cause. `Error::Cancelled` means the caller's deadline
//! elapsed first.
//!
//! ```rust,no_run
//! use ledger_kit::{Error, Ledger, Amount};
//!
//! # async fn example(ledger: Ledger) -> Result<(), Error> {
//! let to = "0.1002".parse()?;
//! match ledger.transfer(to, Amount::credits(1))?.execute(&ledger).await {
//!     Ok(response) => println!("accepted by {}", response.node_account_id),
//!     Err(Error::Precheck { status, .. }) => println!("rejected: {status}"),
//!     Err(Error::Exhausted { attempts, .. }) => println!("gave up after {attempts} attempts"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::types::{AccountId, Amount, Status, TransactionId};

/// Error parsing an account ID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAccountIdError {
    #[error("Account ID is empty")]
    Empty,

    #[error("Account ID '{0}' has invalid format, expected 'realm.num' or 'num'")]
    InvalidFormat(String),

    #[error("Account ID '{0}' contains an invalid number")]
    InvalidNumber(String),
}

/// Error parsing an amount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("Ambiguous amount '{0}'. Use explicit units like '5 credits' or '100 nanos'")]
    AmbiguousAmount(String),

    #[error("Invalid amount format: '{0}'")]
    InvalidFormat(String),

    #[error("Invalid number in amount: '{0}'")]
    InvalidNumber(String),

    #[error("Amount overflow: value too large")]
    Overflow,
}

/// Error parsing a public or secret key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("Invalid key format: expected 'ed25519:...'")]
    InvalidFormat,

    #[error("Unknown key type: '{0}'")]
    UnknownKeyType(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid curve point: key bytes do not represent a valid point on the curve")]
    InvalidCurvePoint,
}

/// Error parsing a timestamp.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseTimestampError {
    #[error("Invalid timestamp format: '{0}', expected 'seconds.nanos'")]
    InvalidFormat(String),

    #[error("Invalid number in timestamp: '{0}'")]
    InvalidNumber(String),
}

/// Error parsing a transaction ID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseTransactionIdError {
    #[error("Invalid transaction ID format: '{0}', expected 'payer@seconds.nanos'")]
    InvalidFormat(String),

    #[error(transparent)]
    InvalidAccountId(#[from] ParseAccountIdError),

    #[error(transparent)]
    InvalidTimestamp(#[from] ParseTimestampError),
}

/// Error during signing operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Invalid seed phrase")]
    InvalidSeedPhrase,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Channel-level errors from a single request attempt against one node.
///
/// The dispatch engine consumes these internally: retryable transport
/// errors rotate to another node, non-retryable ones surface immediately.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("RPC error: {message} (code: {code})")]
    Rpc { code: i64, message: String },
}

impl TransportError {
    /// Check whether this failure is worth another attempt on a
    /// different node.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout() || e.is_connect(),
            TransportError::HttpStatus { status, .. } => is_retryable_status(*status),
            TransportError::Timeout(_) => true,
            TransportError::Json(_) => false,
            TransportError::InvalidResponse(_) => false,
            // Server-side envelope errors retry; malformed-request codes do not
            TransportError::Rpc { code, .. } => *code == -32000 || *code == -32603,
        }
    }
}

/// Check if an HTTP status code is retryable.
///
/// 408 Request Timeout, 429 Too Many Requests, and all 5xx server errors
/// are transient from the client's point of view.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for ledger-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Configuration ───
    #[error(
        "No operator configured. Call .operator() or .credentials() on LedgerBuilder, or set an explicit transaction ID."
    )]
    NoOperator,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Node account {0} is not part of the configured network")]
    UnknownNodeAccount(AccountId),

    // ─── Parsing ───
    #[error(transparent)]
    ParseAccountId(#[from] ParseAccountIdError),

    #[error(transparent)]
    ParseAmount(#[from] ParseAmountError),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    #[error(transparent)]
    ParseTimestamp(#[from] ParseTimestampError),

    #[error(transparent)]
    ParseTransactionId(#[from] ParseTransactionIdError),

    // ─── Signing ───
    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    // ─── Transport ───
    #[error(transparent)]
    Transport(#[from] TransportError),

    // ─── Dispatch ───
    /// A node returned a definitive precheck rejection. Not retried.
    #[error("Precheck failed with {status} on node {node_account_id}{}", .transaction_id.map(|id| format!(" for {id}")).unwrap_or_default())]
    Precheck {
        status: Status,
        transaction_id: Option<TransactionId>,
        node_account_id: AccountId,
    },

    /// The estimated query cost exceeds the configured payment ceiling.
    /// Returned before the paid query is ever sent.
    #[error("Query cost {cost} exceeds the configured maximum payment {limit}")]
    QueryPaymentExceeded { cost: Amount, limit: Amount },

    /// The attempt budget was spent without a clean answer. The last
    /// transient failure is attached as the cause.
    #[error("No clean answer after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    /// Every usable node is backing off or has spent its attempt budget.
    #[error("No healthy node available in the network")]
    NoHealthyNodes,

    /// The overall operation deadline elapsed before a result was
    /// obtained. Distinct from [`Error::Exhausted`]: the attempt budget
    /// may not have been spent.
    #[error("Operation cancelled: deadline of {deadline:?} elapsed")]
    Cancelled { deadline: Duration },

    // ─── Post-consensus ───
    /// A receipt was fetched successfully but reports that the
    /// transaction failed at consensus.
    #[error("Transaction {transaction_id} failed with receipt status {status}")]
    ReceiptStatus {
        status: Status,
        transaction_id: TransactionId,
    },
}

impl Error {
    /// True when resubmitting the same request cannot change the result.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::Exhausted { .. } | Error::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_id_error_display() {
        assert_eq!(
            ParseAccountIdError::Empty.to_string(),
            "Account ID is empty"
        );
        assert_eq!(
            ParseAccountIdError::InvalidFormat("a.b.c".to_string()).to_string(),
            "Account ID 'a.b.c' has invalid format, expected 'realm.num' or 'num'"
        );
        assert_eq!(
            ParseAccountIdError::InvalidNumber("0.xyz".to_string()).to_string(),
            "Account ID '0.xyz' contains an invalid number"
        );
    }

    #[test]
    fn test_parse_key_error_display() {
        assert_eq!(
            ParseKeyError::InvalidFormat.to_string(),
            "Invalid key format: expected 'ed25519:...'"
        );
        assert_eq!(
            ParseKeyError::InvalidLength {
                expected: 32,
                actual: 16
            }
            .to_string(),
            "Invalid key length: expected 32 bytes, got 16"
        );
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(599));

        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(422));
    }

    #[test]
    fn test_transport_error_is_retryable() {
        assert!(TransportError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(TransportError::HttpStatus {
            status: 503,
            url: "http://node".to_string(),
            body: String::new(),
        }
        .is_retryable());
        assert!(TransportError::Rpc {
            code: -32000,
            message: "server error".to_string(),
        }
        .is_retryable());

        assert!(!TransportError::HttpStatus {
            status: 404,
            url: "http://node".to_string(),
            body: String::new(),
        }
        .is_retryable());
        assert!(!TransportError::InvalidResponse("missing result".to_string()).is_retryable());
        assert!(!TransportError::Rpc {
            code: -32600,
            message: "invalid request".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_is_terminal() {
        let terminal = Error::Precheck {
            status: Status::InvalidSignature,
            transaction_id: None,
            node_account_id: AccountId::new(0, 3),
        };
        assert!(terminal.is_terminal());

        let exhausted = Error::Exhausted {
            attempts: 10,
            last: Box::new(Error::NoHealthyNodes),
        };
        assert!(!exhausted.is_terminal());

        let cancelled = Error::Cancelled {
            deadline: Duration::from_secs(1),
        };
        assert!(!cancelled.is_terminal());
    }

    #[test]
    fn test_precheck_display_includes_context() {
        let id: TransactionId = "0.1001@1650000000.000000001".parse().unwrap();
        let err = Error::Precheck {
            status: Status::Busy,
            transaction_id: Some(id),
            node_account_id: AccountId::new(0, 3),
        };
        let text = err.to_string();
        assert!(text.contains("BUSY"));
        assert!(text.contains("0.3"));
        assert!(text.contains("0.1001@1650000000.000000001"));
    }

    #[test]
    fn test_error_from_parse_errors() {
        let err: Error = ParseAccountIdError::Empty.into();
        assert!(matches!(err, Error::ParseAccountId(_)));

        let err: Error = ParseKeyError::InvalidFormat.into();
        assert!(matches!(err, Error::ParseKey(_)));

        let err: Error = ParseAmountError::Overflow.into();
        assert!(matches!(err, Error::ParseAmount(_)));
    }
}
