//! Precheck status codes and attempt outcomes.
//!
//! The status code space is defined by the network and treated as a
//! fixed, versioned contract: this crate only populates and reads it.
//! Which codes are transient is *not* part of the enum — that policy
//! lives in the dispatch engine's classifier, which is configurable per
//! network.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The status a node returns synchronously upon receiving a request,
/// before network-wide consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Status {
    /// The request passed precheck and was accepted for consensus.
    Ok,
    /// The node is overloaded and refusing work.
    Busy,
    /// The node is up but the platform is not yet serving requests.
    PlatformNotActive,
    /// The platform accepted the connection but could not create the
    /// transaction.
    PlatformTransactionNotCreated,
    /// A transaction with the same identifier already reached consensus.
    DuplicateTransaction,
    /// The transaction identifier is malformed or its payer is invalid.
    InvalidTransactionId,
    /// The validity window has already closed.
    TransactionExpired,
    /// The validity window starts in the future.
    TransactionStartsBeforeConsensus,
    /// A signature does not verify against the request body.
    InvalidSignature,
    /// The offered fee ceiling is below the network's charge.
    InsufficientTransactionFee,
    /// The payer cannot cover the fee.
    InsufficientPayerBalance,
    /// The attached query payment is below the node's charge.
    InsufficientQueryPayment,
    /// The request targets a node account other than the receiving node.
    InvalidNodeAccount,
    /// A referenced account does not exist.
    AccountNotFound,
    /// The memo field exceeds the allowed length.
    MemoTooLong,
    /// No receipt is (yet) known for the requested identifier.
    ReceiptNotFound,
    /// No record is available for the requested identifier.
    RecordNotFound,
    /// A code this client version does not know.
    #[serde(other)]
    Unrecognized,
}

impl Status {
    /// The wire form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Busy => "BUSY",
            Status::PlatformNotActive => "PLATFORM_NOT_ACTIVE",
            Status::PlatformTransactionNotCreated => "PLATFORM_TRANSACTION_NOT_CREATED",
            Status::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Status::InvalidTransactionId => "INVALID_TRANSACTION_ID",
            Status::TransactionExpired => "TRANSACTION_EXPIRED",
            Status::TransactionStartsBeforeConsensus => "TRANSACTION_STARTS_BEFORE_CONSENSUS",
            Status::InvalidSignature => "INVALID_SIGNATURE",
            Status::InsufficientTransactionFee => "INSUFFICIENT_TRANSACTION_FEE",
            Status::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            Status::InsufficientQueryPayment => "INSUFFICIENT_QUERY_PAYMENT",
            Status::InvalidNodeAccount => "INVALID_NODE_ACCOUNT",
            Status::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Status::MemoTooLong => "MEMO_TOO_LONG",
            Status::ReceiptNotFound => "RECEIPT_NOT_FOUND",
            Status::RecordNotFound => "RECORD_NOT_FOUND",
            Status::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The node accepted the request.
    Accepted,
    /// The identifier already reached consensus. Terminal, but
    /// equivalent to the original acceptance — never re-submitted
    /// under a fresh identifier.
    Duplicate,
    /// A transient node condition. Worth another attempt.
    Transient,
    /// A definitive rejection. Surfaced immediately.
    Terminal,
}
