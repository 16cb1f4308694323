//! Core types for the Grid ledger.
//!
//! Hand-rolled types mirroring the network's wire schema, designed for
//! ergonomic use in client applications.

mod account;
mod amount;
mod key;
mod operation;
mod request;
mod response;
mod status;
mod timestamp;
mod transaction_id;

pub use account::AccountId;
pub use amount::Amount;
pub use key::{DEFAULT_HD_PATH, DEFAULT_WORD_COUNT, PublicKey, SecretKey, Signature};
pub use operation::{OperationBody, OperationKind, QueryBody, QueryKind, TransferEntry};
pub use request::{
    MAX_MEMO_BYTES, QueryEnvelope, ResponseType, SignaturePair, SignedRequest, TransactionBody,
    TransactionHash,
};
pub use response::{
    AccountBalance, AccountInfo, QueryAnswer, SubmitAck, TransactionReceipt, TransactionRecord,
    TransferView,
};
pub use status::{Outcome, Status};
pub use timestamp::Timestamp;
pub use transaction_id::TransactionId;
