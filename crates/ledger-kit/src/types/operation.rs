//! Operation bodies: the kind-specific payloads of transactions and
//! queries.
//!
//! One tagged variant per kind, with the per-kind constants (default
//! fee ceiling, remote method name) kept as plain data on the kind
//! enums. Everything else about submitting an operation — node choice,
//! signing, retries — is kind-agnostic and lives in the client module.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{AccountId, Amount, PublicKey, TransactionId};

// ============================================================================
// Transactions
// ============================================================================

/// One leg of a transfer: positive amounts credit the account,
/// negative amounts debit it. The legs of a valid transfer sum to zero.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferEntry {
    /// The account whose balance changes.
    pub account: AccountId,
    /// Signed change in nanocredits.
    pub amount: i64,
}

/// The kind-specific payload of a transaction.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub enum OperationBody {
    /// Move value between accounts. Legs must sum to zero.
    Transfer { transfers: Vec<TransferEntry> },
    /// Create an account controlled by the given key.
    AccountCreate {
        key: PublicKey,
        initial_balance: Amount,
    },
    /// Replace the controlling key of an account.
    AccountUpdate {
        account: AccountId,
        key: Option<PublicKey>,
    },
    /// Delete an account, sending its remaining balance to the
    /// beneficiary.
    AccountDelete {
        account: AccountId,
        beneficiary: AccountId,
    },
    /// Append an opaque payload to the ledger.
    DataSubmit { payload: Vec<u8> },
}

impl OperationBody {
    /// The kind discriminant.
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationBody::Transfer { .. } => OperationKind::Transfer,
            OperationBody::AccountCreate { .. } => OperationKind::AccountCreate,
            OperationBody::AccountUpdate { .. } => OperationKind::AccountUpdate,
            OperationBody::AccountDelete { .. } => OperationKind::AccountDelete,
            OperationBody::DataSubmit { .. } => OperationKind::DataSubmit,
        }
    }
}

/// Transaction kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Transfer,
    AccountCreate,
    AccountUpdate,
    AccountDelete,
    DataSubmit,
}

impl OperationKind {
    /// The remote method a node exposes for this kind.
    pub fn method(self) -> &'static str {
        match self {
            OperationKind::Transfer => "submit_transfer",
            OperationKind::AccountCreate => "submit_account_create",
            OperationKind::AccountUpdate => "submit_account_update",
            OperationKind::AccountDelete => "submit_account_delete",
            OperationKind::DataSubmit => "submit_data",
        }
    }

    /// The default fee ceiling applied when the caller sets none.
    ///
    /// Account creation carries a larger default because it allocates
    /// state; the rest are flat.
    pub fn default_max_fee(self) -> Amount {
        match self {
            OperationKind::AccountCreate => Amount::credits(5),
            OperationKind::AccountDelete => Amount::credits(2),
            OperationKind::Transfer
            | OperationKind::AccountUpdate
            | OperationKind::DataSubmit => Amount::credits(1),
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// The kind-specific payload of a query.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum QueryBody {
    /// Current balance of an account.
    AccountBalance { account: AccountId },
    /// Full account information.
    AccountInfo { account: AccountId },
    /// Post-consensus receipt for a previously submitted transaction.
    TransactionReceipt { transaction_id: TransactionId },
    /// Full post-consensus record for a previously submitted
    /// transaction.
    TransactionRecord { transaction_id: TransactionId },
}

impl QueryBody {
    /// The kind discriminant.
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryBody::AccountBalance { .. } => QueryKind::AccountBalance,
            QueryBody::AccountInfo { .. } => QueryKind::AccountInfo,
            QueryBody::TransactionReceipt { .. } => QueryKind::TransactionReceipt,
            QueryBody::TransactionRecord { .. } => QueryKind::TransactionRecord,
        }
    }

    /// The transaction this query is about, if any. Attached to errors
    /// for diagnostics.
    pub fn subject_transaction_id(&self) -> Option<TransactionId> {
        match self {
            QueryBody::TransactionReceipt { transaction_id }
            | QueryBody::TransactionRecord { transaction_id } => Some(*transaction_id),
            _ => None,
        }
    }
}

/// Query kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    AccountBalance,
    AccountInfo,
    TransactionReceipt,
    TransactionRecord,
}

impl QueryKind {
    /// The remote method a node exposes for this kind.
    pub fn method(self) -> &'static str {
        match self {
            QueryKind::AccountBalance => "query_account_balance",
            QueryKind::AccountInfo => "query_account_info",
            QueryKind::TransactionReceipt => "query_transaction_receipt",
            QueryKind::TransactionRecord => "query_transaction_record",
        }
    }

    /// Balance and receipt queries are answered without payment;
    /// the rest require an attached payment transfer.
    pub fn is_free(self) -> bool {
        matches!(
            self,
            QueryKind::AccountBalance | QueryKind::TransactionReceipt
        )
    }
}
