//! Transaction building, freezing, and signing.
//!
//! A [`Transaction`] is freely mutable. [`Transaction::freeze_with`]
//! fixes its identifier and node set and yields a
//! [`FrozenTransaction`], which can only be signed and executed —
//! mutation after freezing is unrepresentable rather than a runtime
//! error.
//!
//! Per-node requests are built lazily on first dispatch to a node and
//! cached, so repeated failures against one node never re-serialize or
//! re-sign. Adding a signature discards the cache; the signature map is
//! keyed by public key, so signing twice with the same key is a no-op
//! across every per-node variant.
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_kit::{Amount, Ledger, Transaction};
//!
//! # async fn example(ledger: Ledger) -> Result<(), ledger_kit::Error> {
//! let to = "0.1002".parse()?;
//! let response = ledger
//!     .transfer(to, Amount::credits(1))?
//!     .memo("rent")
//!     .execute(&ledger)
//!     .await?;
//!
//! let receipt = response.get_receipt(&ledger).await?;
//! println!("final status: {}", receipt.status);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::error::Error;
use crate::types::{
    AccountId, Amount, MAX_MEMO_BYTES, OperationBody, OperationKind, PublicKey, SecretKey,
    SignaturePair, SignedRequest, Status, SubmitAck, TransactionBody, TransactionHash,
    TransactionId, TransactionReceipt, TransactionRecord, TransferEntry,
};

use super::execute::{self, Executable};
use super::ledger::Ledger;
use super::network::Node;
use super::signer::SigningKey;

/// Default validity window for transactions.
const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(120);

// ============================================================================
// Transaction (unfrozen)
// ============================================================================

/// A transaction under construction. Mutable until frozen.
#[derive(Clone, Debug)]
pub struct Transaction {
    operation: OperationBody,
    max_fee: Option<Amount>,
    valid_duration: Duration,
    transaction_id: Option<TransactionId>,
    node_account_ids: Option<Vec<AccountId>>,
    memo: String,
}

impl Transaction {
    /// Create a transaction from an operation body.
    pub fn new(operation: OperationBody) -> Self {
        Self {
            operation,
            max_fee: None,
            valid_duration: DEFAULT_VALID_DURATION,
            transaction_id: None,
            node_account_ids: None,
            memo: String::new(),
        }
    }

    /// A two-leg transfer: `amount` moves from `from` to `to`.
    pub fn transfer(from: AccountId, to: AccountId, amount: Amount) -> Self {
        let nanos = amount.as_nanos() as i64;
        Self::new(OperationBody::Transfer {
            transfers: vec![
                TransferEntry {
                    account: from,
                    amount: -nanos,
                },
                TransferEntry {
                    account: to,
                    amount: nanos,
                },
            ],
        })
    }

    /// A transfer with explicit legs. Legs must sum to zero.
    pub fn transfer_entries(transfers: Vec<TransferEntry>) -> Self {
        Self::new(OperationBody::Transfer { transfers })
    }

    /// Create an account controlled by `key`, funded from the payer.
    pub fn account_create(key: PublicKey, initial_balance: Amount) -> Self {
        Self::new(OperationBody::AccountCreate {
            key,
            initial_balance,
        })
    }

    /// Replace the controlling key of an account.
    pub fn account_update(account: AccountId, key: Option<PublicKey>) -> Self {
        Self::new(OperationBody::AccountUpdate { account, key })
    }

    /// Delete an account, sending its balance to `beneficiary`.
    pub fn account_delete(account: AccountId, beneficiary: AccountId) -> Self {
        Self::new(OperationBody::AccountDelete {
            account,
            beneficiary,
        })
    }

    /// Append an opaque payload to the ledger.
    pub fn data_submit(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(OperationBody::DataSubmit {
            payload: payload.into(),
        })
    }

    /// The operation body.
    pub fn operation(&self) -> &OperationBody {
        &self.operation
    }

    /// The operation kind.
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Set the fee ceiling. Defaults to the client's ceiling, else the
    /// kind's default.
    pub fn max_fee(mut self, fee: Amount) -> Self {
        self.max_fee = Some(fee);
        self
    }

    /// Set the memo. At most [`MAX_MEMO_BYTES`] bytes.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Set an explicit identifier instead of generating one at freeze.
    pub fn transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    /// Restrict dispatch to an explicit node set.
    pub fn node_account_ids(mut self, ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(ids);
        self
    }

    /// Set the validity window duration.
    pub fn valid_duration(mut self, duration: Duration) -> Self {
        self.valid_duration = duration;
        self
    }

    // ========================================================================
    // Freezing
    // ========================================================================

    /// Fix the identifier and node set, making the transaction
    /// immutable.
    ///
    /// The identifier is generated from the client's operator and a
    /// monotonic clock unless one was set explicitly. Explicit node
    /// lists are validated against the network. The operator signs
    /// immediately; further signatures can be added on the result.
    pub fn freeze_with(self, ledger: &Ledger) -> Result<FrozenTransaction, Error> {
        if self.memo.len() > MAX_MEMO_BYTES {
            return Err(Error::Config(format!(
                "memo is {} bytes, the network accepts at most {}",
                self.memo.len(),
                MAX_MEMO_BYTES
            )));
        }
        if let OperationBody::Transfer { transfers } = &self.operation {
            let sum: i64 = transfers.iter().map(|t| t.amount).sum();
            if sum != 0 {
                return Err(Error::Config(format!(
                    "transfer legs sum to {} nanos, expected 0",
                    sum
                )));
            }
        }

        let transaction_id = match self.transaction_id {
            Some(id) => id,
            None => {
                let operator = ledger.operator().ok_or(Error::NoOperator)?;
                TransactionId::generate(operator.account_id())
            }
        };

        let node_account_ids = match self.node_account_ids {
            Some(ids) => {
                if ids.is_empty() {
                    return Err(Error::Config("explicit node list is empty".to_string()));
                }
                ledger.network().validate_node_ids(&ids)?;
                ids
            }
            None => ledger
                .network()
                .resolve_node_ids(ledger.config().max_nodes_per_operation),
        };

        let max_fee = self
            .max_fee
            .or(ledger.config().max_transaction_fee)
            .unwrap_or_else(|| self.operation.kind().default_max_fee());

        let mut frozen = FrozenTransaction {
            transaction_id,
            node_account_ids,
            max_fee,
            valid_duration_secs: self.valid_duration.as_secs(),
            memo: self.memo,
            operation: self.operation,
            signers: Vec::new(),
            requests: Mutex::new(HashMap::new()),
        };

        if let Some(operator) = ledger.operator() {
            frozen.sign_with(operator.key());
        }

        Ok(frozen)
    }

    /// Freeze with the client's defaults and execute.
    pub async fn execute(self, ledger: &Ledger) -> Result<TransactionResponse, Error> {
        self.freeze_with(ledger)?.execute(ledger).await
    }
}

// ============================================================================
// FrozenTransaction
// ============================================================================

/// A built per-node request with its hash, cached for repeat attempts.
struct PreparedRequest {
    params: serde_json::Value,
    hash: TransactionHash,
}

/// An immutable transaction with a fixed identifier and node set.
///
/// Only signing and execution remain possible. Signing takes `&mut
/// self`, so sharing one frozen transaction across threads requires
/// external synchronization, which the borrow checker enforces.
pub struct FrozenTransaction {
    transaction_id: TransactionId,
    node_account_ids: Vec<AccountId>,
    max_fee: Amount,
    valid_duration_secs: u64,
    memo: String,
    operation: OperationBody,
    signers: Vec<SigningKey>,
    requests: Mutex<HashMap<AccountId, PreparedRequest>>,
}

impl FrozenTransaction {
    /// The fixed identifier.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The resolved node set.
    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// The effective fee ceiling.
    pub fn max_fee(&self) -> Amount {
        self.max_fee
    }

    /// The operation kind.
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Public keys that have signed so far.
    pub fn signer_public_keys(&self) -> Vec<PublicKey> {
        self.signers.iter().map(|k| k.public_key().clone()).collect()
    }

    /// Add a signature by secret key.
    pub fn sign(&mut self, key: SecretKey) -> &mut Self {
        self.sign_with(SigningKey::new(key))
    }

    /// Add a signature by signing key.
    ///
    /// A no-op when this public key already signed; otherwise the
    /// cached per-node requests are discarded so every variant picks up
    /// the new signature.
    pub fn sign_with(&mut self, key: SigningKey) -> &mut Self {
        let already_signed = self
            .signers
            .iter()
            .any(|existing| existing.public_key() == key.public_key());
        if !already_signed {
            self.signers.push(key);
            self.requests.lock().unwrap().clear();
        }
        self
    }

    /// The signable body addressed to one node. Identical across nodes
    /// except for the node account field.
    pub(crate) fn body_for(&self, node_account_id: AccountId) -> TransactionBody {
        TransactionBody {
            transaction_id: self.transaction_id,
            node_account_id,
            max_fee: self.max_fee,
            valid_duration_secs: self.valid_duration_secs,
            memo: self.memo.clone(),
            operation: self.operation.clone(),
        }
    }

    /// Build (or reuse) the signed request for one node.
    async fn prepare(&self, node_account_id: AccountId) -> Result<serde_json::Value, Error> {
        if let Some(prepared) = self.requests.lock().unwrap().get(&node_account_id) {
            return Ok(prepared.params.clone());
        }

        // Built outside the lock; a concurrent build of the same node
        // produces byte-identical output, so last-write-wins is fine.
        let body_bytes = self.body_for(node_account_id).to_bytes();
        let mut signatures = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            let signature = signer.sign(&body_bytes).await?;
            signatures.push(SignaturePair {
                public_key: signer.public_key().clone(),
                signature,
            });
        }

        let request = SignedRequest {
            body_bytes,
            signatures,
        };
        let prepared = PreparedRequest {
            params: json!({ "transaction": request.to_base64() }),
            hash: request.transaction_hash(),
        };
        let params = prepared.params.clone();
        self.requests
            .lock()
            .unwrap()
            .insert(node_account_id, prepared);

        Ok(params)
    }

    /// The hash of the request prepared for `node`, if one was built.
    fn prepared_hash(&self, node_account_id: AccountId) -> Option<TransactionHash> {
        self.requests
            .lock()
            .unwrap()
            .get(&node_account_id)
            .map(|p| p.hash)
    }

    /// Dispatch through the client's engine.
    pub async fn execute(&self, ledger: &Ledger) -> Result<TransactionResponse, Error> {
        let ctx = ledger.dispatch_context();
        execute::execute(&ctx, &self.node_account_ids, self).await
    }
}

impl Executable for FrozenTransaction {
    type Response = TransactionResponse;

    fn method(&self) -> &'static str {
        self.operation.kind().method()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.transaction_id)
    }

    async fn request_for(&self, node: &Node) -> Result<serde_json::Value, Error> {
        self.prepare(node.account_id()).await
    }

    fn status_of(&self, response: &serde_json::Value) -> Result<Status, Error> {
        let ack: SubmitAck = serde_json::from_value(response.clone())
            .map_err(crate::error::TransportError::Json)?;
        Ok(ack.status)
    }

    fn make_response(
        &self,
        _response: serde_json::Value,
        node: AccountId,
        duplicate: bool,
    ) -> Result<TransactionResponse, Error> {
        let transaction_hash = self.prepared_hash(node).ok_or_else(|| {
            Error::Config("response attributed to a node no request was built for".to_string())
        })?;
        Ok(TransactionResponse {
            transaction_id: self.transaction_id,
            node_account_id: node,
            transaction_hash,
            duplicate,
        })
    }
}

impl std::fmt::Debug for FrozenTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenTransaction")
            .field("transaction_id", &self.transaction_id)
            .field("kind", &self.operation.kind())
            .field("node_account_ids", &self.node_account_ids)
            .field("signers", &self.signers.len())
            .finish()
    }
}

// ============================================================================
// TransactionResponse
// ============================================================================

/// The result of a successfully dispatched transaction: what was
/// accepted, and by whom.
#[derive(Clone, Debug)]
pub struct TransactionResponse {
    /// The identifier to fetch receipts and records with.
    pub transaction_id: TransactionId,
    /// The node that accepted the request.
    pub node_account_id: AccountId,
    /// The hash of the request that node received.
    pub transaction_hash: TransactionHash,
    /// True when the network reported the identifier as already
    /// accepted by an earlier attempt whose acknowledgement was lost.
    pub duplicate: bool,
}

impl TransactionResponse {
    /// Fetch the post-consensus receipt, failing if the transaction did
    /// not succeed at consensus.
    pub async fn get_receipt(&self, ledger: &Ledger) -> Result<TransactionReceipt, Error> {
        let receipt = ledger.transaction_receipt(self.transaction_id).await?;
        if receipt.status != Status::Ok {
            return Err(Error::ReceiptStatus {
                status: receipt.status,
                transaction_id: self.transaction_id,
            });
        }
        Ok(receipt)
    }

    /// Fetch the full post-consensus record.
    pub async fn get_record(&self, ledger: &Ledger) -> Result<TransactionRecord, Error> {
        ledger.transaction_record(self.transaction_id).await
    }
}
