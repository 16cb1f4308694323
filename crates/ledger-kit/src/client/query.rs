//! Query building and the cost/payment path.
//!
//! Free queries (balance, receipt) are sent as-is. Paid queries first
//! obtain a fee estimate via a cost-only round through the same
//! dispatch engine, check it against the payment ceiling, then attach a
//! payment transfer addressed to whichever node answers. An estimate
//! over the ceiling fails before the paid query is ever sent.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, TransportError};
use crate::types::{
    AccountBalance, AccountId, AccountInfo, Amount, OperationBody, QueryAnswer, QueryBody,
    QueryEnvelope, QueryKind, ResponseType, SignaturePair, SignedRequest, Status, TransactionBody,
    TransactionId, TransactionReceipt, TransactionRecord, TransferEntry,
};

use super::execute::{self, Executable};
use super::ledger::Ledger;
use super::network::Node;
use super::signer::SigningKey;

/// Validity window for generated payment transfers, in seconds.
const PAYMENT_VALID_DURATION_SECS: u64 = 120;

// ============================================================================
// Query
// ============================================================================

/// A query under construction.
///
/// # Example
///
/// ```rust,no_run
/// use ledger_kit::{Amount, Ledger, Query};
///
/// # async fn example(ledger: Ledger) -> Result<(), ledger_kit::Error> {
/// let account = "0.1001".parse()?;
///
/// // Price a paid query before running it
/// let cost = Query::account_info(account).cost(&ledger).await?;
/// println!("answering will cost {cost}");
///
/// // Run it with a tighter ceiling than the client default
/// let info = Query::account_info(account)
///     .max_payment(Amount::millis(100))
///     .execute(&ledger)
///     .await?
///     .into_account_info()?;
/// println!("balance: {}", info.balance);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Query {
    body: QueryBody,
    payment: Option<Amount>,
    max_payment: Option<Amount>,
    node_account_ids: Option<Vec<AccountId>>,
}

impl Query {
    fn new(body: QueryBody) -> Self {
        Self {
            body,
            payment: None,
            max_payment: None,
            node_account_ids: None,
        }
    }

    /// Current balance of an account. Free.
    pub fn account_balance(account: AccountId) -> Self {
        Self::new(QueryBody::AccountBalance { account })
    }

    /// Full account information. Paid.
    pub fn account_info(account: AccountId) -> Self {
        Self::new(QueryBody::AccountInfo { account })
    }

    /// Receipt of a previously submitted transaction. Free.
    pub fn transaction_receipt(transaction_id: TransactionId) -> Self {
        Self::new(QueryBody::TransactionReceipt { transaction_id })
    }

    /// Full record of a previously submitted transaction. Paid.
    pub fn transaction_record(transaction_id: TransactionId) -> Self {
        Self::new(QueryBody::TransactionRecord { transaction_id })
    }

    /// The query kind.
    pub fn kind(&self) -> QueryKind {
        self.body.kind()
    }

    /// Attach an explicit payment amount, skipping the cost estimate.
    pub fn payment(mut self, amount: Amount) -> Self {
        self.payment = Some(amount);
        self
    }

    /// Ceiling for the automatically attached payment. Defaults to the
    /// client's `max_query_payment`.
    pub fn max_payment(mut self, amount: Amount) -> Self {
        self.max_payment = Some(amount);
        self
    }

    /// Restrict dispatch to an explicit node set.
    pub fn node_account_ids(mut self, ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(ids);
        self
    }

    fn resolve_nodes(&self, ledger: &Ledger) -> Result<Vec<AccountId>, Error> {
        match &self.node_account_ids {
            Some(ids) => {
                if ids.is_empty() {
                    return Err(Error::Config("explicit node list is empty".to_string()));
                }
                ledger.network().validate_node_ids(ids)?;
                Ok(ids.clone())
            }
            None => Ok(ledger
                .network()
                .resolve_node_ids(ledger.config().max_nodes_per_operation)),
        }
    }

    /// Ask a node what answering this query would cost. Free queries
    /// cost zero without a network round.
    pub async fn cost(&self, ledger: &Ledger) -> Result<Amount, Error> {
        if self.kind().is_free() {
            return Ok(Amount::ZERO);
        }
        let candidates = self.resolve_nodes(ledger)?;
        self.fetch_cost(ledger, &candidates).await
    }

    async fn fetch_cost(&self, ledger: &Ledger, candidates: &[AccountId]) -> Result<Amount, Error> {
        let executable = QueryExecutable {
            body: self.body.clone(),
            response_type: ResponseType::CostAnswer,
            payment: None,
            requests: Mutex::new(HashMap::new()),
        };
        let ctx = ledger.dispatch_context();
        let answer = execute::execute(&ctx, candidates, &executable).await?;
        answer.cost.ok_or_else(|| {
            TransportError::InvalidResponse("cost answer carried no cost".to_string()).into()
        })
    }

    /// Execute the query, resolving cost and payment first when the
    /// kind requires it.
    pub async fn execute(&self, ledger: &Ledger) -> Result<QueryResponse, Error> {
        let candidates = self.resolve_nodes(ledger)?;

        let payment = if self.kind().is_free() {
            None
        } else {
            let amount = match self.payment {
                Some(amount) => amount,
                None => {
                    let cost = self.fetch_cost(ledger, &candidates).await?;
                    let limit = self
                        .max_payment
                        .unwrap_or(ledger.config().max_query_payment);
                    if cost > limit {
                        return Err(Error::QueryPaymentExceeded { cost, limit });
                    }
                    cost
                }
            };
            let operator = ledger.operator().ok_or(Error::NoOperator)?;
            Some(PaymentSource {
                transaction_id: TransactionId::generate(operator.account_id()),
                payer: operator.account_id(),
                key: operator.key(),
                amount,
            })
        };

        let executable = QueryExecutable {
            body: self.body.clone(),
            response_type: ResponseType::Answer,
            payment,
            requests: Mutex::new(HashMap::new()),
        };
        let ctx = ledger.dispatch_context();
        let answer = execute::execute(&ctx, &candidates, &executable).await?;

        let payload = answer.payload.ok_or_else(|| {
            Error::Transport(TransportError::InvalidResponse(
                "answer carried no payload".to_string(),
            ))
        })?;
        QueryResponse::from_payload(self.kind(), payload)
    }
}

// ============================================================================
// QueryResponse
// ============================================================================

/// A typed query answer.
#[derive(Clone, Debug)]
pub enum QueryResponse {
    AccountBalance(AccountBalance),
    AccountInfo(AccountInfo),
    TransactionReceipt(TransactionReceipt),
    TransactionRecord(TransactionRecord),
}

impl QueryResponse {
    fn from_payload(kind: QueryKind, payload: serde_json::Value) -> Result<Self, Error> {
        let decode_err = |e: serde_json::Error| Error::Transport(TransportError::Json(e));
        Ok(match kind {
            QueryKind::AccountBalance => {
                QueryResponse::AccountBalance(serde_json::from_value(payload).map_err(decode_err)?)
            }
            QueryKind::AccountInfo => {
                QueryResponse::AccountInfo(serde_json::from_value(payload).map_err(decode_err)?)
            }
            QueryKind::TransactionReceipt => QueryResponse::TransactionReceipt(
                serde_json::from_value(payload).map_err(decode_err)?,
            ),
            QueryKind::TransactionRecord => QueryResponse::TransactionRecord(
                serde_json::from_value(payload).map_err(decode_err)?,
            ),
        })
    }

    /// Unwrap an account balance answer.
    pub fn into_account_balance(self) -> Result<AccountBalance, Error> {
        match self {
            QueryResponse::AccountBalance(balance) => Ok(balance),
            other => Err(mismatch("account balance", &other)),
        }
    }

    /// Unwrap an account info answer.
    pub fn into_account_info(self) -> Result<AccountInfo, Error> {
        match self {
            QueryResponse::AccountInfo(info) => Ok(info),
            other => Err(mismatch("account info", &other)),
        }
    }

    /// Unwrap a receipt answer.
    pub fn into_transaction_receipt(self) -> Result<TransactionReceipt, Error> {
        match self {
            QueryResponse::TransactionReceipt(receipt) => Ok(receipt),
            other => Err(mismatch("transaction receipt", &other)),
        }
    }

    /// Unwrap a record answer.
    pub fn into_transaction_record(self) -> Result<TransactionRecord, Error> {
        match self {
            QueryResponse::TransactionRecord(record) => Ok(record),
            other => Err(mismatch("transaction record", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &QueryResponse) -> Error {
    Error::Config(format!("expected {expected} answer, got {got:?}"))
}

// ============================================================================
// QueryExecutable
// ============================================================================

/// Everything needed to build per-node payment transfers.
struct PaymentSource {
    transaction_id: TransactionId,
    payer: AccountId,
    key: SigningKey,
    amount: Amount,
}

/// The engine-facing form of a query: envelope per node, payment
/// included when the kind requires one.
struct QueryExecutable {
    body: QueryBody,
    response_type: ResponseType,
    payment: Option<PaymentSource>,
    requests: Mutex<HashMap<AccountId, serde_json::Value>>,
}

impl QueryExecutable {
    /// Sign a payment transfer addressed to one node.
    async fn payment_for(
        &self,
        source: &PaymentSource,
        node_account_id: AccountId,
    ) -> Result<SignedRequest, Error> {
        let nanos = i64::try_from(source.amount.as_nanos())
            .map_err(|_| Error::Config("query payment amount too large".to_string()))?;
        let body = TransactionBody {
            transaction_id: source.transaction_id,
            node_account_id,
            max_fee: Amount::credits(1),
            valid_duration_secs: PAYMENT_VALID_DURATION_SECS,
            memo: String::new(),
            operation: OperationBody::Transfer {
                transfers: vec![
                    TransferEntry {
                        account: source.payer,
                        amount: -nanos,
                    },
                    TransferEntry {
                        account: node_account_id,
                        amount: nanos,
                    },
                ],
            },
        };

        let body_bytes = body.to_bytes();
        let signature = source.key.sign(&body_bytes).await?;
        Ok(SignedRequest {
            body_bytes,
            signatures: vec![SignaturePair {
                public_key: source.key.public_key().clone(),
                signature,
            }],
        })
    }
}

impl Executable for QueryExecutable {
    type Response = QueryAnswer;

    fn method(&self) -> &'static str {
        self.body.kind().method()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.body
            .subject_transaction_id()
            .or_else(|| self.payment.as_ref().map(|p| p.transaction_id))
    }

    async fn request_for(&self, node: &Node) -> Result<serde_json::Value, Error> {
        let node_account_id = node.account_id();
        if let Some(params) = self.requests.lock().unwrap().get(&node_account_id) {
            return Ok(params.clone());
        }

        let payment = match &self.payment {
            Some(source) => Some(self.payment_for(source, node_account_id).await?),
            None => None,
        };
        let envelope = QueryEnvelope {
            response_type: self.response_type,
            payment,
            query: self.body.clone(),
        };
        let params = json!({ "query": envelope.to_base64() });
        self.requests
            .lock()
            .unwrap()
            .insert(node_account_id, params.clone());
        Ok(params)
    }

    fn status_of(&self, response: &serde_json::Value) -> Result<Status, Error> {
        let answer: QueryAnswer =
            serde_json::from_value(response.clone()).map_err(TransportError::Json)?;
        Ok(answer.status)
    }

    fn make_response(
        &self,
        response: serde_json::Value,
        _node: AccountId,
        _duplicate: bool,
    ) -> Result<QueryAnswer, Error> {
        serde_json::from_value(response)
            .map_err(|e| Error::Transport(TransportError::Json(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kinds() {
        let account = AccountId::new(0, 1001);
        assert_eq!(
            Query::account_balance(account).kind(),
            QueryKind::AccountBalance
        );
        assert_eq!(Query::account_info(account).kind(), QueryKind::AccountInfo);

        let id = TransactionId::generate(account);
        assert_eq!(
            Query::transaction_receipt(id).kind(),
            QueryKind::TransactionReceipt
        );
        assert_eq!(
            Query::transaction_record(id).kind(),
            QueryKind::TransactionRecord
        );
    }

    #[test]
    fn test_response_unwrap_mismatch() {
        let response = QueryResponse::AccountBalance(AccountBalance {
            account_id: AccountId::new(0, 1001),
            balance: Amount::credits(1),
        });
        assert!(response.clone().into_account_balance().is_ok());
        assert!(matches!(
            response.into_account_info(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_payload_decodes_by_kind() {
        let payload = serde_json::json!({"account_id": "0.1001", "balance": 42});
        let response =
            QueryResponse::from_payload(QueryKind::AccountBalance, payload).unwrap();
        let balance = response.into_account_balance().unwrap();
        assert_eq!(balance.balance, Amount::nanos(42));
    }

    #[tokio::test]
    async fn test_payment_legs_balance() {
        let secret = crate::types::SecretKey::generate();
        let source = PaymentSource {
            transaction_id: TransactionId::generate(AccountId::new(0, 1001)),
            payer: AccountId::new(0, 1001),
            key: SigningKey::new(secret),
            amount: Amount::millis(25),
        };
        let executable = QueryExecutable {
            body: QueryBody::AccountInfo {
                account: AccountId::new(0, 1001),
            },
            response_type: ResponseType::Answer,
            payment: None,
            requests: Mutex::new(HashMap::new()),
        };

        let request = executable
            .payment_for(&source, AccountId::new(0, 3))
            .await
            .unwrap();
        let body: TransactionBody = borsh::from_slice(&request.body_bytes).unwrap();
        let OperationBody::Transfer { transfers } = body.operation else {
            panic!("expected transfer payment");
        };
        assert_eq!(transfers.iter().map(|t| t.amount).sum::<i64>(), 0);
        assert_eq!(body.node_account_id, AccountId::new(0, 3));
        assert_eq!(request.signatures.len(), 1);
    }
}
