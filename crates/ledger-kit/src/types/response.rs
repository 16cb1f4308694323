//! Serde views of node responses.
//!
//! These mirror the JSON a node returns; field layout follows the
//! network's schema and is not reshaped here.

use serde::Deserialize;
use serde_with::serde_as;

use super::{AccountId, Amount, PublicKey, Status, Timestamp, TransactionId};

/// Synchronous acknowledgement of a submitted transaction.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmitAck {
    /// The precheck code.
    pub status: Status,
}

/// Envelope of every query response.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryAnswer {
    /// The precheck code.
    pub status: Status,
    /// Charge for answering, in nanocredits. Present on cost answers
    /// and on paid answers.
    #[serde(default)]
    pub cost: Option<Amount>,
    /// Kind-specific payload. Absent on cost answers and failures.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Answer to an account balance query.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: Amount,
}

/// Answer to an account info query.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    /// The account's controlling key.
    pub key: PublicKey,
    pub balance: Amount,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Post-consensus receipt of a transaction.
#[derive(Clone, Debug, Deserialize)]
pub struct TransactionReceipt {
    /// The consensus outcome of the transaction.
    pub status: Status,
    /// For account-create transactions, the new account.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

/// One balance change in a transaction record.
#[derive(Clone, Debug, Deserialize)]
pub struct TransferView {
    pub account_id: AccountId,
    /// Signed change in nanocredits.
    pub amount: i64,
}

/// Full post-consensus record of a transaction.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct TransactionRecord {
    pub receipt: TransactionReceipt,
    pub transaction_id: TransactionId,
    /// SHA-384 of the signed request the network executed.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub transaction_hash: Vec<u8>,
    /// When the network reached consensus on the transaction.
    pub consensus_timestamp: Timestamp,
    /// The fee actually charged.
    pub transaction_fee: Amount,
    /// All balance changes, fees included.
    #[serde(default)]
    pub transfers: Vec<TransferView>,
    #[serde(default)]
    pub memo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_ack_deserializes() {
        let ack: SubmitAck = serde_json::from_str(r#"{"status": "OK"}"#).unwrap();
        assert_eq!(ack.status, Status::Ok);
    }

    #[test]
    fn test_query_answer_defaults() {
        let answer: QueryAnswer = serde_json::from_str(r#"{"status": "BUSY"}"#).unwrap();
        assert_eq!(answer.status, Status::Busy);
        assert!(answer.cost.is_none());
        assert!(answer.payload.is_none());
    }

    #[test]
    fn test_query_answer_with_cost() {
        let answer: QueryAnswer =
            serde_json::from_str(r#"{"status": "OK", "cost": 25000000}"#).unwrap();
        assert_eq!(answer.cost, Some(Amount::nanos(25_000_000)));
    }

    #[test]
    fn test_account_balance_deserializes() {
        let balance: AccountBalance =
            serde_json::from_str(r#"{"account_id": "0.1001", "balance": 5000000000}"#).unwrap();
        assert_eq!(balance.account_id, AccountId::new(0, 1001));
        assert_eq!(balance.balance, Amount::credits(5));
    }

    #[test]
    fn test_receipt_deserializes() {
        let receipt: TransactionReceipt =
            serde_json::from_str(r#"{"status": "OK", "account_id": "0.2001"}"#).unwrap();
        assert_eq!(receipt.status, Status::Ok);
        assert_eq!(receipt.account_id, Some(AccountId::new(0, 2001)));
    }

    #[test]
    fn test_record_deserializes() {
        let json = r#"{
            "receipt": {"status": "OK"},
            "transaction_id": "0.1001@1650000000.000000001",
            "transaction_hash": "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff0011223344556677",
            "consensus_timestamp": "1650000003.000000000",
            "transaction_fee": 75000000,
            "transfers": [
                {"account_id": "0.1001", "amount": -1075000000},
                {"account_id": "0.1002", "amount": 1000000000},
                {"account_id": "0.3", "amount": 75000000}
            ]
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.receipt.status, Status::Ok);
        assert_eq!(record.transaction_fee, Amount::nanos(75_000_000));
        assert_eq!(record.transfers.len(), 3);
        assert_eq!(record.transaction_hash.len(), 40);
        assert_eq!(record.memo, "");
    }
}
