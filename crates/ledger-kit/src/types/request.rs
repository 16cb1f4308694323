//! Canonical wire request types.
//!
//! A [`TransactionBody`] is borsh-serialized into the byte string that
//! signatures cover. Borsh is canonical — the same body always produces
//! the same bytes — which is what makes per-node request caching sound:
//! rebuilding a request for the same (operation, node, identifier) is
//! byte-identical, signatures included (Ed25519 is deterministic).
//!
//! The field layout and the status-code space are defined by the
//! network; this crate populates and reads them but never reshapes
//! them.

use std::fmt::{self, Debug, Display};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha384};

use crate::error::Error;

use super::{AccountId, Amount, OperationBody, PublicKey, QueryBody, Signature, TransactionId};

// ============================================================================
// TransactionBody
// ============================================================================

/// The signable body of a transaction, bound to one target node.
///
/// Per-node requests for the same logical transaction share every field
/// except `node_account_id`.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct TransactionBody {
    /// The (payer, valid-start) identifier shared by all per-node
    /// variants.
    pub transaction_id: TransactionId,
    /// The node this particular request is addressed to. A node rejects
    /// requests addressed to a different node.
    pub node_account_id: AccountId,
    /// The most the payer is willing to be charged.
    pub max_fee: Amount,
    /// Seconds after `valid_start` during which the network will accept
    /// this transaction.
    pub valid_duration_secs: u64,
    /// Free-form memo, at most [`MAX_MEMO_BYTES`] bytes.
    pub memo: String,
    /// The kind-specific payload.
    pub operation: OperationBody,
}

/// Maximum memo length accepted by the network, in bytes.
pub const MAX_MEMO_BYTES: usize = 100;

impl TransactionBody {
    /// The canonical bytes signatures are computed over.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("transaction body serialization should never fail")
    }
}

// ============================================================================
// SignedRequest
// ============================================================================

/// A `(public key, signature)` pair. A signed request carries at most
/// one pair per public key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignaturePair {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// A serialized, signed request ready to send to one node.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedRequest {
    /// The borsh bytes of the [`TransactionBody`].
    pub body_bytes: Vec<u8>,
    /// Signatures over `body_bytes`, keyed by public key.
    pub signatures: Vec<SignaturePair>,
}

impl SignedRequest {
    /// Serialize for transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("signed request serialization should never fail")
    }

    /// Serialize to base64 for embedding in a JSON request.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Deserialize from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        borsh::from_slice(bytes)
            .map_err(|e| Error::Config(format!("Failed to deserialize signed request: {}", e)))
    }

    /// Deserialize from base64 produced by
    /// [`to_base64`](Self::to_base64).
    pub fn from_base64(s: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| Error::Config(format!("Invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// The hash the network records for this request.
    pub fn transaction_hash(&self) -> TransactionHash {
        let digest = Sha384::digest(self.to_bytes());
        TransactionHash(digest.into())
    }
}

/// SHA-384 hash of a signed request, as recorded by the network.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub [u8; 48]);

impl TransactionHash {
    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }
}

impl Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", self)
    }
}

// ============================================================================
// Query envelope
// ============================================================================

/// Whether a query should be answered, or only priced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ResponseType {
    /// Answer the query.
    Answer,
    /// Return only the cost of answering it.
    CostAnswer,
}

/// A query as sent to one node: the query body plus, for paid queries,
/// a payment transfer addressed to that node.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct QueryEnvelope {
    pub response_type: ResponseType,
    /// Payment transfer to the answering node. `None` for free queries
    /// and for cost estimates.
    pub payment: Option<SignedRequest>,
    pub query: QueryBody,
}

impl QueryEnvelope {
    /// Serialize for transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("query envelope serialization should never fail")
    }

    /// Serialize to base64 for embedding in a JSON request.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SecretKey, Timestamp, TransferEntry};

    fn sample_body(node: AccountId) -> TransactionBody {
        TransactionBody {
            transaction_id: TransactionId::new(
                AccountId::new(0, 1001),
                Timestamp::new(1650000000, 1),
            ),
            node_account_id: node,
            max_fee: Amount::credits(1),
            valid_duration_secs: 120,
            memo: String::new(),
            operation: OperationBody::Transfer {
                transfers: vec![
                    TransferEntry {
                        account: AccountId::new(0, 1001),
                        amount: -100,
                    },
                    TransferEntry {
                        account: AccountId::new(0, 1002),
                        amount: 100,
                    },
                ],
            },
        }
    }

    #[test]
    fn test_body_bytes_are_deterministic() {
        let a = sample_body(AccountId::new(0, 3));
        let b = sample_body(AccountId::new(0, 3));
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_body_bytes_differ_per_node() {
        let a = sample_body(AccountId::new(0, 3));
        let b = sample_body(AccountId::new(0, 4));
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_signed_request_roundtrip() {
        let secret = SecretKey::generate();
        let body = sample_body(AccountId::new(0, 3));
        let body_bytes = body.to_bytes();
        let request = SignedRequest {
            signatures: vec![SignaturePair {
                public_key: secret.public_key(),
                signature: secret.sign(&body_bytes),
            }],
            body_bytes,
        };

        let back = SignedRequest::from_base64(&request.to_base64()).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_transaction_hash_is_stable() {
        let secret = SecretKey::generate();
        let body_bytes = sample_body(AccountId::new(0, 3)).to_bytes();
        let request = SignedRequest {
            signatures: vec![SignaturePair {
                public_key: secret.public_key(),
                signature: secret.sign(&body_bytes),
            }],
            body_bytes,
        };

        let h1 = request.transaction_hash();
        let h2 = request.transaction_hash();
        assert_eq!(h1, h2);
        assert_eq!(h1.to_string().len(), 96); // 48 bytes hex
    }

    #[test]
    fn test_signature_covers_body_bytes() {
        let secret = SecretKey::generate();
        let body = sample_body(AccountId::new(0, 3));
        let body_bytes = body.to_bytes();
        let signature = secret.sign(&body_bytes);
        assert!(secret.public_key().verify(&body_bytes, &signature));
    }

    #[test]
    fn test_query_envelope_base64() {
        let envelope = QueryEnvelope {
            response_type: ResponseType::CostAnswer,
            payment: None,
            query: QueryBody::AccountBalance {
                account: AccountId::new(0, 1001),
            },
        };
        assert!(!envelope.to_base64().is_empty());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(SignedRequest::from_bytes(&[1, 2, 3]).is_err());
        assert!(SignedRequest::from_base64("!!!").is_err());
    }
}
