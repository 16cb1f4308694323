//! A clean, ergonomic Rust client for the Grid distributed ledger.
//!
//! **ledger-kit** submits signed transactions and queries to a network
//! of independent nodes, any of which may be slow, unreachable, or
//! transiently rejecting work. The client picks a target node, builds a
//! per-node signed request, classifies the answer, and retries against
//! other nodes with health-aware backoff — callers see one result or
//! one error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ledger_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ledger_kit::Error> {
//!     let ledger = Ledger::testnet()
//!         .credentials("ed25519:...", "0.1001")?
//!         .build();
//!
//!     // Submit a transfer and wait for its receipt
//!     let to = "0.1002".parse()?;
//!     let response = ledger.transfer(to, Amount::credits(1))?.execute(&ledger).await?;
//!     let receipt = response.get_receipt(&ledger).await?;
//!     println!("final status: {}", receipt.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Design Principles
//!
//! 1. **Single entry point**: everything hangs off the [`Ledger`] client
//! 2. **Configure once**: network, operator, and retry policy are set at
//!    client creation and shared by every operation
//! 3. **Freeze before dispatch**: a [`Transaction`] becomes an immutable
//!    [`FrozenTransaction`] with a fixed identifier and node set — the
//!    type system rules out mutation mid-dispatch
//! 4. **Explicit units**: amounts are `"5 credits"` / `"100 nanos"`,
//!    never bare numbers
//! 5. **Retries are contained**: transient node and transport failures
//!    never escape the dispatch engine; callers see a result, a terminal
//!    rejection, or an exhaustion error with the cause attached
//!
//! # Core Types
//!
//! - [`AccountId`] — `realm.num` account identifier
//! - [`TransactionId`] — the `(payer, valid-start)` pair naming one
//!   logical operation
//! - [`Amount`] — native-currency amount with nanocredit precision
//! - [`PublicKey`], [`SecretKey`] — Ed25519 keys
//! - [`Status`] — the network's precheck code space

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Error, TransportError};
pub use types::*;

pub use client::{
    ChannelPool, Classifier, DispatchConfig, EnvSigner, FrozenTransaction, InMemorySigner, Ledger,
    LedgerBuilder, Network, Node, Query, QueryResponse, Signer, SigningKey, Transaction,
    TransactionResponse, Transport,
};

#[cfg(feature = "file-signer")]
pub use client::FileSigner;
