//! Client module: the dispatch engine and everything it orchestrates.
//!
//! - [`Ledger`] — The main client, the single entry point for all
//!   operations
//! - [`LedgerBuilder`] — Fluent builder for configuring the client
//! - [`Network`] — Node registry with per-node health and backoff
//! - [`ChannelPool`] / [`Transport`] — Cached per-node channels and the
//!   injectable remote-call seam
//! - [`Classifier`] — Status-to-outcome table, configurable per network
//!
//! # Signers
//!
//! | Signer | Use Case |
//! |--------|----------|
//! | [`InMemorySigner`] | Simple scripts with a secret key in memory |
//! | [`EnvSigner`] | CI/CD via `LEDGER_ACCOUNT_ID` / `LEDGER_SECRET_KEY` |
//! | [`FileSigner`] | Load from `~/.ledger-credentials` |
//!
//! # Operations
//!
//! - [`Transaction`] — mutable builder; [`Transaction::freeze_with`]
//!   yields the immutable [`FrozenTransaction`] for signing and
//!   execution
//! - [`Query`] — read operations, including the paid-query cost path

mod channel;
mod execute;
mod ledger;
mod network;
mod query;
mod signer;
mod transaction;

pub use channel::{ChannelPool, Transport};
pub use execute::{Classifier, DispatchConfig};
pub use ledger::{Ledger, LedgerBuilder};
pub use network::{Network, Node};
pub use query::{Query, QueryResponse};
pub use signer::{EnvSigner, InMemorySigner, Signer, SigningKey};
pub use transaction::{FrozenTransaction, Transaction, TransactionResponse};

#[cfg(feature = "file-signer")]
pub use signer::FileSigner;
