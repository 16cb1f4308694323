//! The main Ledger client.

use std::sync::Arc;

use crate::error::Error;
use crate::types::{
    AccountBalance, AccountId, AccountInfo, Amount, Status, TransactionId, TransactionReceipt,
    TransactionRecord,
};

use super::channel::{ChannelPool, Transport};
use super::execute::{Classifier, DispatchConfig, DispatchContext};
use super::network::Network;
use super::query::Query;
use super::signer::{InMemorySigner, Signer};
use super::transaction::Transaction;

/// The main client for interacting with a Grid ledger network.
///
/// A `Ledger` bundles the node registry, the channel pool, the
/// operator identity, and the dispatch configuration. It is cheap to
/// clone; clones share node health state and connections.
///
/// # Example
///
/// ```rust,no_run
/// use ledger_kit::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), ledger_kit::Error> {
///     // Read-only client (no operator)
///     let ledger = Ledger::testnet().build();
///     let account = "0.1001".parse()?;
///     let balance = ledger.account_balance(account).await?;
///     println!("Balance: {}", balance.balance);
///
///     // Client with an operator for transactions
///     let ledger = Ledger::testnet()
///         .credentials("ed25519:...", "0.1001")?
///         .build();
///     let to = "0.1002".parse()?;
///     ledger.transfer(to, Amount::credits(1))?.execute(&ledger).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Ledger {
    network: Arc<Network>,
    transport: Arc<dyn Transport>,
    operator: Option<Arc<dyn Signer>>,
    classifier: Arc<Classifier>,
    config: Arc<DispatchConfig>,
}

impl Ledger {
    /// Create a builder for mainnet.
    pub fn mainnet() -> LedgerBuilder {
        LedgerBuilder::new(Network::mainnet())
    }

    /// Create a builder for testnet.
    pub fn testnet() -> LedgerBuilder {
        LedgerBuilder::new(Network::testnet())
    }

    /// Create a builder for a custom network.
    pub fn for_network(network: Network) -> LedgerBuilder {
        LedgerBuilder::new(network)
    }

    /// Create a configured client from environment variables.
    ///
    /// Reads:
    /// - `LEDGER_NETWORK` (optional): `"mainnet"` or `"testnet"`,
    ///   defaulting to `"testnet"`.
    /// - `LEDGER_ACCOUNT_ID` / `LEDGER_SECRET_KEY` (optional): operator
    ///   credentials; both or neither must be set.
    pub fn from_env() -> Result<Ledger, Error> {
        let network = std::env::var("LEDGER_NETWORK").ok();
        let account_id = std::env::var("LEDGER_ACCOUNT_ID").ok();
        let secret_key = std::env::var("LEDGER_SECRET_KEY").ok();

        let mut builder = match network.as_deref() {
            Some("mainnet") => Ledger::mainnet(),
            Some("testnet") | None => Ledger::testnet(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "LEDGER_NETWORK must be 'mainnet' or 'testnet', got '{}'",
                    other
                )));
            }
        };

        match (account_id, secret_key) {
            (Some(account), Some(key)) => {
                builder = builder.credentials(&key, &account)?;
            }
            (Some(_), None) => {
                return Err(Error::Config(
                    "LEDGER_ACCOUNT_ID is set but LEDGER_SECRET_KEY is missing".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "LEDGER_SECRET_KEY is set but LEDGER_ACCOUNT_ID is missing".into(),
                ));
            }
            (None, None) => {
                // Read-only client
            }
        }

        Ok(builder.build())
    }

    /// The node registry this client dispatches against.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The operator's account ID, if one is configured.
    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.operator.as_ref().map(|s| s.account_id())
    }

    /// The dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub(crate) fn operator(&self) -> Option<&Arc<dyn Signer>> {
        self.operator.as_ref()
    }

    pub(crate) fn dispatch_context(&self) -> DispatchContext<'_> {
        DispatchContext {
            network: &self.network,
            transport: &*self.transport,
            classifier: &self.classifier,
            config: &self.config,
        }
    }

    // ========================================================================
    // Write Operations
    // ========================================================================

    /// Transfer from the operator account.
    ///
    /// Returns a [`Transaction`] that can be configured further before
    /// freezing and executing.
    pub fn transfer(&self, to: AccountId, amount: Amount) -> Result<Transaction, Error> {
        let from = self.operator_account_id().ok_or(Error::NoOperator)?;
        Ok(Transaction::transfer(from, to, amount))
    }

    // ========================================================================
    // Read Operations
    // ========================================================================

    /// Get an account's balance.
    pub async fn account_balance(&self, account: AccountId) -> Result<AccountBalance, Error> {
        Query::account_balance(account)
            .execute(self)
            .await?
            .into_account_balance()
    }

    /// Get full account information. Paid; the payment is resolved
    /// through the cost estimate unless set on a [`Query`] directly.
    pub async fn account_info(&self, account: AccountId) -> Result<AccountInfo, Error> {
        Query::account_info(account)
            .execute(self)
            .await?
            .into_account_info()
    }

    /// Fetch the receipt of a previously submitted transaction.
    pub async fn transaction_receipt(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionReceipt, Error> {
        Query::transaction_receipt(transaction_id)
            .execute(self)
            .await?
            .into_transaction_receipt()
    }

    /// Fetch the full record of a previously submitted transaction.
    pub async fn transaction_record(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionRecord, Error> {
        Query::transaction_record(transaction_id)
            .execute(self)
            .await?
            .into_transaction_record()
    }

    /// Check whether an account exists, by probing its balance.
    pub async fn account_exists(&self, account: AccountId) -> Result<bool, Error> {
        match self.account_balance(account).await {
            Ok(_) => Ok(true),
            Err(Error::Precheck {
                status: Status::AccountNotFound,
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("network", &self.network)
            .field("operator", &self.operator_account_id())
            .finish()
    }
}

// ============================================================================
// LedgerBuilder
// ============================================================================

/// Builder for creating a [`Ledger`] client.
///
/// # Example
///
/// ```rust,ignore
/// use ledger_kit::*;
/// use std::time::Duration;
///
/// let ledger = Ledger::testnet()
///     .credentials("ed25519:...", "0.1001")?
///     .max_attempts(6)
///     .attempt_timeout(Duration::from_secs(5))
///     .max_query_payment(Amount::millis(500))
///     .build();
/// ```
pub struct LedgerBuilder {
    network: Network,
    operator: Option<Arc<dyn Signer>>,
    config: DispatchConfig,
    classifier: Classifier,
    transport: Option<Arc<dyn Transport>>,
}

impl LedgerBuilder {
    fn new(network: Network) -> Self {
        Self {
            network,
            operator: None,
            config: DispatchConfig::default(),
            classifier: Classifier::default(),
            transport: None,
        }
    }

    /// Set the operator: the identity that pays for and signs
    /// operations.
    pub fn operator(mut self, signer: impl Signer + 'static) -> Self {
        self.operator = Some(Arc::new(signer));
        self
    }

    /// Set up the operator from a secret key string and account ID.
    pub fn credentials(
        mut self,
        secret_key: impl AsRef<str>,
        account_id: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let signer = InMemorySigner::new(account_id, secret_key)?;
        self.operator = Some(Arc::new(signer));
        Ok(self)
    }

    /// Attempts across all nodes before giving up.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Deadline for a single network call.
    pub fn attempt_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.attempt_timeout = timeout;
        self
    }

    /// Overall deadline for one operation, retries included.
    pub fn operation_deadline(mut self, deadline: std::time::Duration) -> Self {
        self.config.operation_deadline = deadline;
        self
    }

    /// Seed for the exponential inter-attempt backoff.
    pub fn min_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.config.min_backoff = backoff;
        self
    }

    /// Cap for the exponential inter-attempt backoff.
    pub fn max_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.config.max_backoff = backoff;
        self
    }

    /// Consecutive failures before selection stops readmitting a node
    /// early.
    pub fn max_node_attempts(mut self, attempts: u32) -> Self {
        self.config.max_node_attempts = attempts;
        self
    }

    /// Same-node attempts on busy answers before rotating.
    pub fn node_busy_retries(mut self, retries: u32) -> Self {
        self.config.node_busy_retries = retries;
        self
    }

    /// How many nodes a single operation targets.
    pub fn max_nodes_per_operation(mut self, max: usize) -> Self {
        self.config.max_nodes_per_operation = Some(max);
        self
    }

    /// Ceiling for automatically attached query payments.
    pub fn max_query_payment(mut self, amount: Amount) -> Self {
        self.config.max_query_payment = amount;
        self
    }

    /// Override the per-kind default fee ceilings.
    pub fn max_transaction_fee(mut self, amount: Amount) -> Self {
        self.config.max_transaction_fee = Some(amount);
        self
    }

    /// Replace the status classifier, e.g. for a network with a
    /// different transient code set.
    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the transport. The default is the JSON-RPC
    /// [`ChannelPool`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client.
    pub fn build(self) -> Ledger {
        let mut config = self.config;
        if config.max_nodes_per_operation.is_none() {
            // One third of the network, rounded up
            let n = self.network.node_ids().len();
            config.max_nodes_per_operation = Some(n.div_ceil(3));
        }

        Ledger {
            network: Arc::new(self.network),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ChannelPool::new())),
            operator: self.operator,
            classifier: Arc::new(self.classifier),
            config: Arc::new(config),
        }
    }
}

impl From<LedgerBuilder> for Ledger {
    fn from(builder: LedgerBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKey;

    #[test]
    fn test_testnet_builder() {
        let ledger = Ledger::testnet().build();
        assert!(ledger.network().node_ids().len() >= 3);
        assert!(ledger.operator_account_id().is_none());
    }

    #[test]
    fn test_builder_with_credentials() {
        let secret = SecretKey::generate();
        let ledger = Ledger::testnet()
            .credentials(secret.to_string(), "0.1001")
            .unwrap()
            .build();
        assert_eq!(
            ledger.operator_account_id(),
            Some(AccountId::new(0, 1001))
        );
    }

    #[test]
    fn test_builder_with_operator_signer() {
        let signer =
            InMemorySigner::from_secret_key(AccountId::new(0, 77), SecretKey::generate());
        let ledger = Ledger::testnet().operator(signer).build();
        assert_eq!(ledger.operator_account_id(), Some(AccountId::new(0, 77)));
    }

    #[test]
    fn test_builder_credentials_invalid_key() {
        assert!(Ledger::testnet().credentials("invalid-key", "0.1001").is_err());
    }

    #[test]
    fn test_builder_config_knobs() {
        let ledger = Ledger::testnet()
            .max_attempts(4)
            .max_query_payment(Amount::millis(500))
            .max_transaction_fee(Amount::credits(3))
            .node_busy_retries(2)
            .build();

        assert_eq!(ledger.config().max_attempts, 4);
        assert_eq!(ledger.config().max_query_payment, Amount::millis(500));
        assert_eq!(ledger.config().max_transaction_fee, Some(Amount::credits(3)));
        assert_eq!(ledger.config().node_busy_retries, 2);
    }

    #[test]
    fn test_default_node_cap_is_third_of_network() {
        // Testnet has 4 nodes; a third rounded up is 2
        let ledger = Ledger::testnet().build();
        assert_eq!(ledger.config().max_nodes_per_operation, Some(2));

        let explicit = Ledger::testnet().max_nodes_per_operation(4).build();
        assert_eq!(explicit.config().max_nodes_per_operation, Some(4));
    }

    #[test]
    fn test_transfer_requires_operator() {
        let ledger = Ledger::testnet().build();
        assert!(matches!(
            ledger.transfer(AccountId::new(0, 2), Amount::credits(1)),
            Err(Error::NoOperator)
        ));
    }

    #[test]
    fn test_ledger_clone_shares_network() {
        let ledger = Ledger::testnet().build();
        let clone = ledger.clone();
        assert!(std::ptr::eq(ledger.network(), clone.network()));
    }

    #[test]
    fn test_builder_from_trait() {
        let ledger: Ledger = Ledger::testnet().into();
        assert!(!ledger.network().node_ids().is_empty());
    }

    // NOTE: Environment variable scenarios are consolidated into one
    // test because they mutate global state and would race in parallel.
    #[test]
    fn test_from_env_scenarios() {
        fn clear_env() {
            // SAFETY: test-only, execution is controlled here
            unsafe {
                std::env::remove_var("LEDGER_NETWORK");
                std::env::remove_var("LEDGER_ACCOUNT_ID");
                std::env::remove_var("LEDGER_SECRET_KEY");
            }
        }

        // No vars: testnet, read-only
        clear_env();
        {
            let ledger = Ledger::from_env().unwrap();
            assert!(ledger.operator_account_id().is_none());
        }

        // Full credentials
        clear_env();
        let secret = SecretKey::generate();
        unsafe {
            std::env::set_var("LEDGER_NETWORK", "testnet");
            std::env::set_var("LEDGER_ACCOUNT_ID", "0.1001");
            std::env::set_var("LEDGER_SECRET_KEY", secret.to_string());
        }
        {
            let ledger = Ledger::from_env().unwrap();
            assert_eq!(ledger.operator_account_id(), Some(AccountId::new(0, 1001)));
        }

        // Account without key
        clear_env();
        unsafe {
            std::env::set_var("LEDGER_ACCOUNT_ID", "0.1001");
        }
        {
            let err = Ledger::from_env().unwrap_err();
            assert!(err.to_string().contains("LEDGER_SECRET_KEY"));
        }

        // Unknown network name
        clear_env();
        unsafe {
            std::env::set_var("LEDGER_NETWORK", "devnet");
        }
        {
            assert!(Ledger::from_env().is_err());
        }

        clear_env();
    }
}
