//! The dispatch engine.
//!
//! One attempt loop shared by transactions, queries, and cost
//! estimates: choose a node, build or reuse the per-node request, send
//! it with a bounded per-attempt deadline, classify the result, then
//! accept, retry, rotate, or fail. Attempts for a single logical
//! operation are strictly sequential — a request is never in flight to
//! two nodes at once, so an accepted-but-unacknowledged send cannot
//! race a duplicate send.
//!
//! Retryable failures never escape this module; callers see either a
//! result, a terminal error, or — once the attempt budget or deadline
//! is spent — an exhaustion/cancellation error carrying the last
//! transient failure as its cause.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, TransportError};
use crate::types::{AccountId, Amount, Outcome, Status, TransactionId};

use super::channel::Transport;
use super::network::{Network, Node};

// ============================================================================
// Classifier
// ============================================================================

/// Maps precheck codes to attempt outcomes.
///
/// The transient set is network policy, not client logic, so it is
/// plain data and injectable per client (`LedgerBuilder::classifier`).
#[derive(Clone, Debug)]
pub struct Classifier {
    transient: Vec<Status>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            transient: vec![
                Status::Busy,
                Status::PlatformNotActive,
                Status::PlatformTransactionNotCreated,
                Status::ReceiptNotFound,
            ],
        }
    }
}

impl Classifier {
    /// Build a classifier with a custom transient set.
    pub fn new(transient: impl IntoIterator<Item = Status>) -> Self {
        Self {
            transient: transient.into_iter().collect(),
        }
    }

    /// Classify one precheck code.
    pub fn outcome(&self, status: Status) -> Outcome {
        match status {
            Status::Ok => Outcome::Accepted,
            Status::DuplicateTransaction => Outcome::Duplicate,
            s if self.transient.contains(&s) => Outcome::Transient,
            _ => Outcome::Terminal,
        }
    }
}

// ============================================================================
// Dispatch configuration
// ============================================================================

/// Client-facing dispatch tuning. Owned by the client, consumed by the
/// engine.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Attempts across all nodes before giving up.
    pub max_attempts: u32,
    /// Deadline for a single network call.
    pub attempt_timeout: Duration,
    /// Overall deadline for one operation, retries and backoff
    /// included.
    pub operation_deadline: Duration,
    /// Consecutive failures a node may accumulate before selection
    /// stops readmitting it early.
    pub max_node_attempts: u32,
    /// Additional same-node attempts on a busy answer before rotating.
    pub node_busy_retries: u32,
    /// Seed for the exponential inter-attempt backoff.
    pub min_backoff: Duration,
    /// Cap for the exponential inter-attempt backoff.
    pub max_backoff: Duration,
    /// How many nodes a single operation targets. `None` means one
    /// third of the network, rounded up.
    pub max_nodes_per_operation: Option<usize>,
    /// Ceiling for automatically attached query payments.
    pub max_query_payment: Amount,
    /// Overrides the per-kind default fee ceilings when set.
    pub max_transaction_fee: Option<Amount>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            attempt_timeout: Duration::from_secs(10),
            operation_deadline: Duration::from_secs(120),
            max_node_attempts: 3,
            node_busy_retries: 0,
            min_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            max_nodes_per_operation: None,
            max_query_payment: Amount::credits(1),
            max_transaction_fee: None,
        }
    }
}

// ============================================================================
// Executable
// ============================================================================

/// What the engine needs from an operation: how to address it, how to
/// build its per-node request, and how to read a node's answer.
pub(crate) trait Executable: Sync {
    type Response;

    /// The remote method for this operation's kind.
    fn method(&self) -> &'static str;

    /// The identifier attached to diagnostics.
    fn transaction_id(&self) -> Option<TransactionId>;

    /// Build (or reuse a cached) request for one node.
    async fn request_for(&self, node: &Node) -> Result<serde_json::Value, Error>;

    /// Extract the precheck code from a node's answer.
    fn status_of(&self, response: &serde_json::Value) -> Result<Status, Error>;

    /// Turn an accepted answer into the caller-facing response.
    /// `duplicate` is set when the network reported the identifier as
    /// already accepted.
    fn make_response(
        &self,
        response: serde_json::Value,
        node: AccountId,
        duplicate: bool,
    ) -> Result<Self::Response, Error>;
}

/// Shared references the engine borrows from the client for one run.
pub(crate) struct DispatchContext<'a> {
    pub network: &'a Network,
    pub transport: &'a dyn Transport,
    pub classifier: &'a Classifier,
    pub config: &'a DispatchConfig,
}

// ============================================================================
// The attempt loop
// ============================================================================

/// Run one operation to completion against `candidates`.
pub(crate) async fn execute<E: Executable>(
    ctx: &DispatchContext<'_>,
    candidates: &[AccountId],
    op: &E,
) -> Result<E::Response, Error> {
    let config = ctx.config;
    let deadline = Instant::now() + config.operation_deadline;
    let mut cursor = 0usize;
    let mut busy_retries = 0u32;
    let mut last_error: Option<Error> = None;

    for attempt in 0..config.max_attempts {
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Cancelled {
                deadline: config.operation_deadline,
            });
        }

        let node = ctx
            .network
            .choose(candidates, cursor, config.max_node_attempts)?;
        let params = op.request_for(&node).await?;

        debug!(
            method = op.method(),
            node = %node.account_id(),
            attempt,
            "sending request"
        );

        // The call is bounded by the per-attempt timeout and by
        // whatever is left of the overall deadline, whichever is
        // shorter.
        let remaining = deadline.saturating_duration_since(now);
        let cut_short = remaining < config.attempt_timeout;
        let call = ctx.transport.call(node.address(), op.method(), params);
        let result = match tokio::time::timeout(remaining.min(config.attempt_timeout), call).await
        {
            Ok(result) => result,
            Err(_) if cut_short => {
                return Err(Error::Cancelled {
                    deadline: config.operation_deadline,
                });
            }
            Err(_) => Err(TransportError::Timeout(config.attempt_timeout)),
        };

        match result {
            Ok(response) => {
                let status = op.status_of(&response)?;
                match ctx.classifier.outcome(status) {
                    Outcome::Accepted => {
                        node.mark_healthy();
                        return op.make_response(response, node.account_id(), false);
                    }
                    Outcome::Duplicate => {
                        // The identifier already reached consensus on an
                        // earlier, unacknowledged attempt. Equivalent to
                        // acceptance; never resubmitted under a new ID.
                        node.mark_healthy();
                        debug!(
                            node = %node.account_id(),
                            id = ?op.transaction_id(),
                            "identifier already accepted by the network"
                        );
                        return op.make_response(response, node.account_id(), true);
                    }
                    Outcome::Transient => {
                        debug!(
                            node = %node.account_id(),
                            %status,
                            "transient node error"
                        );
                        last_error = Some(Error::Precheck {
                            status,
                            transaction_id: op.transaction_id(),
                            node_account_id: node.account_id(),
                        });
                        if busy_retries < config.node_busy_retries {
                            // Stay on this node for a bounded number of
                            // busy answers before rotating.
                            busy_retries += 1;
                        } else {
                            node.mark_failed(config.min_backoff, config.max_backoff);
                            cursor += 1;
                            busy_retries = 0;
                        }
                    }
                    Outcome::Terminal => {
                        return Err(Error::Precheck {
                            status,
                            transaction_id: op.transaction_id(),
                            node_account_id: node.account_id(),
                        });
                    }
                }
            }
            Err(transport_err) => {
                if !transport_err.is_retryable() {
                    return Err(Error::Transport(transport_err));
                }
                warn!(
                    node = %node.account_id(),
                    error = %transport_err,
                    "transport failure, rotating node"
                );
                node.mark_failed(config.min_backoff, config.max_backoff);
                last_error = Some(Error::Transport(transport_err));
                cursor += 1;
                busy_retries = 0;
            }
        }

        // Inter-attempt backoff, unless this was the final attempt.
        // An elapsed deadline wins over finishing the sleep.
        if attempt + 1 < config.max_attempts {
            let delay = backoff_delay(config, attempt);
            if Instant::now() + delay >= deadline {
                return Err(Error::Cancelled {
                    deadline: config.operation_deadline,
                });
            }
            tokio::time::sleep(delay).await;
        }
    }

    Err(Error::Exhausted {
        attempts: config.max_attempts,
        last: Box::new(last_error.unwrap_or(Error::NoHealthyNodes)),
    })
}

/// Exponential backoff: `min_backoff * 2^attempt`, capped.
fn backoff_delay(config: &DispatchConfig, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.min(16);
    config.min_backoff.saturating_mul(factor).min(config.max_backoff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_defaults() {
        let classifier = Classifier::default();
        assert_eq!(classifier.outcome(Status::Ok), Outcome::Accepted);
        assert_eq!(
            classifier.outcome(Status::DuplicateTransaction),
            Outcome::Duplicate
        );
        assert_eq!(classifier.outcome(Status::Busy), Outcome::Transient);
        assert_eq!(
            classifier.outcome(Status::PlatformNotActive),
            Outcome::Transient
        );
        assert_eq!(
            classifier.outcome(Status::ReceiptNotFound),
            Outcome::Transient
        );
        assert_eq!(
            classifier.outcome(Status::InvalidSignature),
            Outcome::Terminal
        );
        assert_eq!(
            classifier.outcome(Status::InsufficientPayerBalance),
            Outcome::Terminal
        );
        assert_eq!(classifier.outcome(Status::Unrecognized), Outcome::Terminal);
    }

    #[test]
    fn test_classifier_custom_table() {
        // A network that never sheds load with BUSY but marks
        // congestion with a code this client calls unrecognized.
        let classifier = Classifier::new([Status::PlatformNotActive]);
        assert_eq!(classifier.outcome(Status::Busy), Outcome::Terminal);
        assert_eq!(
            classifier.outcome(Status::PlatformNotActive),
            Outcome::Transient
        );
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let config = DispatchConfig {
            min_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            ..Default::default()
        };

        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(250));
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(&config, 5), Duration::from_secs(8));
        // Far past the cap, including exponents that would overflow
        assert_eq!(backoff_delay(&config, 40), Duration::from_secs(8));
    }

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.attempt_timeout, Duration::from_secs(10));
        assert_eq!(config.operation_deadline, Duration::from_secs(120));
        assert_eq!(config.node_busy_retries, 0);
        assert_eq!(config.max_query_payment, Amount::credits(1));
        assert!(config.max_transaction_fee.is_none());
    }
}
