//! Node registry: network membership and per-node health.
//!
//! A [`Network`] maps node account IDs to addresses and tracks each
//! node's health. Selection is round-robin with skip-if-backing-off;
//! when every candidate is backing off, the one whose backoff expires
//! soonest is used so selection never deadlocks on a non-empty set.
//!
//! Health state is process-wide and in-memory only; it is rebuilt from
//! the static network configuration at startup. Membership never
//! changes in place — reconfiguring the network replaces the whole
//! registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Error;
use crate::types::AccountId;

/// Per-node health state.
struct Health {
    /// The node is unusable until this instant. `None` means healthy.
    backoff_until: Option<Instant>,
    /// Interval applied on the next failure. Doubles per consecutive
    /// failure, capped, reset on success.
    backoff: Option<Duration>,
    /// Consecutive failures since the last success.
    failures: u32,
}

/// One known node: account ID, address, and mutable health.
pub struct Node {
    account_id: AccountId,
    address: String,
    health: Mutex<Health>,
}

impl Node {
    fn new(account_id: AccountId, address: String) -> Self {
        Self {
            account_id,
            address,
            health: Mutex::new(Health {
                backoff_until: None,
                backoff: None,
                failures: 0,
            }),
        }
    }

    /// The node's account ID.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// The node's network address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the node is currently usable.
    pub fn is_healthy(&self) -> bool {
        self.healthy_at(Instant::now())
    }

    fn healthy_at(&self, now: Instant) -> bool {
        let health = self.health.lock().unwrap();
        health.backoff_until.is_none_or(|until| until <= now)
    }

    /// When the node becomes usable again, if it is backing off.
    fn readmit_at(&self) -> Option<Instant> {
        self.health.lock().unwrap().backoff_until
    }

    fn failures(&self) -> u32 {
        self.health.lock().unwrap().failures
    }

    /// Record a transient failure: start (or double) the backoff
    /// interval, capped at `max_backoff`.
    pub(crate) fn mark_failed(&self, min_backoff: Duration, max_backoff: Duration) {
        let mut health = self.health.lock().unwrap();
        let interval = health.backoff.unwrap_or(min_backoff);
        health.backoff_until = Some(Instant::now() + interval);
        health.backoff = Some((interval * 2).min(max_backoff));
        health.failures += 1;
        debug!(
            node = %self.account_id,
            failures = health.failures,
            backoff = ?interval,
            "node backing off"
        );
    }

    /// Record a success: clear the backoff immediately and reset the
    /// interval to its seed.
    pub(crate) fn mark_healthy(&self) {
        let mut health = self.health.lock().unwrap();
        health.backoff_until = None;
        health.backoff = None;
        health.failures = 0;
    }

    /// The interval the next failure would apply. Exposed for tests.
    #[cfg(test)]
    fn next_backoff(&self, min_backoff: Duration) -> Duration {
        self.health.lock().unwrap().backoff.unwrap_or(min_backoff)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("account_id", &self.account_id)
            .field("address", &self.address)
            .field("healthy", &self.is_healthy())
            .finish()
    }
}

// ============================================================================
// Network
// ============================================================================

/// The set of known nodes for one network.
pub struct Network {
    nodes: HashMap<AccountId, Arc<Node>>,
    /// Node IDs in ascending account order; round-robin iterates this.
    order: Vec<AccountId>,
}

impl Network {
    /// The public mainnet node set.
    pub fn mainnet() -> Self {
        Self::from_static(&[
            (3, "https://n0.mainnet.gridledger.io"),
            (4, "https://n1.mainnet.gridledger.io"),
            (5, "https://n2.mainnet.gridledger.io"),
            (6, "https://n3.mainnet.gridledger.io"),
            (7, "https://n4.mainnet.gridledger.io"),
            (8, "https://n5.mainnet.gridledger.io"),
        ])
    }

    /// The public testnet node set.
    pub fn testnet() -> Self {
        Self::from_static(&[
            (3, "https://n0.testnet.gridledger.io"),
            (4, "https://n1.testnet.gridledger.io"),
            (5, "https://n2.testnet.gridledger.io"),
            (6, "https://n3.testnet.gridledger.io"),
        ])
    }

    fn from_static(entries: &[(u64, &str)]) -> Self {
        Self::from_nodes(
            entries
                .iter()
                .map(|(num, url)| (AccountId::new(0, *num), url.to_string())),
        )
        .expect("static network definitions are non-empty")
    }

    /// Build a network from an explicit node map.
    pub fn from_nodes(
        entries: impl IntoIterator<Item = (AccountId, String)>,
    ) -> Result<Self, Error> {
        let mut nodes = HashMap::new();
        for (account_id, address) in entries {
            nodes.insert(account_id, Arc::new(Node::new(account_id, address)));
        }
        if nodes.is_empty() {
            return Err(Error::Config("network has no nodes".to_string()));
        }

        let mut order: Vec<AccountId> = nodes.keys().copied().collect();
        order.sort_unstable();

        Ok(Self { nodes, order })
    }

    /// All node account IDs, in selection order.
    pub fn node_ids(&self) -> &[AccountId] {
        &self.order
    }

    /// Look up a node by account ID.
    pub fn node(&self, account_id: AccountId) -> Option<Arc<Node>> {
        self.nodes.get(&account_id).cloned()
    }

    /// Check that every listed account names a known node.
    pub(crate) fn validate_node_ids(&self, ids: &[AccountId]) -> Result<(), Error> {
        for id in ids {
            if !self.nodes.contains_key(id) {
                return Err(Error::UnknownNodeAccount(*id));
            }
        }
        Ok(())
    }

    /// The node set a freshly frozen operation will target: the first
    /// `max` nodes of the network, or all of them.
    pub(crate) fn resolve_node_ids(&self, max: Option<usize>) -> Vec<AccountId> {
        match max {
            Some(max) if max < self.order.len() => self.order[..max.max(1)].to_vec(),
            _ => self.order.clone(),
        }
    }

    /// Select the node for one attempt.
    ///
    /// Round-robin starting at `cursor` over `candidates`, skipping
    /// nodes that are backing off. If every candidate is backing off,
    /// falls back to the one whose backoff expires soonest among those
    /// that still have attempt budget; with no budget anywhere, signals
    /// exhaustion.
    pub(crate) fn choose(
        &self,
        candidates: &[AccountId],
        cursor: usize,
        node_budget: u32,
    ) -> Result<Arc<Node>, Error> {
        if candidates.is_empty() {
            return Err(Error::NoHealthyNodes);
        }

        let now = Instant::now();
        for i in 0..candidates.len() {
            let id = candidates[(cursor + i) % candidates.len()];
            let node = self.nodes.get(&id).ok_or(Error::UnknownNodeAccount(id))?;
            if node.healthy_at(now) {
                return Ok(node.clone());
            }
        }

        // Everyone is backing off: readmit the least-recently-failed
        // node early rather than deadlock, unless its budget is spent.
        candidates
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.failures() < node_budget)
            .min_by_key(|node| node.readmit_at())
            .cloned()
            .ok_or(Error::NoHealthyNodes)
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.order)
            .finish()
    }
}
