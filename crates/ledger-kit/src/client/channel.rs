//! Channel pool: per-node connection handles and the remote call
//! surface.
//!
//! The [`Transport`] trait is the seam between the dispatch engine and
//! the wire. The production implementation, [`ChannelPool`], speaks
//! JSON-RPC 2.0 over HTTP and keeps one lazily created channel per node
//! address, reused across operations — dispatch never opens a fresh
//! connection per attempt. Alternative transports (or test doubles) can
//! be injected via `LedgerBuilder::transport`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TransportError, is_retryable_status};

/// A pluggable remote-call surface: one request/response exchange with
/// the node at `address`.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Invoke `method` on the node at `address` with the given params,
    /// returning the JSON-RPC result value.
    fn call<'a>(
        &'a self,
        address: &'a str,
        method: &'a str,
        params: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, TransportError>>;
}

// ============================================================================
// JSON-RPC envelope
// ============================================================================

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// ============================================================================
// ChannelPool
// ============================================================================

/// A reusable connection handle to one node.
struct Channel {
    url: String,
    http: reqwest::Client,
}

impl Channel {
    async fn call(
        &self,
        request_id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: request_id,
            method,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
                body,
            });
        }

        let envelope: JsonRpcResponse = serde_json::from_str(&body)?;

        if let Some(error) = envelope.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| TransportError::InvalidResponse("Missing result in response".to_string()))
    }
}

/// The production [`Transport`]: cached JSON-RPC channels over a shared
/// HTTP client.
pub struct ChannelPool {
    http: reqwest::Client,
    channels: Mutex<HashMap<String, Arc<Channel>>>,
    request_id: AtomicU64,
}

impl ChannelPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            channels: Mutex::new(HashMap::new()),
            request_id: AtomicU64::new(0),
        }
    }

    /// Get or lazily create the channel for a node address.
    fn channel(&self, address: &str) -> Arc<Channel> {
        let mut channels = self.channels.lock().unwrap();
        if let Some(channel) = channels.get(address) {
            return channel.clone();
        }
        debug!(address, "opening channel");
        let channel = Arc::new(Channel {
            url: address.to_string(),
            // Clones share the underlying connection pool
            http: self.http.clone(),
        });
        channels.insert(address.to_string(), channel.clone());
        channel
    }

    /// Number of channels currently cached. Exposed for tests.
    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.lock().unwrap().len()
    }
}

impl Default for ChannelPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChannelPool {
    fn call<'a>(
        &'a self,
        address: &'a str,
        method: &'a str,
        params: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, TransportError>> {
        let channel = self.channel(address);
        let request_id = self.request_id.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move { channel.call(request_id, method, params).await })
    }
}

impl std::fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPool")
            .field("channels", &self.channels.lock().unwrap().len())
            .finish()
    }
}
