//! JSON-RPC client for the full node.
//!
//! Every reading here is best-effort: the difficulty views fall back to
//! zero whenever the node cannot answer.

use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

use crate::difficulty::AlgorithmTag;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("node RPC is not configured")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// The `getblockheader` fields the explorer reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub version: u32,
    /// Unix seconds.
    pub time: i64,
    pub difficulty: f64,
}

#[derive(Debug, Clone)]
pub struct NodeRpcConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

pub struct NodeClient {
    config: NodeRpcConfig,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(config: NodeRpcConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http }
    }

    /// Client that answers every call with `NodeError::NotConfigured`.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(NodeRpcConfig {
            url: None,
            user: None,
            password: None,
            timeout: Duration::from_secs(1),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.url.is_some()
    }

    /// Estimated network hashes per second of one algorithm over the
    /// default lookup window.
    pub async fn network_hash_ps(&self, algo: AlgorithmTag) -> Result<f64, NodeError> {
        self.call_f64("getnetworkhashps", json!([0, -1, algo.rpc_id()]))
            .await
    }

    pub async fn difficulty(&self, algo: AlgorithmTag) -> Result<f64, NodeError> {
        self.call_f64("getdifficulty", json!([algo.rpc_id()])).await
    }

    pub async fn block_hash(&self, height: u64) -> Result<String, NodeError> {
        let value = self.call("getblockhash", json!([height])).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NodeError::BadResponse(format!("getblockhash: expected string, got {value}")))
    }

    pub async fn block_header(&self, hash: &str) -> Result<BlockHeader, NodeError> {
        let value = self.call("getblockheader", json!([hash, true])).await?;
        serde_json::from_value(value)
            .map_err(|e| NodeError::BadResponse(format!("getblockheader: {e}")))
    }

    /// Header of the block at `height`, looked up by hash.
    pub async fn header_at(&self, height: u64) -> Result<BlockHeader, NodeError> {
        let hash = self.block_hash(height).await?;
        self.block_header(&hash).await
    }

    /// `network_hash_ps`, with failures logged and reported as `None`.
    pub async fn network_hash_ps_or_none(&self, algo: AlgorithmTag) -> Option<f64> {
        match self.network_hash_ps(algo).await {
            Ok(h) => Some(h),
            Err(e) => {
                debug!("NODE - {} hashrate unavailable: {}", algo.name(), e);
                None
            }
        }
    }

    async fn call_f64(&self, method: &str, params: Value) -> Result<f64, NodeError> {
        let value = self.call(method, params).await?;
        value
            .as_f64()
            .ok_or_else(|| NodeError::BadResponse(format!("{method}: expected number, got {value}")))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, NodeError> {
        let url = self.config.url.as_deref().ok_or(NodeError::NotConfigured)?;
        let body = json!({
            "jsonrpc": "1.0",
            "id": "explorer",
            "method": method,
            "params": params,
        });

        let mut req = self.http.post(url).json(&body);
        if let Some(user) = &self.config.user {
            req = req.basic_auth(user, self.config.password.as_deref());
        }

        // bitcoind-style nodes answer RPC errors with HTTP 500 and a JSON body
        let resp: RpcResponse = req.send().await?.json().await?;
        if let Some(err) = resp.error {
            return Err(NodeError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        resp.result
            .ok_or_else(|| NodeError::BadResponse(format!("{method}: missing result")))
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockHeader, NodeClient, NodeError};
    use crate::difficulty::AlgorithmTag;

    #[actix_web::test]
    async fn unconfigured_client_fails_softly() {
        let node = NodeClient::disabled();
        assert!(!node.is_configured());
        assert!(matches!(
            node.network_hash_ps(AlgorithmTag::Scrypt).await,
            Err(NodeError::NotConfigured)
        ));
        assert!(matches!(
            node.difficulty(AlgorithmTag::MeowPow).await,
            Err(NodeError::NotConfigured)
        ));
        assert_eq!(node.network_hash_ps_or_none(AlgorithmTag::Scrypt).await, None);
        assert!(matches!(node.header_at(4032).await, Err(NodeError::NotConfigured)));
    }

    #[test]
    fn header_keeps_known_fields() {
        let header: BlockHeader = serde_json::from_value(serde_json::json!({
            "hash": "00ab",
            "confirmations": 12,
            "height": 4032,
            "version": 805896192,
            "time": 1_700_000_000,
            "difficulty": 1234.5,
            "previousblockhash": "00aa",
        }))
        .unwrap();
        assert_eq!(header.height, 4032);
        assert_eq!(header.version, 0x3009_0000);
        assert_eq!(header.time, 1_700_000_000);
    }

    #[test]
    fn rpc_error_message() {
        let e = NodeError::Rpc {
            code: -28,
            message: "Loading block index...".into(),
        };
        assert_eq!(e.to_string(), "RPC error -28: Loading block index...");
    }
}
