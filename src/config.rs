use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{ChainParams, DEFAULT_BLOCK_CACHE_SIZE, TARGET_BLOCK_TIME_SECS};
use crate::node::NodeRpcConfig;

/// TTL of the difficulty metrics view.
pub const DEFAULT_METRICS_TTL_SECS: u64 = 30;

/// TTL of the retarget projection view.
pub const DEFAULT_RETARGET_TTL_SECS: u64 = 30;

pub const DEFAULT_NODE_TIMEOUT_MS: u64 = 3_000;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub node: NodeRpcConfig,
    pub params: ChainParams,
    pub metrics_ttl: Duration,
    pub retarget_ttl: Duration,
    pub block_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            node: NodeRpcConfig {
                url: None,
                user: None,
                password: None,
                timeout: Duration::from_millis(DEFAULT_NODE_TIMEOUT_MS),
            },
            params: ChainParams::default(),
            metrics_ttl: Duration::from_secs(DEFAULT_METRICS_TTL_SECS),
            retarget_ttl: Duration::from_secs(DEFAULT_RETARGET_TTL_SECS),
            block_cache_size: DEFAULT_BLOCK_CACHE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset, unparseable or zero values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let target: u32 = positive(&lookup, "TARGET_BLOCK_TIME_SECS", TARGET_BLOCK_TIME_SECS);
        Self {
            host: text("HOST").unwrap_or(d.host),
            port: positive(&lookup, "PORT", d.port),
            node: NodeRpcConfig {
                url: text("NODE_RPC_URL"),
                user: text("NODE_RPC_USER"),
                password: text("NODE_RPC_PASSWORD"),
                timeout: Duration::from_millis(positive(
                    &lookup,
                    "NODE_RPC_TIMEOUT_MS",
                    DEFAULT_NODE_TIMEOUT_MS,
                )),
            },
            params: d.params.with_target_block_secs(target),
            metrics_ttl: Duration::from_secs(positive(
                &lookup,
                "METRICS_CACHE_TTL_SECS",
                DEFAULT_METRICS_TTL_SECS,
            )),
            retarget_ttl: Duration::from_secs(positive(
                &lookup,
                "RETARGET_CACHE_TTL_SECS",
                DEFAULT_RETARGET_TTL_SECS,
            )),
            block_cache_size: positive(&lookup, "BLOCK_CACHE_SIZE", d.block_cache_size),
        }
    }
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + std::fmt::Display + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => v,
        _ => {
            warn!("CONFIG - invalid {key}={raw:?}, using {default}");
            default
        }
    }
}
