use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::blockchain::{Block, BlockStore, ChainParams};
use crate::config::Config;
use crate::difficulty::{
    AlgorithmMetrics, Clock, DualAlgorithm, FreshnessCache, RetargetProjection,
};
use crate::node::NodeClient;

/// Shared application state: the recent block window, the node client and
/// the caches in front of the difficulty views.
pub struct AppState {
    pub params: ChainParams,
    pub store: Mutex<BlockStore>,
    pub node: NodeClient,
    pub clock: Arc<dyn Clock>,
    pub metrics_cache: FreshnessCache<DualAlgorithm<AlgorithmMetrics>>,
    pub retarget_cache: FreshnessCache<DualAlgorithm<RetargetProjection>>,
}

impl AppState {
    pub fn new(config: &Config, node: NodeClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            params: config.params,
            store: Mutex::new(BlockStore::new(config.block_cache_size)),
            node,
            metrics_cache: FreshnessCache::new("metrics", config.metrics_ttl, clock.clone()),
            retarget_cache: FreshnessCache::new("retarget", config.retarget_ttl, clock.clone()),
            clock,
        }
    }

    /// New-block hook: both difficulty views recompute on next request.
    pub fn invalidate_caches(&self) {
        self.metrics_cache.invalidate();
        self.retarget_cache.invalidate();
    }
}

/* ---------- Mining API Models ---------- */

#[derive(Serialize)]
pub struct PowStats {
    pub difficulty: f64,
    pub hashrate: f64,
    pub algorithm: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxPowStats {
    pub difficulty: f64,
    pub hashrate: f64,
    pub algorithm: &'static str,
    pub auxpow_active: bool,
}

#[derive(Serialize)]
pub struct DualPowStatsResponse {
    pub meowpow: PowStats,
    pub scrypt: AuxPowStats,
}

/* ---------- Block API Models ---------- */

#[derive(Serialize)]
pub struct BlocksResponse<'a> {
    pub height: i64,
    pub blocks: &'a [Block],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub height: u64,
    pub reorged: usize,
    pub epoch_boundary: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub height: i64,
    pub stored_blocks: usize,
    pub last_adjustment_time: Option<i64>,
    pub previous_retarget: f64,
    pub target_block_time_secs: u32,
    pub epoch_length: u64,
    pub last_interval_secs: Option<i64>,
    pub metrics_computed_at: Option<i64>,
    pub retarget_computed_at: Option<i64>,
    pub node_configured: bool,
}
