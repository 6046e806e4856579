use serde::Serialize;

use super::ChainParams;

/// Countdown to the next subsidy halving.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HalvingInfo {
    pub blocks_until_halving: u64,
    /// Estimated halving date, unix millis.
    pub time_until_halving: i64,
    pub next_halving_height: u64,
}

/// Project the next halving from the tip height at target pace.
///
/// Exactly at a halving height the countdown restarts at a full interval.
pub fn project_halving(height: u64, now_millis: i64, params: &ChainParams) -> HalvingInfo {
    let interval = params.halving_interval.max(1);
    let blocks_until_halving = interval - height % interval;
    let block_millis = i64::from(params.target_block_secs) * 1000;
    let ahead = i64::try_from(blocks_until_halving)
        .unwrap_or(i64::MAX)
        .saturating_mul(block_millis);

    HalvingInfo {
        blocks_until_halving,
        time_until_halving: now_millis.saturating_add(ahead),
        next_halving_height: height + blocks_until_halving,
    }
}
