//! Projection of the running difficulty epoch towards its retarget.
//!
//! Both algorithms currently share the chain-wide epoch, so the projection
//! differs between them only in name and auxpow status.

use serde::Serialize;

use super::AlgorithmTag;
use crate::blockchain::ChainParams;

/// Largest adjustment the protocol applies at a retarget (x4).
pub const MAX_RETARGET_INCREASE_PCT: f64 = 300.0;

/// Smallest adjustment the protocol applies at a retarget (/4).
pub const MAX_RETARGET_DECREASE_PCT: f64 = -75.0;

/// Epoch-level inputs, gathered from the chain-state tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetargetInputs {
    pub current_height: i64,
    pub now_secs: i64,
    /// Timestamp of the block that opened the epoch, `None` while unknown.
    pub epoch_start_time: Option<i64>,
    pub previous_retarget: f64,
    /// `None` when no block has been observed yet.
    pub latest_block_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetargetProjection {
    pub progress_percent: f64,
    pub difficulty_change: f64,
    /// Unix millis.
    pub estimated_retarget_date: i64,
    pub remaining_blocks: u64,
    /// Millis.
    pub remaining_time: i64,
    pub previous_retarget: f64,
    /// Reserved, always 0.
    pub previous_time: i64,
    pub next_retarget_height: u64,
    /// Average block interval so far this epoch, millis.
    pub time_avg: i64,
    /// Reserved, always 0.
    pub time_offset: i64,
    pub expected_blocks: f64,
    pub algorithm: &'static str,
    pub auxpow_active: bool,
}

impl RetargetProjection {
    fn empty(tag: AlgorithmTag, auxpow_active: bool) -> Self {
        Self {
            progress_percent: 0.0,
            difficulty_change: 0.0,
            estimated_retarget_date: 0,
            remaining_blocks: 0,
            remaining_time: 0,
            previous_retarget: 0.0,
            previous_time: 0,
            next_retarget_height: 0,
            time_avg: 0,
            time_offset: 0,
            expected_blocks: 0.0,
            algorithm: tag.name(),
            auxpow_active,
        }
    }
}

pub fn project_retarget(
    tag: AlgorithmTag,
    inputs: &RetargetInputs,
    auxpow_active: bool,
    params: &ChainParams,
) -> RetargetProjection {
    let (Some(latest_timestamp), Some(epoch_start_time)) =
        (inputs.latest_block_timestamp, inputs.epoch_start_time)
    else {
        return RetargetProjection::empty(tag, auxpow_active);
    };

    let epoch_length = params.epoch_length.max(1);
    let target = f64::from(params.target_block_secs.max(1));
    let now = inputs.now_secs;

    let height = u64::try_from(inputs.current_height).ok();
    let blocks_in_epoch = height.map_or(0, |h| h % epoch_length);
    let remaining_blocks = epoch_length - blocks_in_epoch;
    let next_retarget_height = height.map_or(0, |h| h + remaining_blocks);
    let progress_percent = blocks_in_epoch as f64 / epoch_length as f64 * 100.0;

    let elapsed_secs = now.saturating_sub(epoch_start_time).max(0) as f64;
    let expected_blocks = elapsed_secs / target;

    // At the closing block the tip's own time marks the epoch end.
    let end = if blocks_in_epoch == epoch_length - 1 {
        latest_timestamp
    } else {
        now
    };
    let actual_timespan = end.saturating_sub(epoch_start_time) as f64;
    let observed_interval = actual_timespan / (blocks_in_epoch + 1) as f64;
    let difficulty_change = clamp_retarget((target / observed_interval - 1.0) * 100.0);

    let time_avg_secs = if blocks_in_epoch > 0 {
        elapsed_secs / blocks_in_epoch as f64
    } else {
        target
    };
    let time_avg = (time_avg_secs * 1000.0).floor() as i64;
    let remaining_time = (remaining_blocks as i64).saturating_mul(time_avg);
    let estimated_retarget_date = remaining_time.saturating_add(now.saturating_mul(1000));

    RetargetProjection {
        progress_percent,
        difficulty_change,
        estimated_retarget_date,
        remaining_blocks,
        remaining_time,
        previous_retarget: inputs.previous_retarget,
        previous_time: 0,
        next_retarget_height,
        time_avg,
        time_offset: 0,
        expected_blocks,
        algorithm: tag.name(),
        auxpow_active,
    }
}

/// Bound a projected change to what one retarget can apply.
/// An instant epoch (zero timespan) projects the maximum increase.
pub fn clamp_retarget(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(MAX_RETARGET_DECREASE_PCT, MAX_RETARGET_INCREASE_PCT)
}
