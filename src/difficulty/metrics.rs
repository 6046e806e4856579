use log::debug;
use serde::Serialize;

use super::AlgorithmTag;
use crate::blockchain::{Block, ChainParams};

/// How many of the most recent blocks of one algorithm feed the metrics.
pub const METRICS_WINDOW: usize = 12;

/// Bound on the slope signal in either direction.
pub const SLOPE_LIMIT: f64 = 0.1;

/// Recent difficulty and pacing of one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmMetrics {
    pub current_difficulty: f64,
    /// Percent change between the two most recent blocks.
    pub difficulty_change: f64,
    /// `timing_ratio - 1`, clamped to `[-SLOPE_LIMIT, SLOPE_LIMIT]`.
    pub slope: f64,
    pub timing_ratio: f64,
    pub avg_block_time: f64,
    pub algorithm: &'static str,
    /// Wall-clock unix seconds of the computation.
    pub last_update: i64,
    pub auxpow_active: bool,
}

impl AlgorithmMetrics {
    /// Values reported while fewer than two blocks are known.
    pub fn fallback(
        tag: AlgorithmTag,
        auxpow_active: bool,
        params: &ChainParams,
        now_secs: i64,
    ) -> Self {
        Self {
            current_difficulty: 0.0,
            difficulty_change: 0.0,
            slope: 0.0,
            timing_ratio: 1.0,
            avg_block_time: f64::from(params.target_block_secs),
            algorithm: tag.name(),
            last_update: now_secs,
            auxpow_active,
        }
    }
}

/// Compute metrics over the most recent `METRICS_WINDOW` blocks of one
/// algorithm. Input order does not matter; blocks are ranked by height.
pub fn compute_metrics(
    blocks: &[&Block],
    tag: AlgorithmTag,
    auxpow_active: bool,
    params: &ChainParams,
    now_secs: i64,
) -> AlgorithmMetrics {
    if blocks.len() < 2 {
        debug!(
            "{}: not enough blocks ({}), using fallback metrics",
            tag.name(),
            blocks.len()
        );
        return AlgorithmMetrics::fallback(tag, auxpow_active, params, now_secs);
    }

    let mut recent: Vec<&Block> = blocks.to_vec();
    recent.sort_by(|a, b| b.height.cmp(&a.height));
    recent.truncate(METRICS_WINDOW);

    let current = recent[0].difficulty;
    let previous = recent[1].difficulty;
    let difficulty_change = percent_change(current, previous);

    let target = f64::from(params.target_block_secs.max(1));
    let avg_block_time = average_interval(&recent).unwrap_or(target);
    let timing_ratio = avg_block_time / target;
    let slope = clamp_slope(timing_ratio - 1.0);

    AlgorithmMetrics {
        current_difficulty: if current.is_finite() { current } else { 0.0 },
        difficulty_change,
        slope,
        timing_ratio,
        avg_block_time,
        algorithm: tag.name(),
        last_update: now_secs,
        auxpow_active,
    }
}

/// `(current / previous - 1) * 100`; 0 when previous is not positive.
fn percent_change(current: f64, previous: f64) -> f64 {
    if previous <= 0.0 || previous.is_nan() {
        return 0.0;
    }
    let change = (current / previous - 1.0) * 100.0;
    if change.is_finite() { change } else { 0.0 }
}

/// Mean of the strictly positive gaps between neighbours of a
/// height-descending run. Non-positive gaps (clock skew) are skipped.
fn average_interval(descending: &[&Block]) -> Option<f64> {
    let deltas: Vec<i64> = descending
        .windows(2)
        .map(|w| w[0].timestamp.saturating_sub(w[1].timestamp))
        .filter(|d| *d > 0)
        .collect();
    if deltas.is_empty() {
        return None;
    }
    let total: f64 = deltas.iter().map(|d| *d as f64).sum();
    Some(total / deltas.len() as f64)
}

pub fn clamp_slope(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(-SLOPE_LIMIT, SLOPE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::{AlgorithmMetrics, METRICS_WINDOW, clamp_slope, compute_metrics};
    use crate::blockchain::{Block, ChainParams, MEOWPOW_VERSION};
    use crate::difficulty::AlgorithmTag;

    fn chain(n: u64, spacing: i64, difficulty: impl Fn(u64) -> f64) -> Vec<Block> {
        (0..n)
            .map(|i| {
                let h = 100 + i;
                Block::new(h, MEOWPOW_VERSION, difficulty(h), 1_700_000_000 + i as i64 * spacing)
            })
            .collect()
    }

    #[test]
    fn fallback_with_fewer_than_two_blocks() {
        let params = ChainParams::default().with_target_block_secs(120);
        let one = chain(1, 60, |_| 5.0);
        let refs: Vec<&Block> = one.iter().collect();

        for input in [&refs[..0], &refs[..]] {
            let m = compute_metrics(input, AlgorithmTag::Scrypt, false, &params, 42);
            assert_eq!(m.current_difficulty, 0.0);
            assert_eq!(m.difficulty_change, 0.0);
            assert_eq!(m.slope, 0.0);
            assert_eq!(m.timing_ratio, 1.0);
            assert_eq!(m.avg_block_time, 120.0);
            assert_eq!(m.algorithm, "Scrypt");
            assert_eq!(m.last_update, 42);
            assert!(!m.auxpow_active);
        }
    }

    #[test]
    fn fallback_average_follows_configured_target() {
        let m = AlgorithmMetrics::fallback(AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert_eq!(m.avg_block_time, 60.0);
    }

    #[test]
    fn doubling_difficulty_every_minute() {
        let blocks = chain(20, 60, |h| 2f64.powi((h - 100) as i32));
        let refs: Vec<&Block> = blocks.iter().collect();
        let params = ChainParams::default().with_target_block_secs(120);

        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &params, 0);
        let d119 = 2f64.powi(19);
        let d118 = 2f64.powi(18);
        assert_eq!(m.current_difficulty, d119);
        assert!((m.difficulty_change - (d119 / d118 - 1.0) * 100.0).abs() < 1e-9);
        assert!((m.avg_block_time - 60.0).abs() < 1e-9);
        assert!((m.timing_ratio - 0.5).abs() < 1e-9);
        assert_eq!(m.slope, -0.1);
        assert!(m.auxpow_active);
    }

    #[test]
    fn on_target_pace_gives_flat_slope() {
        let blocks = chain(20, 60, |_| 10.0);
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert_eq!(m.difficulty_change, 0.0);
        assert!((m.timing_ratio - 1.0).abs() < 1e-9);
        assert!(m.slope.abs() < 1e-9);
    }

    #[test]
    fn unsorted_input_uses_highest_blocks() {
        let mut blocks = chain(30, 60, |h| h as f64);
        blocks.reverse();
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert_eq!(m.current_difficulty, 129.0);
        assert!((m.difficulty_change - (129.0 / 128.0 - 1.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn only_window_blocks_count_toward_average() {
        // Old blocks far apart, the last METRICS_WINDOW exactly 30s apart.
        let mut blocks = Vec::new();
        for i in 0..10u64 {
            blocks.push(Block::new(i, MEOWPOW_VERSION, 1.0, i as i64 * 1_000));
        }
        let base = 100_000;
        for i in 0..METRICS_WINDOW as u64 {
            blocks.push(Block::new(10 + i, MEOWPOW_VERSION, 1.0, base + i as i64 * 30));
        }
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert!((m.avg_block_time - 30.0).abs() < 1e-9);
    }

    #[test]
    fn skewed_timestamps_are_ignored() {
        let blocks = vec![
            Block::new(1, MEOWPOW_VERSION, 1.0, 1_000),
            Block::new(2, MEOWPOW_VERSION, 1.0, 1_090),
            Block::new(3, MEOWPOW_VERSION, 1.0, 1_050), // earlier than parent
            Block::new(4, MEOWPOW_VERSION, 1.0, 1_080),
        ];
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        // positive gaps: 90 and 30
        assert!((m.avg_block_time - 60.0).abs() < 1e-9);
    }

    #[test]
    fn identical_timestamps_fall_back_to_target() {
        let blocks = chain(5, 0, |_| 3.0);
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert_eq!(m.avg_block_time, 60.0);
        assert_eq!(m.timing_ratio, 1.0);
    }

    #[test]
    fn zero_previous_difficulty_means_no_change() {
        let blocks = vec![
            Block::new(1, MEOWPOW_VERSION, 0.0, 0),
            Block::new(2, MEOWPOW_VERSION, 50.0, 60),
        ];
        let refs: Vec<&Block> = blocks.iter().collect();
        let m = compute_metrics(&refs, AlgorithmTag::MeowPow, true, &ChainParams::default(), 0);
        assert_eq!(m.difficulty_change, 0.0);
        assert_eq!(m.current_difficulty, 50.0);
    }

    #[test]
    fn slope_is_always_bounded() {
        for raw in [-1e308, -5.0, -0.1, -0.05, 0.0, 0.07, 0.1, 3.0, 1e308] {
            let s = clamp_slope(raw);
            assert!((-0.1..=0.1).contains(&s), "slope {s} for {raw}");
        }
        assert_eq!(clamp_slope(f64::NAN), 0.0);
    }
}
