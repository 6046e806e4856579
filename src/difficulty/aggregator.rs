use log::debug;

use super::{
    AlgorithmMetrics, AlgorithmTag, DualAlgorithm, RetargetInputs, RetargetProjection, classify,
    compute_metrics, project_retarget,
};
use crate::blockchain::{Block, ChainParams, ChainState};

/// Whether an algorithm is being mined. MeowPow never stops; Scrypt counts
/// as active only with a positive observed hashrate. An unavailable reading
/// means inactive.
pub fn auxpow_active(tag: AlgorithmTag, scrypt_hashrate: Option<f64>) -> bool {
    !tag.is_auxpow() || scrypt_hashrate.is_some_and(|h| h > 0.0)
}

/// Per-algorithm difficulty metrics over the recent block window.
pub fn metrics_snapshot(
    blocks: &[Block],
    scrypt_hashrate: Option<f64>,
    params: &ChainParams,
    now_secs: i64,
) -> DualAlgorithm<AlgorithmMetrics> {
    if log::log_enabled!(log::Level::Debug) && !blocks.is_empty() {
        let recent: Vec<String> = blocks
            .iter()
            .rev()
            .take(5)
            .map(|b| format!("{}:{:x}", b.height, b.version))
            .collect();
        debug!("Recent block versions: [{}]", recent.join(", "));
    }

    let classified = classify(blocks);
    debug!(
        "Found {} MeowPow blocks, {} Scrypt blocks out of {} total blocks",
        classified.meowpow.len(),
        classified.scrypt.len(),
        blocks.len()
    );

    DualAlgorithm::from_fn(|tag| {
        compute_metrics(
            classified.get(tag),
            tag,
            auxpow_active(tag, scrypt_hashrate),
            params,
            now_secs,
        )
    })
}

/// Per-algorithm projection of the running epoch.
pub fn retarget_snapshot(
    blocks: &[Block],
    chain: &ChainState,
    scrypt_hashrate: Option<f64>,
    params: &ChainParams,
    now_secs: i64,
) -> DualAlgorithm<RetargetProjection> {
    let classified = classify(blocks);
    let inputs = RetargetInputs {
        current_height: chain.current_height,
        now_secs,
        epoch_start_time: chain.last_adjustment_time,
        previous_retarget: chain.previous_retarget,
        latest_block_timestamp: blocks.last().map(|b| b.timestamp),
    };
    debug!(
        "Projecting retarget at height {} ({} MeowPow / {} Scrypt blocks observed)",
        chain.current_height,
        classified.meowpow.len(),
        classified.scrypt.len()
    );

    DualAlgorithm::from_fn(|tag| {
        project_retarget(tag, &inputs, auxpow_active(tag, scrypt_hashrate), params)
    })
}

#[cfg(test)]
mod tests {
    use super::{auxpow_active, metrics_snapshot, retarget_snapshot};
    use crate::blockchain::{
        Block, BlockStore, ChainParams, ChainState, MEOWPOW_VERSION, SCRYPT_VERSION,
    };
    use crate::difficulty::AlgorithmTag;

    #[test]
    fn empty_chain_gives_defaults_for_both() {
        let params = ChainParams::default().with_target_block_secs(120);
        let snap = metrics_snapshot(&[], None, &params, 99);

        for (m, name) in [(&snap.meowpow, "MeowPow"), (&snap.scrypt, "Scrypt")] {
            assert_eq!(m.algorithm, name);
            assert_eq!(m.current_difficulty, 0.0);
            assert_eq!(m.difficulty_change, 0.0);
            assert_eq!(m.slope, 0.0);
            assert_eq!(m.timing_ratio, 1.0);
            assert_eq!(m.avg_block_time, 120.0);
            assert_eq!(m.last_update, 99);
        }
        assert!(snap.meowpow.auxpow_active);
        assert!(!snap.scrypt.auxpow_active);
    }

    #[test]
    fn scrypt_without_blocks_or_hashrate_is_inactive() {
        let blocks: Vec<Block> = (0..10)
            .map(|i| Block::new(100 + i, MEOWPOW_VERSION, 10.0, 1_000 + i as i64 * 60))
            .collect();
        let snap = metrics_snapshot(&blocks, Some(0.0), &ChainParams::default(), 0);
        assert!(snap.meowpow.auxpow_active);
        assert!(!snap.scrypt.auxpow_active);
        assert_eq!(snap.meowpow.current_difficulty, 10.0);
        assert_eq!(snap.scrypt.current_difficulty, 0.0);
    }

    #[test]
    fn interleaved_chain_is_measured_per_algorithm() {
        // MeowPow every 2 minutes, Scrypt in between, so each algorithm
        // sees 120s spacing on its own.
        let blocks: Vec<Block> = (0..24u64)
            .map(|i| {
                let (version, difficulty) = if i % 2 == 0 {
                    (MEOWPOW_VERSION, 1_000.0 + i as f64)
                } else {
                    (SCRYPT_VERSION, 5.0)
                };
                Block::new(200 + i, version, difficulty, 10_000 + i as i64 * 60)
            })
            .collect();
        let snap = metrics_snapshot(&blocks, Some(1.5e9), &ChainParams::default(), 0);

        assert_eq!(snap.meowpow.current_difficulty, 1_022.0);
        assert!((snap.meowpow.avg_block_time - 120.0).abs() < 1e-9);
        assert!((snap.scrypt.avg_block_time - 120.0).abs() < 1e-9);
        assert_eq!(snap.scrypt.slope, 0.1);
        assert!(snap.scrypt.auxpow_active);
    }

    #[test]
    fn hashrate_readings() {
        assert!(auxpow_active(AlgorithmTag::MeowPow, None));
        assert!(!auxpow_active(AlgorithmTag::Scrypt, None));
        assert!(!auxpow_active(AlgorithmTag::Scrypt, Some(0.0)));
        assert!(!auxpow_active(AlgorithmTag::Scrypt, Some(-3.0)));
        assert!(!auxpow_active(AlgorithmTag::Scrypt, Some(f64::NAN)));
        assert!(auxpow_active(AlgorithmTag::Scrypt, Some(0.001)));
    }

    #[test]
    fn retarget_snapshot_has_both_entries() {
        let blocks = vec![Block::new(4100, SCRYPT_VERSION, 1.0, 5_000)];
        let chain = ChainState {
            current_height: 4100,
            last_adjustment_time: Some(0),
            previous_retarget: -3.0,
        };
        let snap = retarget_snapshot(&blocks, &chain, None, &ChainParams::default(), 6_000);
        assert_eq!(snap.meowpow.algorithm, "MeowPow");
        assert_eq!(snap.scrypt.algorithm, "Scrypt");
        assert_eq!(snap.meowpow.remaining_blocks, snap.scrypt.remaining_blocks);
        assert_eq!(snap.meowpow.previous_retarget, -3.0);
        assert!(snap.meowpow.auxpow_active);
        assert!(!snap.scrypt.auxpow_active);
    }

    #[test]
    fn mid_epoch_start_without_anchor_is_zeroed() {
        let params = ChainParams::default();
        let mut store = BlockStore::new(16);
        for h in [4132, 4133] {
            store
                .ingest(Block::new(h, MEOWPOW_VERSION, 1.0, 1_699_999_000 + h as i64), &params)
                .unwrap();
        }
        let snap = retarget_snapshot(
            store.blocks(),
            &store.chain_state(),
            Some(1.0),
            &params,
            1_700_000_000,
        );
        for p in [&snap.meowpow, &snap.scrypt] {
            assert_eq!(p.time_avg, 0);
            assert_eq!(p.expected_blocks, 0.0);
            assert_eq!(p.difficulty_change, 0.0);
            assert_eq!(p.remaining_time, 0);
        }
    }

    #[test]
    fn retarget_snapshot_without_blocks_is_zeroed() {
        let snap = retarget_snapshot(
            &[],
            &ChainState::default(),
            Some(10.0),
            &ChainParams::default(),
            6_000,
        );
        assert_eq!(snap.meowpow.next_retarget_height, 0);
        assert_eq!(snap.scrypt.estimated_retarget_date, 0);
        assert!(snap.scrypt.auxpow_active);
    }
}
