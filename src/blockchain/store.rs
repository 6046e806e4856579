use log::{debug, info, warn};
use serde::Serialize;

use super::{Block, ChainParams};

/// Epoch anchors remembered for reorg rollback.
const ANCHORS_KEPT: usize = 4;

/// Chain-level facts the retarget projection is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    /// Tip height, -1 before the first block arrives.
    pub current_height: i64,
    /// Timestamp of the block that opened the current epoch, `None` until
    /// that block was seen or looked up on the node.
    pub last_adjustment_time: Option<i64>,
    /// Difficulty change (%) applied at the last retarget.
    pub previous_retarget: f64,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            current_height: -1,
            last_adjustment_time: None,
            previous_retarget: 0.0,
        }
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ingested {
    pub height: u64,
    /// Blocks dropped because the new block replaced their height.
    pub reorged: usize,
    pub epoch_boundary: bool,
}

/// First block of an epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EpochAnchor {
    height: u64,
    timestamp: i64,
    previous_retarget: f64,
}

/// Bounded in-memory window of recent blocks (most recent last) plus the
/// chain-state tracker fed by it.
#[derive(Debug)]
pub struct BlockStore {
    blocks: Vec<Block>,
    capacity: usize,
    anchors: Vec<EpochAnchor>,
    state: ChainState,
}

impl BlockStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            anchors: Vec::new(),
            state: ChainState::default(),
        }
    }

    /// Append a block reported by the node.
    ///
    /// A block at a height already held replaces that block and everything
    /// above it, together with any epoch anchor set by the dropped blocks.
    /// Gaps are accepted; blocks below the retained window are not.
    pub fn ingest(&mut self, block: Block, params: &ChainParams) -> Result<Ingested, &'static str> {
        block.validate()?;

        let mut reorged = 0;
        let held = self.blocks.first().zip(self.blocks.last());
        if let Some((first, last)) = held.map(|(f, l)| (f.height, l.height)) {
            if block.height < first {
                return Err("block is older than the retained window");
            }
            if block.height <= last {
                let keep = self.blocks.partition_point(|b| b.height < block.height);
                reorged = self.blocks.len() - keep;
                self.blocks.truncate(keep);
                self.anchors.retain(|a| a.height < block.height);
                warn!(
                    "STORE - reorg at height {}: dropped {} block(s)",
                    block.height, reorged
                );
            } else if block.height > last + 1 {
                debug!("STORE - gap between {} and {}", last, block.height);
            }
        }

        let epoch_boundary = block.height % params.epoch_length.max(1) == 0;
        if epoch_boundary {
            let previous_retarget = self
                .blocks
                .iter()
                .rev()
                .find(|b| b.version == block.version)
                .map_or(0.0, |prev| retarget_percent(prev.difficulty, block.difficulty));
            self.push_anchor(EpochAnchor {
                height: block.height,
                timestamp: block.timestamp,
                previous_retarget,
            });
            info!(
                "STORE - retarget at height {} ({:+.2}%)",
                block.height, previous_retarget
            );
        }

        let height = block.height;
        self.state.current_height = i64::try_from(height).unwrap_or(i64::MAX);
        self.blocks.push(block);

        if self.blocks.len() > self.capacity {
            let excess = self.blocks.len() - self.capacity;
            self.blocks.drain(..excess);
        }
        self.refresh_epoch(params);

        Ok(Ingested {
            height,
            reorged,
            epoch_boundary,
        })
    }

    /// Height of the block that opened the current epoch, when its
    /// timestamp is still unknown.
    pub fn missing_epoch_start(&self, params: &ChainParams) -> Option<u64> {
        if self.is_empty() || self.state.last_adjustment_time.is_some() {
            return None;
        }
        epoch_start(self.state.current_height, params)
    }

    /// Record the opening block of the current epoch as read from the node.
    /// Ignored when the tip has moved to another epoch meanwhile.
    pub fn anchor_epoch(
        &mut self,
        height: u64,
        timestamp: i64,
        previous_retarget: f64,
        params: &ChainParams,
    ) -> bool {
        if epoch_start(self.state.current_height, params) != Some(height)
            || self.state.last_adjustment_time.is_some()
        {
            return false;
        }
        self.push_anchor(EpochAnchor {
            height,
            timestamp,
            previous_retarget,
        });
        self.refresh_epoch(params);
        info!("STORE - epoch {} anchored at {} from node", height, timestamp);
        true
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn latest(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn chain_state(&self) -> ChainState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn push_anchor(&mut self, anchor: EpochAnchor) {
        self.anchors.push(anchor);
        if self.anchors.len() > ANCHORS_KEPT {
            self.anchors.remove(0);
        }
    }

    // Only an anchor of the tip's own epoch describes the running epoch.
    fn refresh_epoch(&mut self, params: &ChainParams) {
        let start = epoch_start(self.state.current_height, params);
        let anchor = self.anchors.last().filter(|a| Some(a.height) == start);
        self.state.last_adjustment_time = anchor.map(|a| a.timestamp);
        self.state.previous_retarget = anchor.map_or(0.0, |a| a.previous_retarget);
    }
}

fn epoch_start(height: i64, params: &ChainParams) -> Option<u64> {
    let height = u64::try_from(height).ok()?;
    Some(height - height % params.epoch_length.max(1))
}

/// Percentage difficulty change between the last block of an epoch and
/// the first of the next. Zero when the earlier difficulty is unusable.
pub fn retarget_percent(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (after / before - 1.0) * 100.0
    } else {
        0.0
    }
}
