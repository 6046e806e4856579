pub mod block;
pub mod halving;
pub mod store;

pub use block::Block;
pub use halving::project_halving;
pub use store::{BlockStore, ChainState, retarget_percent};

/// Block version tag of MeowPow (primary algorithm) blocks.
pub const MEOWPOW_VERSION: u32 = 0x3009_0000;

/// Block version tag of Scrypt (auxpow, secondary algorithm) blocks.
pub const SCRYPT_VERSION: u32 = 0x3009_0100;

/// Blocks per difficulty epoch.
pub const EPOCH_LENGTH: u64 = 2016;

/// Target seconds per block, shared by every difficulty view.
pub const TARGET_BLOCK_TIME_SECS: u32 = 60;

/// Blocks between subsidy halvings.
pub const HALVING_INTERVAL: u64 = 2_100_000;

/// How many recent blocks are kept in memory by default
pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 64;

/// Protocol parameters every calculation is driven from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParams {
    pub target_block_secs: u32,
    pub epoch_length: u64,
    pub halving_interval: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            target_block_secs: TARGET_BLOCK_TIME_SECS,
            epoch_length: EPOCH_LENGTH,
            halving_interval: HALVING_INTERVAL,
        }
    }
}

impl ChainParams {
    pub fn with_target_block_secs(mut self, secs: u32) -> Self {
        // zero would make every ratio meaningless
        self.target_block_secs = secs.max(1);
        self
    }
}
