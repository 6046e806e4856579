use serde::Serialize;

use crate::blockchain::{Block, MEOWPOW_VERSION, SCRYPT_VERSION};

/// The two proof-of-work algorithms mined on the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmTag {
    MeowPow,
    /// Merge-mined through auxpow.
    Scrypt,
}

impl AlgorithmTag {
    pub const ALL: [AlgorithmTag; 2] = [AlgorithmTag::MeowPow, AlgorithmTag::Scrypt];

    /// Classify a block version. Unknown versions belong to neither algorithm.
    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            MEOWPOW_VERSION => Some(Self::MeowPow),
            SCRYPT_VERSION => Some(Self::Scrypt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MeowPow => "MeowPow",
            Self::Scrypt => "Scrypt",
        }
    }

    /// Algorithm index used by the node RPC.
    pub fn rpc_id(self) -> u8 {
        match self {
            Self::MeowPow => 0,
            Self::Scrypt => 1,
        }
    }

    pub fn is_auxpow(self) -> bool {
        matches!(self, Self::Scrypt)
    }
}

/// One value per algorithm. Both entries always exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualAlgorithm<T> {
    pub meowpow: T,
    pub scrypt: T,
}

impl<T> DualAlgorithm<T> {
    pub fn from_fn(mut f: impl FnMut(AlgorithmTag) -> T) -> Self {
        Self {
            meowpow: f(AlgorithmTag::MeowPow),
            scrypt: f(AlgorithmTag::Scrypt),
        }
    }

    pub fn get(&self, tag: AlgorithmTag) -> &T {
        match tag {
            AlgorithmTag::MeowPow => &self.meowpow,
            AlgorithmTag::Scrypt => &self.scrypt,
        }
    }
}

/// Blocks split by algorithm, in input order.
pub type Classified<'a> = DualAlgorithm<Vec<&'a Block>>;

/// Partition blocks into per-algorithm sequences by exact version match.
pub fn classify(blocks: &[Block]) -> Classified<'_> {
    let mut out = Classified {
        meowpow: Vec::new(),
        scrypt: Vec::new(),
    };
    for block in blocks {
        match AlgorithmTag::from_version(block.version) {
            Some(AlgorithmTag::MeowPow) => out.meowpow.push(block),
            Some(AlgorithmTag::Scrypt) => out.scrypt.push(block),
            None => {}
        }
    }
    out
}
