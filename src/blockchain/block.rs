use serde::{Deserialize, Serialize};

/// A block header as reported by the node. Read-only for every calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub version: u32,
    pub difficulty: f64,
    pub timestamp: i64, // Unix timestamp (UTC)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

impl Block {
    #[cfg(test)]
    pub fn new(height: u64, version: u32, difficulty: f64, timestamp: i64) -> Self {
        Self {
            height,
            version,
            difficulty,
            timestamp,
            hash: String::new(),
        }
    }

    /// Basic sanity checks on externally supplied fields.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.difficulty.is_finite() || self.difficulty < 0.0 {
            return Err("difficulty must be a finite number >= 0");
        }
        if self.timestamp < 0 {
            return Err("timestamp must be unix seconds >= 0");
        }
        if !self.hash.is_empty() && !matches!(hex::decode(&self.hash), Ok(b) if b.len() == 32) {
            return Err("hash must be 32 bytes of hex");
        }
        Ok(())
    }
}
