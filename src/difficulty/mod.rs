//! Dual-algorithm difficulty engine: block classification, per-algorithm
//! metrics, epoch retarget projection and the caches serving them.

pub mod aggregator;
pub mod algorithm;
pub mod cache;
pub mod metrics;
pub mod retarget;

pub use aggregator::{auxpow_active, metrics_snapshot, retarget_snapshot};
pub use algorithm::{AlgorithmTag, DualAlgorithm, classify};
#[cfg(test)]
pub use cache::ManualClock;
pub use cache::{Clock, FreshnessCache, SystemClock};
pub use metrics::{AlgorithmMetrics, compute_metrics};
pub use retarget::{RetargetInputs, RetargetProjection, project_retarget};
