//! Batch screening configuration.
//!
//! A single immutable [`ScreenConfig`] is built once per batch (CLI flags over
//! defaults) and threaded into the search client and the dispatcher. Nothing
//! reads configuration from globals, so concurrent batches in one process
//! cannot leak settings into each other.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default address of the search service.
pub const DEFAULT_API_ADDRESS: &str = "http://localhost:8084";

/// Configuration for one screening batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Base address of the search service.
    pub address: String,
    /// Maximum number of rows searched concurrently.
    pub workers: usize,
    /// Score at or above which a returned candidate is labeled MATCH.
    pub threshold: f64,
    /// Score floor below which the service will not return a candidate at all.
    /// Distinct from `threshold`: this filters what comes back, the threshold
    /// labels what came back.
    pub min_match: f64,
    /// Subject-type filter forwarded to the service (e.g. "individual").
    pub sdn_type: String,
    /// Maximum number of candidates requested per search.
    pub limit: u32,
    /// Correlation id sent as the X-Request-ID header. A v4 UUID is generated
    /// when empty.
    pub request_id: Option<String>,
    /// Column separator for the output CSV.
    pub separator: String,
    /// Per-call timeout for search and lookup requests, in seconds.
    pub timeout_secs: u64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_API_ADDRESS.to_string(),
            workers: default_workers(),
            threshold: 0.99,
            min_match: 0.90,
            sdn_type: "individual".to_string(),
            limit: 1,
            request_id: None,
            separator: ",".to_string(),
            timeout_secs: 5,
        }
    }
}

impl ScreenConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
