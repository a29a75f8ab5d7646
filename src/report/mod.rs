use chrono::{DateTime, Utc};
use std::time::Duration;

/// Outcome of one collection pass
#[derive(Debug, Clone)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub pods_listed: usize,
    pub pods_running: usize,
    pub pods_pruned: usize,
    /// names listed more than once across namespaces; they share one table entry
    pub duplicate_pod_names: usize,
    /// running pods the metrics server had no snapshot for
    pub usage_missing: usize,
    pub scrape_failures: usize,
    pub malformed_payloads: usize,
}

impl TickReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            pods_listed: 0,
            pods_running: 0,
            pods_pruned: 0,
            duplicate_pod_names: 0,
            usage_missing: 0,
            scrape_failures: 0,
            malformed_payloads: 0,
        }
    }

    pub fn total_failures(&self) -> usize {
        self.usage_missing + self.scrape_failures + self.malformed_payloads
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }
}
