//! Lightweight per-operation timing, surfaced to the UI for diagnostics.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Last observed duration per operation name, plus the last successful
/// sync time. Append-only; each operation overwrites its own entry.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    durations: HashMap<String, Duration>,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl PerformanceMetrics {
    pub fn record(&mut self, operation: &str, elapsed: Duration) {
        self.durations.insert(operation.to_string(), elapsed);
    }

    pub fn duration(&self, operation: &str) -> Option<Duration> {
        self.durations.get(operation).copied()
    }

    pub fn mark_synced(&mut self) {
        self.last_sync_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_previous_duration() {
        let mut metrics = PerformanceMetrics::default();
        metrics.record("token_refresh", Duration::from_millis(120));
        metrics.record("token_refresh", Duration::from_millis(45));
        assert_eq!(
            metrics.duration("token_refresh"),
            Some(Duration::from_millis(45))
        );
        assert_eq!(metrics.duration("profile_fetch"), None);
    }
}
