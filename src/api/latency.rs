//! In-memory histogram of per-record ingest latency (decode + fold).

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

/// Ingestion loop records, API reads. Values in microseconds.
pub struct LatencyStats {
    inner: Mutex<Histogram<u64>>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LatencyReport {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

impl LatencyStats {
    /// Tracks 1us to 100s at 3 significant figures.
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, 100_000_000, 3).expect("constant histogram bounds are valid");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().clamp(1, 100_000_000) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn report(&self) -> LatencyReport {
        let Ok(h) = self.inner.lock() else {
            return LatencyReport { samples: 0, p50_us: None, p95_us: None, p99_us: None };
        };
        if h.len() == 0 {
            return LatencyReport { samples: 0, p50_us: None, p95_us: None, p99_us: None };
        }
        LatencyReport {
            samples: h.len(),
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_reports_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(
            stats.report(),
            LatencyReport { samples: 0, p50_us: None, p95_us: None, p99_us: None }
        );
    }

    #[test]
    fn sub_microsecond_samples_are_still_counted() {
        let stats = LatencyStats::new();
        stats.record(Duration::from_nanos(10));
        stats.record(Duration::from_micros(250));
        let report = stats.report();
        assert_eq!(report.samples, 2);
        assert!(report.p99_us.unwrap() >= 250);
    }
}
