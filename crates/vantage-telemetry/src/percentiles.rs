use std::collections::BTreeMap;
use std::sync::Arc;

use vantage_protocol::{PercentileStats, TimingSample};
use vantage_store::BoundedLog;

/// Nearest-rank percentile over an ascending slice: index `ceil(q * n) - 1`,
/// clamped into range. Empty input yields 0.
pub fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

/// P50/P95/count over arbitrary values.
pub fn summarize(values: impl IntoIterator<Item = f64>) -> PercentileStats {
    let mut tmp: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if tmp.is_empty() {
        return PercentileStats::default();
    }
    tmp.sort_unstable_by(|a, b| a.total_cmp(b));
    PercentileStats {
        p50: nearest_rank(&tmp, 0.50),
        p95: nearest_rank(&tmp, 0.95),
        count: tmp.len(),
    }
}

/// Read-only view over the navigation sample log; `reset` is the one
/// destructive operation and cannot be undone.
pub struct PercentileReporter {
    samples: Arc<BoundedLog<TimingSample>>,
}

impl PercentileReporter {
    pub fn new(samples: Arc<BoundedLog<TimingSample>>) -> Self {
        Self { samples }
    }

    pub fn compute_stats(&self) -> PercentileStats {
        summarize(self.samples.snapshot().into_iter().map(|s| s.elapsed_ms))
    }

    pub fn stats_by_view(&self) -> BTreeMap<String, PercentileStats> {
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for sample in self.samples.snapshot() {
            grouped.entry(sample.view).or_default().push(sample.elapsed_ms);
        }
        grouped
            .into_iter()
            .map(|(view, values)| (view, summarize(values)))
            .collect()
    }

    pub fn reset(&self) {
        self.samples.clear();
        tracing::info!("navigation timing samples reset");
    }
}
