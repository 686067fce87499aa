use serde::Serialize;

use vantage_protocol::{AdvisoryLogEntry, AUDIT_TARGET, LOG_CAPACITY};
use vantage_store::{BoundedLog, GuardedStore, KEY_ADVISORY_LOG};

use crate::percentiles::summarize;

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct AdvisorySummary {
    pub total: usize,
    pub failures: usize,
    pub error_rate: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
}

/// Capped log of advisory invocations, independent of the navigation log.
pub struct AdvisoryAuditLogger {
    log: BoundedLog<AdvisoryLogEntry>,
}

impl AdvisoryAuditLogger {
    pub fn new(store: GuardedStore) -> Self {
        Self {
            log: BoundedLog::open(store, KEY_ADVISORY_LOG, LOG_CAPACITY),
        }
    }

    /// Never fails; a store write error is reported to diagnostics only.
    pub fn log(&self, entry: AdvisoryLogEntry) {
        tracing::info!(
            target: AUDIT_TARGET,
            action = %entry.action,
            persona = entry.persona.as_str(),
            view = %entry.view,
            success = entry.success,
            latency_ms = entry.latency_ms,
            error = entry.error.as_deref().unwrap_or(""),
            "advisory call"
        );
        self.log.append(entry);
    }

    /// Most recent entry first.
    pub fn read_all(&self) -> Vec<AdvisoryLogEntry> {
        self.log.snapshot_newest_first()
    }

    pub fn clear(&self) {
        self.log.clear();
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn summary(&self) -> AdvisorySummary {
        let entries = self.log.snapshot();
        if entries.is_empty() {
            return AdvisorySummary::default();
        }
        let failures = entries.iter().filter(|e| !e.success).count();
        let latency = summarize(entries.iter().map(|e| e.latency_ms));
        AdvisorySummary {
            total: entries.len(),
            failures,
            error_rate: failures as f64 / entries.len() as f64,
            latency_p50_ms: latency.p50,
            latency_p95_ms: latency.p95,
        }
    }
}
