use std::sync::{Arc, Mutex};
use std::time::Instant;

use vantage_protocol::{TimingSample, LOG_CAPACITY};
use vantage_store::{BoundedLog, GuardedStore, KEY_NAVIGATION_LOG};

/// A navigation that has started but whose view has not rendered yet.
#[derive(Clone, Debug)]
pub struct PendingNavigation {
    pub view: String,
    pub started: Instant,
}

/// Process-wide "last navigation start" cell. Owned by the composition root
/// and handed to the recorder so tests can inspect it directly.
#[derive(Debug, Default)]
pub struct NavigationMarker {
    slot: Mutex<Option<PendingNavigation>>,
}

impl NavigationMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, view: impl Into<String>) {
        let pending = PendingNavigation {
            view: view.into(),
            started: Instant::now(),
        };
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(pending);
    }

    /// Removes and returns the marker; a marker is consumed at most once.
    pub fn take(&self) -> Option<PendingNavigation> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    pub fn peek(&self) -> Option<PendingNavigation> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_set(&self) -> bool {
        self.peek().is_some()
    }
}

pub struct NavigationTimingRecorder {
    marker: Arc<NavigationMarker>,
    log: Arc<BoundedLog<TimingSample>>,
}

impl NavigationTimingRecorder {
    pub fn new(store: GuardedStore, marker: Arc<NavigationMarker>) -> Self {
        Self {
            marker,
            log: Arc::new(BoundedLog::open(store, KEY_NAVIGATION_LOG, LOG_CAPACITY)),
        }
    }

    pub fn mark_navigation_start(&self, view: &str) {
        tracing::trace!(view, "navigation start");
        self.marker.set(view);
    }

    /// Records the time since the last navigation start. Without a marker the
    /// elapsed time is measured from now, i.e. ~0.
    pub fn record_view_ready(&self, view: &str) -> TimingSample {
        let now = Instant::now();
        let pending = self.marker.take();
        let started = pending.as_ref().map(|p| p.started).unwrap_or(now);
        let elapsed_ms = now.saturating_duration_since(started).as_secs_f64() * 1000.0;
        if let Some(pending) = pending.as_ref() {
            if pending.view != view {
                tracing::debug!(
                    marked = %pending.view,
                    rendered = view,
                    "view ready does not match the marked navigation"
                );
            }
        }
        let sample = TimingSample::new(view, elapsed_ms);
        self.log.append(sample.clone());
        tracing::debug!(view, elapsed_ms, "view ready");
        sample
    }

    pub fn marker(&self) -> &Arc<NavigationMarker> {
        &self.marker
    }

    /// Shared read handle for reporters.
    pub fn samples(&self) -> Arc<BoundedLog<TimingSample>> {
        self.log.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vantage_store::MemoryStore;

    fn recorder() -> NavigationTimingRecorder {
        let store = GuardedStore::new(Arc::new(MemoryStore::new()));
        NavigationTimingRecorder::new(store, Arc::new(NavigationMarker::new()))
    }

    #[test]
    fn immediate_ready_is_near_zero_and_clears_marker() {
        let recorder = recorder();
        recorder.mark_navigation_start("x");
        let sample = recorder.record_view_ready("x");
        assert_eq!(sample.view, "x");
        assert!(sample.elapsed_ms < 50.0, "elapsed {}", sample.elapsed_ms);
        assert!(!recorder.marker().is_set());
    }

    #[test]
    fn stale_marker_is_not_reused() {
        let recorder = recorder();
        recorder.mark_navigation_start("x");
        std::thread::sleep(Duration::from_millis(30));
        let first = recorder.record_view_ready("x");
        assert!(first.elapsed_ms >= 25.0, "elapsed {}", first.elapsed_ms);

        std::thread::sleep(Duration::from_millis(30));
        let second = recorder.record_view_ready("y");
        assert!(second.elapsed_ms < 25.0, "elapsed {}", second.elapsed_ms);
        assert_eq!(recorder.samples().len(), 2);
    }

    #[test]
    fn unmarked_ready_records_zero_ish_sample() {
        let recorder = recorder();
        let sample = recorder.record_view_ready("orders");
        assert!(sample.elapsed_ms >= 0.0 && sample.elapsed_ms < 5.0);
        assert_eq!(recorder.samples().snapshot(), vec![sample]);
    }

    #[test]
    fn sample_log_is_capped() {
        let recorder = recorder();
        for i in 0..(LOG_CAPACITY + 20) {
            recorder.mark_navigation_start(&format!("v{i}"));
            recorder.record_view_ready(&format!("v{i}"));
        }
        let samples = recorder.samples().snapshot();
        assert_eq!(samples.len(), LOG_CAPACITY);
        assert_eq!(samples[0].view, "v20");
    }
}
