//! Client-side telemetry: navigation timing, percentile summaries and the
//! advisory audit trail.
//!
//! Every operation here is best-effort. Persistence problems are absorbed by
//! [`vantage_store::GuardedStore`] and never surface to callers.

mod audit;
mod navigation;
mod percentiles;

pub use audit::{AdvisoryAuditLogger, AdvisorySummary};
pub use vantage_protocol::AUDIT_TARGET;
pub use navigation::{NavigationMarker, NavigationTimingRecorder, PendingNavigation};
pub use percentiles::{nearest_rank, summarize, PercentileReporter};
