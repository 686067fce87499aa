use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use vantage_protocol::{InsightAudit, InsightRequest, InsightResponse};

use crate::catalog::insights_for;
use crate::InsightProvider;

/// Latency band for the simulated provider, in milliseconds (inclusive).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulatedConfig {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 50,
            max_latency_ms: 150,
        }
    }
}

impl SimulatedConfig {
    /// Swaps inverted bounds so the band is always usable.
    pub fn normalise(self) -> Self {
        Self {
            min_latency_ms: self.min_latency_ms.min(self.max_latency_ms),
            max_latency_ms: self.min_latency_ms.max(self.max_latency_ms),
        }
    }
}

/// Offline provider backed by a static view-keyed table. Adds jitter so
/// downstream percentile and timeout handling sees realistic latencies.
/// Never reports an error.
#[derive(Clone, Debug, Default)]
pub struct SimulatedInsightProvider {
    config: SimulatedConfig,
}

impl SimulatedInsightProvider {
    pub const ID: &'static str = "simulated";

    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config: config.normalise(),
        }
    }

    pub fn config(&self) -> SimulatedConfig {
        self.config
    }

    fn sample_latency_ms(&self) -> u64 {
        let SimulatedConfig {
            min_latency_ms,
            max_latency_ms,
        } = self.config;
        rand::rng().random_range(min_latency_ms..=max_latency_ms)
    }
}

#[async_trait::async_trait]
impl InsightProvider for SimulatedInsightProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn evaluate(&self, request: &InsightRequest) -> InsightResponse {
        let latency_ms = self.sample_latency_ms();
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        let audit = InsightAudit::stamp(Self::ID, latency_ms as f64);
        let insights = insights_for(&request.view, request.persona, &audit);
        tracing::debug!(
            view = %request.view,
            persona = request.persona.as_str(),
            latency_ms,
            count = insights.len(),
            "simulated insights"
        );
        InsightResponse::ok(insights)
    }
}
