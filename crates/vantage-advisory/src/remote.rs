use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use vantage_protocol::{InsightAudit, InsightRequest, InsightResponse};

use crate::{AdvisoryError, InsightProvider};

pub const DISABLED_MESSAGE: &str = "remote insight provider is disabled";

const MAX_BACKOFF_MS: u64 = 5_000;

/// Upper bound on retries after the first attempt.
pub const MAX_RETRIES: u32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Static feature flag; while false the provider performs no I/O.
    pub enabled: bool,
    pub endpoint: Option<String>,
    /// Per-attempt request timeout.
    pub timeout_ms: u64,
    /// Retries after the first attempt, capped at [`MAX_RETRIES`].
    pub max_retries: u32,
    /// First backoff delay; doubles per retry up to a fixed cap.
    pub backoff_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_ms: 2_000,
            max_retries: 2,
            backoff_ms: 200,
        }
    }
}

impl RemoteConfig {
    pub fn attempts(&self) -> u32 {
        self.max_retries.min(MAX_RETRIES) + 1
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
    }
}

enum AttemptError {
    Retryable { timeout: bool, reason: String },
    Fatal(AdvisoryError),
}

/// Networked provider behind a feature flag. Disabled, it fails closed with
/// [`DISABLED_MESSAGE`]; enabled, it POSTs the request to the configured
/// endpoint with a bounded retry budget.
#[derive(Clone, Debug)]
pub struct RemoteInsightProvider {
    config: RemoteConfig,
    client: Option<reqwest::Client>,
}

impl RemoteInsightProvider {
    pub const ID: &'static str = "remote";

    pub fn new(config: RemoteConfig) -> Self {
        let client = if config.enabled {
            match reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms.max(1)))
                .build()
            {
                Ok(client) => Some(client),
                Err(err) => {
                    tracing::warn!(%err, "failed to build remote insight client; provider stays closed");
                    None
                }
            }
        } else {
            None
        };
        Self { config, client }
    }

    pub fn disabled() -> Self {
        Self::new(RemoteConfig::default())
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn fetch(&self, request: &InsightRequest) -> Result<InsightResponse, AdvisoryError> {
        if !self.config.enabled {
            return Err(AdvisoryError::Disabled);
        }
        let Some(client) = self.client.as_ref() else {
            return Err(AdvisoryError::Disabled);
        };
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AdvisoryError::NotConfigured)?;

        let attempts = self.config.attempts();
        let mut last = String::new();
        let mut last_was_timeout = false;
        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.config.backoff_for(attempt - 1);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying remote insights");
                tokio::time::sleep(delay).await;
            }
            match attempt_once(client, endpoint, request).await {
                Ok(response) => return Ok(response),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable { timeout, reason }) => {
                    tracing::warn!(attempt, attempts, timeout, %reason, "remote insight attempt failed");
                    last_was_timeout = timeout;
                    last = reason;
                }
            }
        }
        if last_was_timeout {
            Err(AdvisoryError::Timeout { attempts })
        } else {
            Err(AdvisoryError::Exhausted { attempts, last })
        }
    }
}

async fn attempt_once(
    client: &reqwest::Client,
    endpoint: &str,
    request: &InsightRequest,
) -> Result<InsightResponse, AttemptError> {
    let resp = client
        .post(endpoint)
        .json(request)
        .send()
        .await
        .map_err(|err| {
            if err.is_builder() {
                AttemptError::Fatal(AdvisoryError::InvalidEndpoint(err.to_string()))
            } else {
                AttemptError::Retryable {
                    timeout: err.is_timeout(),
                    reason: err.to_string(),
                }
            }
        })?;
    let status = resp.status();
    if status.is_server_error() || status.as_u16() == 429 {
        return Err(AttemptError::Retryable {
            timeout: false,
            reason: format!("HTTP {}", status.as_u16()),
        });
    }
    if !status.is_success() {
        return Err(AttemptError::Fatal(AdvisoryError::Rejected {
            status: status.as_u16(),
        }));
    }
    resp.json::<InsightResponse>().await.map_err(|err| {
        if err.is_timeout() {
            AttemptError::Retryable {
                timeout: true,
                reason: err.to_string(),
            }
        } else {
            AttemptError::Fatal(AdvisoryError::Decode(err.to_string()))
        }
    })
}

#[async_trait::async_trait]
impl InsightProvider for RemoteInsightProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn evaluate(&self, request: &InsightRequest) -> InsightResponse {
        let started = Instant::now();
        match self.fetch(request).await {
            Ok(InsightResponse {
                error: Some(error), ..
            }) => InsightResponse::failed(error),
            Ok(InsightResponse { insights, .. }) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let insights = insights
                    .into_iter()
                    .map(|mut insight| {
                        insight.audit = InsightAudit::stamp(Self::ID, latency_ms);
                        insight.confidence = vantage_protocol::clamp_confidence(insight.confidence);
                        insight
                    })
                    .collect();
                InsightResponse::ok(insights)
            }
            Err(err) => {
                tracing::debug!(view = %request.view, %err, "remote insights unavailable");
                err.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RemoteConfig {
            backoff_ms: 100,
            ..RemoteConfig::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        assert_eq!(config.backoff_for(20), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.backoff_for(200), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn attempts_include_first_try() {
        let config = RemoteConfig {
            max_retries: 3,
            ..RemoteConfig::default()
        };
        assert_eq!(config.attempts(), 4);
    }

    #[test]
    fn attempts_are_capped() {
        for max_retries in [MAX_RETRIES, MAX_RETRIES + 1, 4_000_000_000, u32::MAX] {
            let config = RemoteConfig {
                max_retries,
                ..RemoteConfig::default()
            };
            assert_eq!(config.attempts(), MAX_RETRIES + 1, "{max_retries}");
        }
    }

    #[test]
    fn disabled_provider_builds_no_client() {
        let provider = RemoteInsightProvider::disabled();
        assert!(provider.client.is_none());
        assert!(!provider.config().enabled);
    }
}
