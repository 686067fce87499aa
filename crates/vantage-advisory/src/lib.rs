//! Insight provider capability.
//!
//! Callers hold a [`SharedProvider`] and never learn which implementation
//! backs it. Providers do not fail: every problem is reported through
//! [`InsightResponse::error`] with an empty insight list.

mod catalog;
mod remote;
mod simulated;

use std::sync::Arc;

pub use remote::{RemoteConfig, RemoteInsightProvider, DISABLED_MESSAGE, MAX_RETRIES};
pub use simulated::{SimulatedConfig, SimulatedInsightProvider};

use vantage_protocol::{InsightRequest, InsightResponse};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("{}", DISABLED_MESSAGE)]
    Disabled,
    #[error("remote insight provider has no endpoint configured")]
    NotConfigured,
    #[error("remote insight provider has an invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("remote insight provider timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    #[error("remote insight provider unavailable after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("remote insight provider rejected the request: HTTP {status}")]
    Rejected { status: u16 },
    #[error("remote insight provider returned an unreadable payload: {0}")]
    Decode(String),
}

impl AdvisoryError {
    pub fn into_response(self) -> InsightResponse {
        InsightResponse::failed(self.to_string())
    }
}

#[async_trait::async_trait]
pub trait InsightProvider: Send + Sync {
    /// Stable identifier stamped into every insight's audit record.
    fn id(&self) -> &'static str;

    async fn evaluate(&self, request: &InsightRequest) -> InsightResponse;
}

pub type SharedProvider = Arc<dyn InsightProvider>;
