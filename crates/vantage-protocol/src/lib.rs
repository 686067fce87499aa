//! Data contracts shared by the persona resolver, navigation telemetry and the
//! advisory insight providers.
//!
//! Rendering components only consume these shapes; nothing here performs I/O.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Capacity shared by the navigation sample log and the advisory log.
pub const LOG_CAPACITY: usize = 100;

/// Tracing target carrying one event per advisory call. The rolling audit
/// file layer filters on it.
pub const AUDIT_TARGET: &str = "vantage.audit";

/// Closed set of personas that change which content and insight variants are shown.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTag {
    #[default]
    Buyer,
    Operator,
    Analyst,
}

impl PersonaTag {
    pub const ALL: [PersonaTag; 3] = [PersonaTag::Buyer, PersonaTag::Operator, PersonaTag::Analyst];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaTag::Buyer => "buyer",
            PersonaTag::Operator => "operator",
            PersonaTag::Analyst => "analyst",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            PersonaTag::Buyer => "Buyer",
            PersonaTag::Operator => "Operator",
            PersonaTag::Analyst => "Analyst",
        }
    }

    /// Lenient parse: anything outside the closed set is treated as absent.
    pub fn from_slug(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "buyer" => Some(PersonaTag::Buyer),
            "operator" => Some(PersonaTag::Operator),
            "analyst" => Some(PersonaTag::Analyst),
            _ => None,
        }
    }
}

impl std::fmt::Display for PersonaTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed time between a navigation start marker and the first render of a view.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimingSample {
    pub view: String,
    pub elapsed_ms: f64,
    pub captured_at: DateTime<Utc>,
}

impl TimingSample {
    pub fn new(view: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            view: view.into(),
            elapsed_ms: elapsed_ms.max(0.0),
            captured_at: Utc::now(),
        }
    }
}

/// Outcome of one insight provider invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryLogEntry {
    pub action: String,
    pub persona: PersonaTag,
    pub view: String,
    pub success: bool,
    pub latency_ms: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdvisoryLogEntry {
    pub fn new(
        action: impl Into<String>,
        persona: PersonaTag,
        view: impl Into<String>,
        success: bool,
        latency_ms: f64,
    ) -> Self {
        Self {
            action: action.into(),
            persona,
            view: view.into(),
            success,
            latency_ms: latency_ms.max(0.0),
            captured_at: Utc::now(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Input contract for insight providers. Extra context keys are flattened into
/// the serialized object next to `view` and `persona`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsightRequest {
    pub view: String,
    pub persona: PersonaTag,
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl InsightRequest {
    pub fn new(view: impl Into<String>, persona: PersonaTag) -> Self {
        Self {
            view: view.into(),
            persona,
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    #[default]
    Info,
    Warn,
    Critical,
}

impl InsightSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightSeverity::Info => "info",
            InsightSeverity::Warn => "warn",
            InsightSeverity::Critical => "critical",
        }
    }

    pub fn from_slug(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "critical" | "error" => InsightSeverity::Critical,
            "warn" | "warning" => InsightSeverity::Warn,
            _ => InsightSeverity::Info,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsightAction {
    pub label: String,
    pub action_id: String,
}

impl InsightAction {
    pub fn new(label: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_id: action_id.into(),
        }
    }
}

/// Provenance stamped on every insight by the provider that produced it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsightAudit {
    pub provider_id: String,
    pub latency_ms: f64,
    pub produced_at: DateTime<Utc>,
}

impl InsightAudit {
    pub fn stamp(provider_id: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            provider_id: provider_id.into(),
            latency_ms: latency_ms.max(0.0),
            produced_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub category_tag: String,
    pub title: String,
    pub subtitle: String,
    pub confidence: f64,
    pub severity: InsightSeverity,
    #[serde(default)]
    pub actions: Vec<InsightAction>,
    pub audit: InsightAudit,
}

impl Insight {
    pub fn new(
        category_tag: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        confidence: f64,
        severity: InsightSeverity,
        audit: InsightAudit,
    ) -> Self {
        Self {
            category_tag: category_tag.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            confidence: clamp_confidence(confidence),
            severity,
            actions: Vec::new(),
            audit,
        }
    }

    pub fn with_action(mut self, action: InsightAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Confidence values outside `[0, 1]` (or NaN) are pinned to the nearest bound.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Result shape returned by every insight provider. `insights` is always
/// present; when `error` is set it is empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct InsightResponse {
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub error: Option<String>,
}

impl InsightResponse {
    pub fn ok(insights: Vec<Insight>) -> Self {
        Self {
            insights,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            insights: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Nearest-rank order statistics over a sample set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PercentileStats {
    pub p50: f64,
    pub p95: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persona_from_slug_is_case_insensitive() {
        assert_eq!(PersonaTag::from_slug(" OPERATOR "), Some(PersonaTag::Operator));
        assert_eq!(PersonaTag::from_slug("buyer"), Some(PersonaTag::Buyer));
        assert_eq!(PersonaTag::from_slug("Analyst"), Some(PersonaTag::Analyst));
        assert_eq!(PersonaTag::from_slug("admin"), None);
        assert_eq!(PersonaTag::from_slug(""), None);
    }

    #[test]
    fn persona_labels_match_snake_case() {
        for persona in PersonaTag::ALL {
            let encoded = serde_json::to_value(persona).unwrap();
            assert_eq!(encoded, json!(persona.as_str()));
        }
        assert_eq!(PersonaTag::Operator.display_label(), "Operator");
    }

    #[test]
    fn request_context_is_flattened() {
        let request = InsightRequest::new("dashboard", PersonaTag::Operator)
            .with_context("region", "emea")
            .with_context("window_days", 7);
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "view": "dashboard",
                "persona": "operator",
                "region": "emea",
                "window_days": 7
            })
        );
        let decoded: InsightRequest = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn failed_response_keeps_empty_insights() {
        let response = InsightResponse::failed("provider offline");
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["insights"], json!([]));
        assert_eq!(encoded["error"], json!("provider offline"));
        assert!(!response.is_success());

        let decoded: InsightResponse = serde_json::from_value(json!({"error": null})).unwrap();
        assert!(decoded.insights.is_empty());
        assert!(decoded.is_success());
    }

    #[test]
    fn insight_confidence_is_clamped() {
        let audit = InsightAudit::stamp("simulated", 10.0);
        let high = Insight::new("kpi", "t", "s", 1.7, InsightSeverity::Info, audit.clone());
        assert_eq!(high.confidence, 1.0);
        let nan = Insight::new("kpi", "t", "s", f64::NAN, InsightSeverity::Info, audit);
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn severity_from_slug_handles_synonyms() {
        assert_eq!(InsightSeverity::from_slug("warning"), InsightSeverity::Warn);
        assert_eq!(InsightSeverity::from_slug("ERROR"), InsightSeverity::Critical);
        assert_eq!(InsightSeverity::from_slug("whatever"), InsightSeverity::Info);
    }

    #[test]
    fn advisory_entry_omits_missing_error() {
        let entry = AdvisoryLogEntry::new("insights.evaluate", PersonaTag::Buyer, "orders", true, 12.5);
        let encoded = serde_json::to_value(&entry).unwrap();
        assert!(encoded.get("error").is_none());
        let failed = entry.with_error("timeout");
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }
}
