use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vantage_advisory::{RemoteConfig, SimulatedConfig, MAX_RETRIES};
use vantage_protocol::PersonaTag;

/// Which insight provider backs the capability. Resolved once at startup.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Simulated,
    Remote,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Simulated => "simulated",
            ProviderKind::Remote => "remote",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" | "mock" => Some(ProviderKind::Simulated),
            "remote" | "http" => Some(ProviderKind::Remote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct StateConfig {
    /// Directory for the file-backed store. Without it state lives in memory
    /// for the lifetime of the process.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PersonaConfig {
    /// Fallback persona when neither the request nor the store names one.
    #[serde(default)]
    pub default: Option<PersonaTag>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SimulatedSection {
    #[serde(default)]
    pub min_latency_ms: Option<u64>,
    #[serde(default)]
    pub max_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RemoteSection {
    /// Feature flag for the networked provider.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Full URL of the insight endpoint, e.g. <https://insights.example.com/v1/insights>
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub simulated: SimulatedSection,
    #[serde(default)]
    pub remote: RemoteSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    /// Reads an optional TOML file, then layers `VANTAGE_*` environment
    /// overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        Ok(base.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env_string("VANTAGE_STATE_DIR") {
            self.state.dir = Some(dir);
        }
        if let Some(raw) = env_string("VANTAGE_DEFAULT_PERSONA") {
            match PersonaTag::from_slug(&raw) {
                Some(persona) => self.persona.default = Some(persona),
                None => tracing::warn!(value = %raw, "ignoring unknown VANTAGE_DEFAULT_PERSONA"),
            }
        }
        if let Some(raw) = env_string("VANTAGE_PROVIDER") {
            match ProviderKind::from_slug(&raw) {
                Some(kind) => self.provider.kind = kind,
                None => tracing::warn!(value = %raw, "ignoring unknown VANTAGE_PROVIDER"),
            }
        }
        if let Some(flag) = env_bool("VANTAGE_REMOTE_INSIGHTS") {
            self.provider.remote.enabled = Some(flag);
        }
        if let Some(endpoint) = env_string("VANTAGE_REMOTE_ENDPOINT") {
            self.provider.remote.endpoint = Some(endpoint);
        }
        if let Some(v) = env_parse("VANTAGE_REMOTE_TIMEOUT_MS") {
            self.provider.remote.timeout_ms = Some(v);
        }
        if let Some(v) = env_parse("VANTAGE_REMOTE_MAX_RETRIES") {
            self.provider.remote.max_retries = Some(v);
        }
        if let Some(v) = env_parse("VANTAGE_REMOTE_BACKOFF_MS") {
            self.provider.remote.backoff_ms = Some(v);
        }
        if let Some(v) = env_parse("VANTAGE_SIM_MIN_LATENCY_MS") {
            self.provider.simulated.min_latency_ms = Some(v);
        }
        if let Some(v) = env_parse("VANTAGE_SIM_MAX_LATENCY_MS") {
            self.provider.simulated.max_latency_ms = Some(v);
        }
        self
    }

    pub fn state_dir(&self) -> Option<PathBuf> {
        self.state
            .dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
    }

    pub fn default_persona(&self) -> PersonaTag {
        self.persona.default.unwrap_or_default()
    }

    pub fn simulated_config(&self) -> SimulatedConfig {
        let defaults = SimulatedConfig::default();
        SimulatedConfig {
            min_latency_ms: self
                .provider
                .simulated
                .min_latency_ms
                .unwrap_or(defaults.min_latency_ms),
            max_latency_ms: self
                .provider
                .simulated
                .max_latency_ms
                .unwrap_or(defaults.max_latency_ms),
        }
        .normalise()
    }

    /// An absent flag means disabled.
    pub fn remote_config(&self) -> RemoteConfig {
        let defaults = RemoteConfig::default();
        let remote = &self.provider.remote;
        let max_retries = match remote.max_retries {
            Some(v) if v > MAX_RETRIES => {
                tracing::warn!(value = v, limit = MAX_RETRIES, "clamping remote max_retries");
                MAX_RETRIES
            }
            Some(v) => v,
            None => defaults.max_retries,
        };
        RemoteConfig {
            enabled: remote.enabled.unwrap_or(false),
            endpoint: remote.endpoint.clone(),
            timeout_ms: remote.timeout_ms.unwrap_or(defaults.timeout_ms),
            max_retries,
            backoff_ms: remote.backoff_ms.unwrap_or(defaults.backoff_ms),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// JSON schema describing the configuration file.
pub fn config_schema_json() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(Config);
    Ok(serde_json::to_value(&schema)?)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env_string(key)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring non-boolean flag");
            None
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable value");
            None
        }
    }
}
