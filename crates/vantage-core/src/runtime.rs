use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::time::Instant;
use vantage_advisory::{
    InsightProvider, RemoteInsightProvider, SharedProvider, SimulatedInsightProvider,
};
use vantage_protocol::{AdvisoryLogEntry, InsightRequest, InsightResponse};
use vantage_store::{
    DiagnosticHook, FileStore, GuardedStore, MemoryStore, SharedStore, UnavailableStore,
};
use vantage_telemetry::{
    AdvisoryAuditLogger, NavigationMarker, NavigationTimingRecorder, PercentileReporter,
};

use crate::config::{Config, ProviderKind};
use crate::persona::{NavigationRequest, PersonaResolver};

/// Action name recorded in the advisory log for insight evaluations.
pub const ACTION_EVALUATE: &str = "insights.evaluate";

/// Builds the provider selected by configuration. Callers only see the trait.
pub fn build_provider(config: &Config) -> SharedProvider {
    match config.provider.kind {
        ProviderKind::Simulated => Arc::new(SimulatedInsightProvider::new(config.simulated_config())),
        ProviderKind::Remote => Arc::new(RemoteInsightProvider::new(config.remote_config())),
    }
}

/// File-backed store under the configured state directory, an in-memory
/// store when none is configured, or an unavailable store if the directory
/// cannot be prepared.
pub fn open_store(config: &Config) -> SharedStore {
    match config.state_dir() {
        Some(dir) => match FileStore::open(&dir) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), %err, "state directory unavailable; telemetry is session-only");
                Arc::new(UnavailableStore::new(err.to_string()))
            }
        },
        None => Arc::new(MemoryStore::new()),
    }
}

pub struct RuntimeBuilder {
    config: Config,
    store: Option<SharedStore>,
    provider: Option<SharedProvider>,
    diagnostics: Option<DiagnosticHook>,
}

impl RuntimeBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            provider: None,
            diagnostics: None,
        }
    }

    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn provider(mut self, provider: SharedProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn diagnostics(mut self, hook: DiagnosticHook) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    pub fn build(self) -> AdvisoryRuntime {
        let backing = self.store.unwrap_or_else(|| open_store(&self.config));
        let mut store = GuardedStore::new(backing);
        if let Some(hook) = self.diagnostics {
            store = store.with_hook(hook);
        }
        let provider = self.provider.unwrap_or_else(|| build_provider(&self.config));
        let marker = Arc::new(NavigationMarker::new());
        let recorder = NavigationTimingRecorder::new(store.clone(), marker.clone());
        let reporter = PercentileReporter::new(recorder.samples());
        let audit = Arc::new(AdvisoryAuditLogger::new(store.clone()));
        let persona = PersonaResolver::new(store.clone(), self.config.default_persona());
        tracing::info!(
            store = store.backend_id(),
            provider = provider.id(),
            default_persona = persona.default_persona().as_str(),
            "advisory runtime ready"
        );
        AdvisoryRuntime {
            config: self.config,
            store,
            marker,
            persona,
            recorder,
            reporter,
            audit,
            provider,
        }
    }
}

/// Composition root: owns the store, the navigation marker and every
/// telemetry/advisory component for one session.
pub struct AdvisoryRuntime {
    config: Config,
    store: GuardedStore,
    marker: Arc<NavigationMarker>,
    persona: PersonaResolver,
    recorder: NavigationTimingRecorder,
    reporter: PercentileReporter,
    audit: Arc<AdvisoryAuditLogger>,
    provider: SharedProvider,
}

impl AdvisoryRuntime {
    pub fn new(config: Config) -> Self {
        RuntimeBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &GuardedStore {
        &self.store
    }

    pub fn marker(&self) -> &Arc<NavigationMarker> {
        &self.marker
    }

    pub fn persona(&self) -> &PersonaResolver {
        &self.persona
    }

    pub fn recorder(&self) -> &NavigationTimingRecorder {
        &self.recorder
    }

    pub fn reporter(&self) -> &PercentileReporter {
        &self.reporter
    }

    pub fn audit(&self) -> &AdvisoryAuditLogger {
        &self.audit
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// A view transition: re-resolves the persona and starts the timing marker.
    pub fn navigate(&self, view: &str, request: &NavigationRequest) {
        self.persona.resolve(request);
        self.recorder.mark_navigation_start(view);
    }

    /// Evaluates insights for `view` under the current persona and records the
    /// outcome. The evaluation runs as its own task: dropping the returned
    /// future does not cancel it, and it is still logged.
    pub async fn request_insights(&self, view: &str, context: Map<String, Value>) -> InsightResponse {
        let request = InsightRequest {
            view: view.to_string(),
            persona: self.persona.current(),
            context,
        };
        let persona = request.persona;
        let provider = self.provider.clone();
        let audit = self.audit.clone();
        let started = Instant::now();
        let task = tokio::spawn(async move {
            let response = provider.evaluate(&request).await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            let mut entry = AdvisoryLogEntry::new(
                ACTION_EVALUATE,
                request.persona,
                request.view.as_str(),
                response.is_success(),
                latency_ms,
            );
            if let Some(error) = response.error.as_ref() {
                entry = entry.with_error(error.clone());
            }
            audit.log(entry);
            response
        });
        match task.await {
            Ok(response) => response,
            Err(err) => {
                let message = format!("insight evaluation aborted: {err}");
                tracing::error!(view, %err, "insight evaluation task failed");
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.audit.log(
                    AdvisoryLogEntry::new(ACTION_EVALUATE, persona, view, false, latency_ms)
                        .with_error(message.clone()),
                );
                InsightResponse::failed(message)
            }
        }
    }
}
