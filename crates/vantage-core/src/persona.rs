use std::sync::RwLock;

use url::Url;
use vantage_protocol::PersonaTag;
use vantage_store::{GuardedStore, StoreDiagnostic, KEY_PERSONA};

/// Query parameter that carries an explicit persona on a navigation.
pub const PERSONA_PARAM: &str = "persona";

/// Transient inputs carried by the navigation that triggered resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationRequest {
    pub persona: Option<String>,
}

impl NavigationRequest {
    pub fn with_persona(raw: impl Into<String>) -> Self {
        Self {
            persona: Some(raw.into()),
        }
    }

    /// Accepts an absolute URL or a relative path with a query string.
    pub fn from_url(raw: &str) -> Self {
        let parsed = Url::parse(raw).or_else(|_| {
            Url::parse("http://localhost/").and_then(|base| base.join(raw))
        });
        let persona = parsed.ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == PERSONA_PARAM)
                .map(|(_, value)| value.into_owned())
        });
        Self { persona }
    }
}

/// Resolves the active persona: explicit request parameter, then the
/// persisted preference, then the configured default. The result is memoized
/// until the next navigation or explicit selection.
pub struct PersonaResolver {
    store: GuardedStore,
    default: PersonaTag,
    current: RwLock<Option<PersonaTag>>,
}

impl PersonaResolver {
    pub fn new(store: GuardedStore, default: PersonaTag) -> Self {
        Self {
            store,
            default,
            current: RwLock::new(None),
        }
    }

    pub fn default_persona(&self) -> PersonaTag {
        self.default
    }

    /// Re-resolves for a navigation event and memoizes the result.
    pub fn resolve(&self, request: &NavigationRequest) -> PersonaTag {
        let explicit = request.persona.as_deref().and_then(PersonaTag::from_slug);
        let resolved = explicit
            .or_else(|| self.persisted())
            .unwrap_or(self.default);
        tracing::debug!(
            persona = resolved.as_str(),
            explicit = explicit.is_some(),
            "persona resolved"
        );
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(resolved);
        resolved
    }

    /// Memoized persona, resolved without request parameters on first use.
    pub fn current(&self) -> PersonaTag {
        let memo = *self.current.read().unwrap_or_else(|p| p.into_inner());
        match memo {
            Some(persona) => persona,
            None => self.resolve(&NavigationRequest::default()),
        }
    }

    /// Explicit change: persists the preference (best effort) and makes it current.
    pub fn select(&self, persona: PersonaTag) {
        self.store.write(KEY_PERSONA, persona.as_str());
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(persona);
        tracing::info!(persona = persona.as_str(), "persona selected");
    }

    fn persisted(&self) -> Option<PersonaTag> {
        let raw = self.store.read(KEY_PERSONA)?;
        let cleaned = raw.trim().trim_matches('"');
        let parsed = PersonaTag::from_slug(cleaned);
        if parsed.is_none() {
            self.store.report(StoreDiagnostic::Malformed {
                key: KEY_PERSONA.to_string(),
                reason: format!("unknown persona {cleaned:?}"),
            });
        }
        parsed
    }
}
