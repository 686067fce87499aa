use std::fmt;
use std::sync::Arc;

use crate::{SharedStore, StoreError};

/// Recoverable persistence problems. They never reach callers of the
/// telemetry or advisory APIs; they are only reported to the observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreDiagnostic {
    ReadFailed { key: String, reason: String },
    WriteFailed { key: String, reason: String },
    Malformed { key: String, reason: String },
}

impl StoreDiagnostic {
    pub fn key(&self) -> &str {
        match self {
            StoreDiagnostic::ReadFailed { key, .. }
            | StoreDiagnostic::WriteFailed { key, .. }
            | StoreDiagnostic::Malformed { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreDiagnostic::ReadFailed { .. } => "read_failed",
            StoreDiagnostic::WriteFailed { .. } => "write_failed",
            StoreDiagnostic::Malformed { .. } => "malformed",
        }
    }
}

impl fmt::Display for StoreDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreDiagnostic::ReadFailed { key, reason } => write!(f, "read {key}: {reason}"),
            StoreDiagnostic::WriteFailed { key, reason } => write!(f, "write {key}: {reason}"),
            StoreDiagnostic::Malformed { key, reason } => write!(f, "malformed {key}: {reason}"),
        }
    }
}

pub type DiagnosticHook = Arc<dyn Fn(&StoreDiagnostic) + Send + Sync>;

/// Wraps a store so that every failure degrades to "no value".
#[derive(Clone)]
pub struct GuardedStore {
    inner: SharedStore,
    hook: Option<DiagnosticHook>,
}

impl GuardedStore {
    pub fn new(inner: SharedStore) -> Self {
        Self { inner, hook: None }
    }

    pub fn with_hook(mut self, hook: DiagnosticHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn backend_id(&self) -> &'static str {
        self.inner.id()
    }

    pub fn read(&self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            Ok(value) => value,
            Err(err) => {
                self.report(StoreDiagnostic::ReadFailed {
                    key: key.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    /// Returns whether the write landed; callers are free to ignore it.
    pub fn write(&self, key: &str, value: &str) -> bool {
        self.settle(key, self.inner.set(key, value))
    }

    pub fn remove(&self, key: &str) -> bool {
        self.settle(key, self.inner.remove(key))
    }

    pub fn report(&self, diagnostic: StoreDiagnostic) {
        tracing::debug!(
            target: "vantage.store",
            backend = self.inner.id(),
            key = diagnostic.key(),
            kind = diagnostic.kind(),
            "{diagnostic}"
        );
        if let Some(hook) = self.hook.as_ref() {
            hook(&diagnostic);
        }
    }

    fn settle(&self, key: &str, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.report(StoreDiagnostic::WriteFailed {
                    key: key.to_string(),
                    reason: err.to_string(),
                });
                false
            }
        }
    }
}

impl fmt::Debug for GuardedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedStore")
            .field("backend", &self.inner.id())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
