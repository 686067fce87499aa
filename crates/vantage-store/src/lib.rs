//! Key-value store capability used for persona preferences and the bounded
//! telemetry logs.
//!
//! The store is treated as unreliable: every implementation may fail, and the
//! [`GuardedStore`] wrapper turns those failures into "no value" while
//! reporting them to an optional diagnostic observer.

mod bounded;
mod file;
mod guarded;
mod memory;

pub use bounded::{BoundedLog, MAX_PERSISTED_BYTES};
pub use file::FileStore;
pub use guarded::{DiagnosticHook, GuardedStore, StoreDiagnostic};
pub use memory::{MemoryStore, UnavailableStore};

/// Persisted persona preference.
pub const KEY_PERSONA: &str = "vantage.persona";
/// Navigation timing sample log.
pub const KEY_NAVIGATION_LOG: &str = "vantage.telemetry.navigation";
/// Advisory call outcome log.
pub const KEY_ADVISORY_LOG: &str = "vantage.advisory.log";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("quota exceeded: {len} bytes over limit {limit}")]
    QuotaExceeded { len: usize, limit: usize },
}

/// Synchronous, string-keyed, string-valued store. Writers are not
/// coordinated: two handles writing the same key are last-writer-wins.
pub trait KeyValueStore: Send + Sync {
    fn id(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub type SharedStore = std::sync::Arc<dyn KeyValueStore>;
