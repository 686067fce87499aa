//! Configuration, persona resolution and the composition root that wires the
//! store, telemetry and advisory components together.

pub mod config;
pub mod persona;
pub mod runtime;

pub use config::{config_schema_json, Config, ProviderKind};
pub use persona::{NavigationRequest, PersonaResolver, PERSONA_PARAM};
pub use runtime::{build_provider, open_store, AdvisoryRuntime, RuntimeBuilder, ACTION_EVALUATE};
