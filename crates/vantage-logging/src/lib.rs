//! Process-wide `tracing` setup. The console layer honours `RUST_LOG`
//! (default `info`); `VANTAGE_AUDIT_LOG_ROLL=1` adds a rolling file that
//! only receives events on the advisory audit target.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

pub use vantage_protocol::AUDIT_TARGET;

static AUDIT_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuditRotation {
    #[default]
    Daily,
    Hourly,
    Minutely,
}

impl AuditRotation {
    pub fn from_slug(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hourly" => AuditRotation::Hourly,
            "minutely" => AuditRotation::Minutely,
            _ => AuditRotation::Daily,
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            AuditRotation::Daily => Rotation::DAILY,
            AuditRotation::Hourly => Rotation::HOURLY,
            AuditRotation::Minutely => Rotation::MINUTELY,
        }
    }
}

/// Where the rolling audit file goes, read from `VANTAGE_AUDIT_LOG_*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditLogSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: AuditRotation,
}

impl AuditLogSettings {
    /// `None` unless `VANTAGE_AUDIT_LOG_ROLL` is `1`.
    pub fn from_env() -> Option<Self> {
        if std::env::var("VANTAGE_AUDIT_LOG_ROLL").ok().as_deref() != Some("1") {
            return None;
        }
        let dir = std::env::var("VANTAGE_AUDIT_LOG_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "logs".to_string());
        let prefix = std::env::var("VANTAGE_AUDIT_LOG_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "advisory-audit".into());
        let rotation = std::env::var("VANTAGE_AUDIT_LOG_ROTATION")
            .map(|r| AuditRotation::from_slug(&r))
            .unwrap_or_default();
        Some(Self {
            dir: PathBuf::from(dir),
            prefix,
            rotation,
        })
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_writer(std::io::stderr).with_filter(filter);
    let registry = tracing_subscriber::registry().with(console);

    match AuditLogSettings::from_env().and_then(audit_writer) {
        Some(writer) => {
            let (nb, guard) = tracing_appender::non_blocking(writer);
            let _ = AUDIT_GUARD.set(guard);
            let audit_layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(nb)
                .with_filter(audit_targets());
            let _ = registry.with(audit_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}

fn audit_targets() -> Targets {
    Targets::new().with_target(AUDIT_TARGET, tracing::Level::INFO)
}

fn audit_writer(settings: AuditLogSettings) -> Option<RollingFileAppender> {
    if std::fs::create_dir_all(&settings.dir).is_err() {
        eprintln!(
            "vantage: failed to create audit log directory {}",
            settings.dir.display()
        );
        return None;
    }
    RollingFileAppender::builder()
        .rotation(settings.rotation.rotation())
        .filename_prefix(&settings.prefix)
        .filename_suffix("log")
        .build(&settings.dir)
        .map_err(|err| eprintln!("vantage: audit log disabled: {err}"))
        .ok()
}
