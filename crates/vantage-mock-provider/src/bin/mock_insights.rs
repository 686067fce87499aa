use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};
use vantage_mock_provider::{router, MockBehavior};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let env_u64 = |key: &str, default: u64| -> u64 {
        env::var(key)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(default)
    };
    let behavior = MockBehavior {
        fail_first: env_u64("VANTAGE_MOCK_FAIL_FIRST", 0) as u32,
        failure_status: env_u64("VANTAGE_MOCK_FAILURE_STATUS", 503) as u16,
        delay: Duration::from_millis(env_u64("VANTAGE_MOCK_DELAY_MS", 0)),
        error: env::var("VANTAGE_MOCK_ERROR").ok().filter(|s| !s.is_empty()),
    };
    let (app, _hits) = router(behavior);

    let port = env_u64("VANTAGE_MOCK_PORT", 8095) as u16;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("mock insight server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
