use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=debug,tower_http=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;
    let latency_ms: u64 = std::env::var("MOCK_LATENCY_MS")
        .map(|v| v.parse::<u64>())
        .unwrap_or(Ok(0))?;

    if let Ok(metrics_addr) = std::env::var("MOCK_METRICS_ADDR") {
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr.parse::<SocketAddr>()?)
            .install()?;
    }

    let config = MockConfig {
        latency: Duration::from_millis(latency_ms),
        ..Default::default()
    };
    mock_service::run(addr, config).await
}
