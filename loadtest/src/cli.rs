//! Command line for `orders-api-load`.
use crate::orders::{AuthSource, OrdersApi, DEFAULT_API_URL, PLACEHOLDER_TOKEN};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use herd::core::{ConfigError, MetricName, RunConfig, RunSummary, Threshold};
use herd::http::Client;
use herd::LoadTest;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const RUN_NAME: &str = "orders_api";

/// Used unless at least one `--threshold` is given.
pub const DEFAULT_THRESHOLDS: [(MetricName, &str); 2] = [
    (MetricName::HttpReqDuration, "p(95)<500"),
    (MetricName::HttpReqFailed, "rate<0.01"),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuthMode {
    /// Send `--token` as the bearer token.
    Static,
    /// Request a token from the API's `/oauth/token` endpoint during setup.
    TokenEndpoint,
}

#[derive(Parser, Debug)]
#[command(name = "orders-api-load", version, about = "Load test for the orders API")]
pub struct Args {
    /// Base URL of the API under test.
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token for the list endpoints. A leading `Bearer ` is accepted and stripped.
    #[arg(long, env = "API_TOKEN", default_value = PLACEHOLDER_TOKEN, hide_env_values = true)]
    pub token: String,

    #[arg(long, value_enum, default_value_t = AuthMode::Static)]
    pub auth: AuthMode,

    #[arg(long, default_value_t = herd::core::DEFAULT_VUS)]
    pub vus: NonZeroUsize,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    pub duration: Duration,

    /// `metric:expression`, e.g. `http_req_duration:p(95)<500`. Repeatable; replaces the defaults.
    #[arg(long = "threshold")]
    pub thresholds: Vec<Threshold>,

    /// Write the run summary as JSON.
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    #[arg(long)]
    pub max_rps: Option<NonZeroU32>,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    pub graceful_stop: Duration,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "60s")]
    pub request_timeout: Duration,

    /// Think time after each request.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub pause: Duration,

    /// Serve Prometheus metrics on this address while the run is in progress.
    #[arg(long)]
    pub prometheus: Option<SocketAddr>,
}

impl Args {
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let thresholds = if self.thresholds.is_empty() {
            default_thresholds()?
        } else {
            self.thresholds.clone()
        };

        let mut config = RunConfig::new(RUN_NAME);
        config.vus = self.vus;
        config.duration = self.duration;
        config.thresholds = thresholds;
        config.graceful_stop = self.graceful_stop;
        config.max_rps = self.max_rps;
        Ok(config)
    }

    pub fn auth_source(&self) -> AuthSource {
        match self.auth {
            AuthMode::Static => AuthSource::Static(self.token.clone()),
            AuthMode::TokenEndpoint => AuthSource::TokenEndpoint,
        }
    }

    pub fn scenario(&self) -> anyhow::Result<OrdersApi> {
        let client = Client::new(self.request_timeout).context("Failed to build HTTP client")?;
        Ok(OrdersApi::new(client, &self.api_url)
            .auth(self.auth_source())
            .pause(self.pause))
    }
}

pub fn default_thresholds() -> Result<Vec<Threshold>, ConfigError> {
    DEFAULT_THRESHOLDS
        .iter()
        .map(|(metric, expr)| Threshold::parse(*metric, expr))
        .collect()
}

/// Run the load test described by `args`, print the summary and optionally export it.
pub async fn run(args: Args) -> anyhow::Result<RunSummary> {
    if let Some(addr) = args.prometheus {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start Prometheus exporter")?;
        info!("Serving metrics on http://{addr}/metrics");
    }

    let config = args.run_config()?;
    let scenario = args.scenario()?;
    info!("Target: {}", scenario.api_url());

    let summary = LoadTest::with_config(scenario, config).await?;
    println!("{summary}");

    if let Some(path) = &args.summary_export {
        export_summary(&summary, path)?;
        info!("Summary written to {}", path.display());
    }

    Ok(summary)
}

fn export_summary(summary: &RunSummary, path: &PathBuf) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(())
}
