use clap::Parser;
use herd::core::THRESHOLDS_BREACHED_EXIT_CODE;
use loadtest::{Args, DEFAULT_LOG_FILTER};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    match loadtest::run(args).await {
        Ok(summary) if summary.passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(THRESHOLDS_BREACHED_EXIT_CODE),
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
