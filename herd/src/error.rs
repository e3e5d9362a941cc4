use herd_core::ConfigError;
use thiserror::Error;

/// Errors a scenario may return from `setup` or `teardown`.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{0}")]
    Other(String),
}

impl ScenarioError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors which prevent a run from producing a summary.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid run configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Scenario setup failed: {0}")]
    Setup(#[source] ScenarioError),
}
