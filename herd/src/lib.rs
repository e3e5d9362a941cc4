#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod http;
pub mod scenario;

mod aggregate;
mod error;
mod recorder;
mod sampler;
mod thresholds;
mod vu;

pub use error::{HarnessError, ScenarioError};
pub use herd_core as core;
pub use load_test::{ConfigurableLoadTest, LoadTest};
pub use recorder::{check, vu_id};
pub use sampler::Measurement;
pub use scenario::Scenario;

pub mod prelude {
    pub use crate::error::{HarnessError, ScenarioError};
    pub use crate::http::{Client, ExpectedStatuses, HttpOutcome};
    pub use crate::load_test::{ConfigurableLoadTest, LoadTest};
    pub use crate::recorder::{check, vu_id};
    pub use crate::scenario::Scenario;

    pub use herd_core::{MetricName, RunConfig, RunSummary, Threshold};
}
