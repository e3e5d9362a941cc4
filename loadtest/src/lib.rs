//! Load test for the orders API: health, customer list and order list, once per iteration.
pub mod cli;
pub mod orders;

pub use cli::{run, Args};
pub use orders::{AuthSource, OrdersApi, OrdersContext, Step, STEPS};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "herd=info,orders_api_load=info,loadtest=info";
