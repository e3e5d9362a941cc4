use std::num::NonZeroUsize;
use std::time::Duration;

/// The default number of virtual users
pub const DEFAULT_VUS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(10) };

/// The default length of a run
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);

/// How long in-flight iterations may keep running once the duration elapses
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Per-request timeout used by the instrumented HTTP client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between progress samples
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Process exit code used when at least one threshold is breached
pub const THRESHOLDS_BREACHED_EXIT_CODE: u8 = 99;
