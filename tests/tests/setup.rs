mod utils;
#[allow(unused)]
use utils::*;

use herd::prelude::*;
use loadtest::AuthSource;
use mock_service::MockConfig;
use std::time::Duration;

// No `init()` here: `traced_test` installs its own subscriber to capture logs.

#[tracing_test::traced_test]
#[tokio::test]
#[ntest::timeout(10_000)]
async fn token_endpoint_failure_is_logged_and_starts_no_vus() {
    let config = MockConfig {
        disable_tokens: true,
        ..Default::default()
    };
    let (url, state) = mock(config).await.unwrap();

    let scenario =
        orders_api(&url, Duration::from_millis(10)).auth(AuthSource::TokenEndpoint);
    let err = LoadTest::new("no-token", scenario).await.unwrap_err();

    assert!(matches!(err, HarnessError::Setup(_)));
    assert!(logs_contain("Setup failed, no VUs were started"));
    assert!(logs_contain("Unexpected status 503"));
    assert!(!logs_contain("Finished load test"));
    assert_eq!(state.requests(), ["POST /oauth/token"]);
}
