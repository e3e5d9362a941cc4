mod utils;
#[allow(unused)]
use utils::*;

use herd::prelude::*;
use loadtest::{cli::default_thresholds, AuthSource, STEPS};
use mock_service::MockConfig;
use std::num::NonZeroUsize;
use std::time::Duration;

const HEALTH: &str = "health check status is 200";
const CUSTOMERS: &str = "customers list status is 200 or 401";
const ORDERS: &str = "orders list status is 200 or 401";

fn vus(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn every_iteration_requests_the_three_endpoints_in_order() {
    init();
    let (url, state) = mock(MockConfig::default()).await.unwrap();

    let summary = LoadTest::new("order", orders_api(&url, Duration::from_millis(10)))
        .vus(vus(1))
        .duration(Duration::from_millis(300))
        .await
        .unwrap();

    let requests = state.requests();
    assert!(summary.iterations.count >= 2);
    assert_eq!(requests.len() as u64, summary.iterations.count * 3);
    assert_eq!(summary.http_reqs.count, summary.iterations.count * 3);
    for iteration in requests.chunks(3) {
        let paths: Vec<_> = iteration.iter().map(|r| r.trim_start_matches("GET ")).collect();
        assert_eq!(paths, STEPS.map(|s| s.path));
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn placeholder_token_is_rejected_but_checks_pass() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();

    let summary = LoadTest::new("placeholder", orders_api(&url, Duration::from_millis(10)))
        .vus(vus(2))
        .duration(Duration::from_millis(300))
        .thresholds(default_thresholds().unwrap())
        .await
        .unwrap();

    for name in [HEALTH, CUSTOMERS, ORDERS] {
        let check = summary.check(name).unwrap();
        assert!(check.all_passed(), "{name}: {check:?}");
    }
    assert_eq!(summary.checks.len(), 3);
    assert_eq!(summary.http_req_failed.trues, 0);
    assert_eq!(summary.http_req_failed.rate, 0.);
    assert!(summary.passed());
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn issued_token_is_accepted() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();

    let scenario =
        orders_api(&url, Duration::from_millis(10)).auth(AuthSource::TokenEndpoint);
    let summary = LoadTest::new("token", scenario)
        .vus(vus(2))
        .duration(Duration::from_millis(300))
        .threshold("checks:rate==1".parse().unwrap())
        .await
        .unwrap();

    assert!(summary.passed());
    assert_eq!(summary.http_req_failed.trues, 0);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn unreachable_api_fails_checks_and_keeps_iterating() {
    init();
    let url = dead_url().await.unwrap();

    let summary = LoadTest::new("unreachable", orders_api(&url, Duration::from_millis(10)))
        .vus(vus(1))
        .duration(Duration::from_millis(300))
        .thresholds(default_thresholds().unwrap())
        .await
        .unwrap();

    assert!(summary.iterations.count >= 2);
    for name in [HEALTH, CUSTOMERS, ORDERS] {
        let check = summary.check(name).unwrap();
        assert_eq!(check.passes, 0);
        assert_eq!(check.fails, summary.iterations.count);
    }
    assert_eq!(summary.http_req_failed.rate, 1.);
    assert!(!summary.passed());
    assert_eq!(summary.breached().count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn all_vus_run_concurrently() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();

    let summary = LoadTest::new("vus", orders_api(&url, Duration::from_millis(50)))
        .vus(vus(5))
        .duration(Duration::from_millis(400))
        .await
        .unwrap();

    assert_eq!(summary.vus, 5);
    assert_eq!(summary.vus_max, 5);
    assert!(summary.iterations.count >= 5);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn iterations_include_a_pause_after_every_step() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();

    let summary = LoadTest::new("pause", orders_api(&url, Duration::from_millis(50)))
        .vus(vus(2))
        .duration(Duration::from_millis(500))
        .await
        .unwrap();

    let iteration = summary.iteration_duration.unwrap();
    assert!(iteration.min >= 150., "{iteration:?}");
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn slow_api_breaches_latency_threshold() {
    init();
    let config = MockConfig {
        latency: Duration::from_millis(100),
        ..Default::default()
    };
    let (url, _) = mock(config).await.unwrap();

    let summary = LoadTest::new("slow", orders_api(&url, Duration::ZERO))
        .vus(vus(2))
        .duration(Duration::from_millis(500))
        .threshold("http_req_duration:p(95)<50".parse().unwrap())
        .threshold("http_req_failed:rate<0.01".parse().unwrap())
        .await
        .unwrap();

    let breached: Vec<_> = summary
        .breached()
        .map(|o| o.threshold.metric())
        .collect();
    assert_eq!(breached, [MetricName::HttpReqDuration]);
    assert!(summary.http_req_duration.unwrap().min >= 100.);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn rate_limited_api_counts_as_failures() {
    init();
    let config = MockConfig {
        max_rps: std::num::NonZeroU32::new(5),
        ..Default::default()
    };
    let (url, _) = mock(config).await.unwrap();

    let summary = LoadTest::new("limited", orders_api(&url, Duration::ZERO))
        .vus(vus(2))
        .duration(Duration::from_millis(500))
        .thresholds(default_thresholds().unwrap())
        .await
        .unwrap();

    assert!(summary.http_req_failed.trues > 0);
    assert!(!summary.passed());
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn token_endpoint_failure_aborts_before_any_iteration() {
    init();
    let config = MockConfig {
        disable_tokens: true,
        ..Default::default()
    };
    let (url, state) = mock(config).await.unwrap();

    let scenario =
        orders_api(&url, Duration::from_millis(10)).auth(AuthSource::TokenEndpoint);
    let err = LoadTest::new("no-token", scenario).await.unwrap_err();

    assert!(matches!(err, HarnessError::Setup(_)));
    assert_eq!(state.requests(), ["POST /oauth/token"]);
}

#[cfg(feature = "integration")]
mod full_length {
    use super::*;
    use herd::core::DEFAULT_DURATION;

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(90_000)]
    async fn default_run_against_a_healthy_api() {
        init();
        let (url, _) = mock(MockConfig::default()).await.unwrap();

        let summary = LoadTest::new("orders_api", orders_api(&url, loadtest::orders::DEFAULT_PAUSE))
            .thresholds(default_thresholds().unwrap())
            .await
            .unwrap();

        assert_eq!(summary.vus_max, 10);
        assert!(summary.elapsed >= DEFAULT_DURATION);
        // Each iteration takes a little over 3s, so each VU completes about 10.
        assert!(summary.iterations.count >= 90, "{}", summary.iterations.count);
        assert!(summary.passed(), "{summary}");
    }
}
