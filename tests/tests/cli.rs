mod utils;
#[allow(unused)]
use utils::*;

use clap::Parser;
use loadtest::Args;
use mock_service::MockConfig;

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn run_exports_the_summary() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();
    let export = std::env::temp_dir().join(format!("herd-tests-{}.json", std::process::id()));

    let args = Args::try_parse_from([
        "orders-api-load",
        "--api-url",
        url.as_str(),
        "--vus",
        "2",
        "--duration",
        "300ms",
        "--pause",
        "10ms",
        "--summary-export",
        export.to_str().unwrap(),
    ])
    .unwrap();
    let summary = loadtest::run(args).await.unwrap();
    assert!(summary.passed());

    let exported: herd::core::RunSummary =
        serde_json::from_reader(std::fs::File::open(&export).unwrap()).unwrap();
    assert_eq!(exported.http_reqs.count, summary.http_reqs.count);
    assert_eq!(exported.thresholds.len(), 2);
    std::fs::remove_file(export).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn breached_threshold_is_reported() {
    init();
    let (url, _) = mock(MockConfig::default()).await.unwrap();

    let args = Args::try_parse_from([
        "orders-api-load",
        "--api-url",
        url.as_str(),
        "--vus",
        "1",
        "--duration",
        "200ms",
        "--pause",
        "10ms",
        "--threshold",
        "http_reqs:count>100000",
    ])
    .unwrap();
    let summary = loadtest::run(args).await.unwrap();
    assert!(!summary.passed());
}
