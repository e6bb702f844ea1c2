//! Shared utilities for integration testing.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use hub_harness::observability::logging;
use hub_harness::{HubController, MockHub};

/// A mock hub persisting into `dir`, launching the in-repo worker.
///
/// Installs the log subscriber on first use; later calls leave it alone.
pub fn mock_hub(dir: &Path) -> HubController {
    let hub = MockHub::new()
        .db_path(dir.join("hub.json"))
        .worker(env!("CARGO_BIN_EXE_mock-worker"))
        .build()
        .unwrap();
    let _ = logging::init(&hub.config().observability.log_level);
    hub
}

/// Drive an async block from a plain test thread.
///
/// The controller blocks on the hub thread, so tests stay synchronous and
/// only the HTTP client runs on a runtime.
#[allow(dead_code)]
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// HTTP client that never pools or proxies.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Poll `url` until it answers, or give up after a few seconds.
#[allow(dead_code)]
pub async fn wait_for(client: &reqwest::Client, url: &str) -> reqwest::Response {
    for _ in 0..50 {
        if let Ok(res) = client.get(url).send().await {
            return res;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{url} never became reachable");
}
