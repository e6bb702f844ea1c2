//! Stand-in worker launched by the mock spawner.
//!
//! Serves a fixed status page on `127.0.0.1:<port>` until interrupted.

use axum::{routing::get, Json, Router};
use clap::Parser;
use serde_json::json;
use std::net::{Ipv4Addr, SocketAddr};

use hub_harness::observability::logging;

#[derive(Parser)]
#[command(name = "mock-worker")]
#[command(about = "Harmless worker process for hub tests", long_about = None)]
struct Cli {
    /// User this worker runs for.
    #[arg(long, default_value = "user")]
    user: String,

    /// Local port to listen on.
    #[arg(long, default_value_t = 8888)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = logging::init("mock_worker=info,hub_harness=info");
    let cli = Cli::parse();

    let user = cli.user.clone();
    let app = Router::new()
        .route("/", get(|| async { "mock worker" }))
        .route(
            "/api/status",
            get(move || async move { Json(json!({ "user": user, "status": "running" })) }),
        );

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(user = %cli.user, address = %addr, "Mock worker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("Mock worker stopped");
    Ok(())
}
