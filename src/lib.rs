//! Test harness for a multi-user hub.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller thread                         hub thread (current-thread tokio loop)
//!   ─────────────                         ───────────────────────────────────────
//!   HubController::start ──spawn──────▶   Hub::initialize
//!        │                                   config → store → admin users → bind
//!        │                                Seeder (baseline "user", committed)
//!        │   ◀──── Readiness: Ok(handle) ─ task on loop
//!        │         or Err(cause)          Hub::run (axum, /hub/api, /hub/login)
//!        ▼                                   │
//!   HubController::stop ──enqueue stop──▶    ▼ graceful shutdown, workers killed
//!        join ◀──────────────────────────  thread exits
//!        remove store artifact
//! ```
//!
//! Capabilities (`auth::Authenticator`, `spawner::Spawner`) are trait objects
//! in `config::HubConfig`; `mocking` supplies doubles for both and a
//! pre-wired `MockHub`.

// Capabilities
pub mod auth;
pub mod spawner;

// Server core
pub mod config;
pub mod db;
pub mod hub;

// Harness
pub mod lifecycle;
pub mod mocking;

// Cross-cutting concerns
pub mod observability;

pub use config::HubConfig;
pub use hub::Hub;
pub use lifecycle::{ControllerError, HubController, LifecycleState};
pub use mocking::MockHub;
