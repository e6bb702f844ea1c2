//! Test doubles for the hub's capabilities and a pre-wired harness.
//!
//! The doubles keep the production control flow and replace only the
//! steps that need privileges or real credentials.

pub mod auth;
pub mod hub;
pub mod spawner;

pub use auth::{mock_authenticate, MockPamAuthenticator, NONEXISTENT_PREFIX};
pub use hub::{default_db_path, MockHub, MOCK_ADMIN};
pub use spawner::{locate_worker, MockSpawner, WORKER_BIN};
