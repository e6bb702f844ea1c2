//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! start (controller.rs):
//!     remove stale artifact → spawn hub thread → wait on readiness channel
//!
//! hub thread (startup.rs):
//!     build loop → Hub::initialize → Seeder (seed.rs) → report Ok(handle) → serve
//!                                 ↘ report Err(cause) on any failure
//!
//! stop (controller.rs, shutdown.rs):
//!     enqueue stop on the loop → join thread → remove artifact
//! ```
//!
//! # Design Decisions
//! - Readiness is a channel carrying either the handle or the failure
//! - One hub instance per controller; a second start is rejected
//! - Stop is only accepted once the hub is ready

pub mod controller;
pub mod seed;
pub mod shutdown;
pub mod startup;

pub use controller::{ControllerError, HubController, LifecycleState, DEFAULT_STARTUP_TIMEOUT};
pub use seed::{BaselineSeeder, Seeder, BASELINE_USER};
pub use shutdown::Shutdown;
pub use startup::{HubHandle, Readiness, THREAD_NAME};
