//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! hub, controller and worker produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (user, address, state)
//! - The library never installs a metrics recorder; embedders choose one

pub mod logging;
pub mod metrics;
