//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! HubConfig::new(authenticator, spawner)
//!     → with_* overrides (bind address, db url, admin users)
//!     → validation.rs (semantic checks)
//!     → HubConfig (validated, immutable)
//!     → moved into the hub's background thread
//! ```
//!
//! # Design Decisions
//! - Config is built in code; there is no file loader
//! - All plain fields have defaults to allow minimal configs
//! - Capability variants are trait objects chosen at construction

pub mod schema;
pub mod validation;

pub use schema::DatabaseConfig;
pub use schema::HubConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use validation::{validate_config, ValidationError};
