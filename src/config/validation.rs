//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of settings the type system cannot express
//! - Check the bind address and database URL are usable
//! - Reject blank admin identities
//!
//! Returns every problem found, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::HubConfig;
use crate::db::StoreLocation;

/// A single semantic problem with a [`HubConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The listener address is not a socket address.
    #[error("invalid bind address `{address}`: {reason}")]
    BindAddress { address: String, reason: String },

    /// The database URL cannot be opened.
    #[error("invalid database url `{url}`: {reason}")]
    DatabaseUrl { url: String, reason: String },

    /// An admin identity is empty or whitespace.
    #[error("admin user names must not be blank")]
    BlankAdminUser,
}

/// Validate a configuration before the hub accepts it.
pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::BindAddress {
            address: config.listener.bind_address.clone(),
            reason: e.to_string(),
        });
    }

    if let Err(e) = StoreLocation::parse(&config.database.url) {
        errors.push(ValidationError::DatabaseUrl {
            url: config.database.url.clone(),
            reason: e.to_string(),
        });
    }

    if config.admin_users.iter().any(|name| name.trim().is_empty()) {
        errors.push(ValidationError::BlankAdminUser);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
