//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the hub.
//! The plain settings derive Serde traits; the capability variants are
//! injected as trait objects when the config is constructed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::spawner::Spawner;

/// Root configuration for the hub.
///
/// Built with [`HubConfig::new`] and refined with the `with_*` methods.
/// Every field not named in the constructor starts at its documented default.
#[derive(Clone)]
pub struct HubConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Persistence settings.
    pub database: DatabaseConfig,

    /// Identities granted the admin role at startup.
    ///
    /// Default: empty.
    pub admin_users: BTreeSet<String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Selected authenticator variant.
    pub authenticator: Arc<dyn Authenticator>,

    /// Selected spawner variant.
    pub spawner: Arc<dyn Spawner>,
}

impl HubConfig {
    /// Create a configuration with the given capability variants and
    /// defaults for everything else.
    pub fn new(authenticator: Arc<dyn Authenticator>, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            listener: ListenerConfig::default(),
            database: DatabaseConfig::default(),
            admin_users: BTreeSet::new(),
            observability: ObservabilityConfig::default(),
            authenticator,
            spawner,
        }
    }

    /// Set the address the hub binds to.
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.listener.bind_address = bind_address.into();
        self
    }

    /// Set the persistence URL.
    pub fn with_db_url(mut self, url: impl Into<String>) -> Self {
        self.database.url = url.into();
        self
    }

    /// Replace the admin identity set.
    pub fn with_admin_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default log filter.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.observability.log_level = level.into();
        self
    }

    /// Replace the authenticator variant.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Replace the spawner variant.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("listener", &self.listener)
            .field("database", &self.database)
            .field("admin_users", &self.admin_users)
            .field("observability", &self.observability)
            .finish_non_exhaustive()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Store URL: `file:///absolute/path.json` or `memory:`.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "file:///var/lib/hub/hub.json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
