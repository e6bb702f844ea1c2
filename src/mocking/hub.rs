//! A hub controller wired with the capability doubles.
//!
//! Defaults:
//! - bound to `127.0.0.1:0` (local-only, ephemeral port)
//! - admin set `{"admin"}`
//! - store file at [`default_db_path`], removed on start and stop
//! - the baseline user `"user"` seeded before readiness
//!
//! Tests that run concurrently should each pass their own `db_path`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::auth::MockPamAuthenticator;
use super::spawner::MockSpawner;
use crate::config::HubConfig;
use crate::db::{DbError, StoreLocation};
use crate::lifecycle::{BaselineSeeder, HubController, DEFAULT_STARTUP_TIMEOUT};

/// Admin identity injected into every mock hub.
pub const MOCK_ADMIN: &str = "admin";

/// Local-only bind address used by the mock hub.
pub const MOCK_BIND_ADDRESS: &str = "127.0.0.1:0";

/// Fixed harness-local store location.
pub fn default_db_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("mock-hub.json")
}

/// Builder for a [`HubController`] running the doubles.
#[derive(Debug, Clone)]
pub struct MockHub {
    db_path: PathBuf,
    admin_users: Vec<String>,
    worker: Option<PathBuf>,
    startup_timeout: Duration,
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            db_path: default_db_path(),
            admin_users: vec![MOCK_ADMIN.to_string()],
            worker: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Persist to `path` instead of the shared default.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Replace the admin set.
    pub fn admin_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Launch this worker executable instead of the located one.
    pub fn worker(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker = Some(path.into());
        self
    }

    /// Bound the readiness wait.
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// The hub configuration this harness runs.
    pub fn config(&self) -> Result<HubConfig, DbError> {
        let spawner = match &self.worker {
            Some(path) => MockSpawner::with_worker(path),
            None => MockSpawner::new(),
        };

        Ok(HubConfig::new(Arc::new(MockPamAuthenticator::new()), Arc::new(spawner))
            .with_bind_address(MOCK_BIND_ADDRESS)
            .with_db_url(StoreLocation::file_url(&self.db_path)?)
            .with_admin_users(self.admin_users.iter().cloned()))
    }

    /// Build the controller. Nothing is started yet.
    pub fn build(self) -> Result<HubController, DbError> {
        Ok(HubController::new(self.config()?)
            .with_seeder(BaselineSeeder::default())
            .with_startup_timeout(self.startup_timeout))
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}
