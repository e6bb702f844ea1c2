//! Registry of running workers.
//!
//! # Responsibilities
//! - Launch one worker per user through the configured spawner
//! - Own each child process (killed on drop)
//! - Stop single workers or all of them at hub shutdown

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::io;
use std::sync::Mutex;
use tokio::process::Child;
use uuid::Uuid;

use crate::observability::metrics;
use crate::spawner::{HubApi, SpawnError, Spawner};

/// Public view of a running worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub port: u16,
    pub pid: Option<u32>,
}

struct RunningServer {
    child: Child,
    port: u16,
}

/// Workers started by this hub, keyed by user name.
#[derive(Default)]
pub struct ServerRegistry {
    servers: DashMap<String, RunningServer>,
    last_user: Mutex<Option<String>>,
}

impl ServerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch a worker for `user`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        &self,
        user: &str,
        spawner: &dyn Spawner,
        api_url: &str,
    ) -> Result<ServerInfo, SpawnError> {
        let slot = match self.servers.entry(user.to_string()) {
            Entry::Occupied(_) => {
                metrics::record_spawn("conflict");
                return Err(SpawnError::AlreadyRunning(user.to_string()));
            }
            Entry::Vacant(slot) => slot,
        };

        self.notify_user(spawner, user);

        let port = random_port()?;
        let api = HubApi {
            url: api_url.to_string(),
            token: Uuid::new_v4().simple().to_string(),
        };

        let spec = spawner.launch_spec(user, port, &api).inspect_err(|_| {
            metrics::record_spawn("failure");
        })?;
        let child = spec.command().spawn().inspect_err(|_| {
            metrics::record_spawn("failure");
        })?;

        let info = ServerInfo {
            name: user.to_string(),
            port,
            pid: child.id(),
        };
        slot.insert(RunningServer { child, port });

        tracing::info!(user = %user, port, pid = ?info.pid, program = %spec.program, "Worker started");
        metrics::record_spawn("success");
        Ok(info)
    }

    /// Stop the worker for `user`.
    pub async fn stop(&self, user: &str) -> Result<(), SpawnError> {
        let (_, mut server) = self
            .servers
            .remove(user)
            .ok_or_else(|| SpawnError::NotRunning(user.to_string()))?;

        server.child.kill().await?;
        tracing::info!(user = %user, port = server.port, "Worker stopped");
        Ok(())
    }

    /// Stop every worker. Failures are logged and skipped.
    pub async fn stop_all(&self) {
        let users: Vec<String> = self.servers.iter().map(|e| e.key().clone()).collect();
        for user in users {
            if let Err(e) = self.stop(&user).await {
                tracing::warn!(user = %user, error = %e, "Failed to stop worker");
            }
        }
    }

    /// Whether `user` has a running worker.
    pub fn contains(&self, user: &str) -> bool {
        self.servers.contains_key(user)
    }

    /// The port of `user`'s worker.
    pub fn port(&self, user: &str) -> Option<u16> {
        self.servers.get(user).map(|s| s.port)
    }

    /// Number of running workers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether no workers are running.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    fn notify_user(&self, spawner: &dyn Spawner, user: &str) {
        let mut last = self
            .last_user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_deref() != Some(user) {
            spawner.user_changed(last.as_deref(), user);
            *last = Some(user.to_string());
        }
    }
}

/// Pick a free local port.
fn random_port() -> io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawner::{Env, Privileges};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recording {
        changes: Mutex<Vec<(Option<String>, String)>>,
        cmd: Vec<String>,
    }

    impl Spawner for Recording {
        fn cmd(&self) -> Vec<String> {
            self.cmd.clone()
        }

        fn user_env(&self, _user: &str, env: Env) -> Result<Env, SpawnError> {
            Ok(env)
        }

        fn privileges(&self, _user: &str) -> Result<Option<Privileges>, SpawnError> {
            Ok(None)
        }

        fn user_changed(&self, old: Option<&str>, new: &str) {
            self.changes
                .lock()
                .unwrap()
                .push((old.map(str::to_string), new.to_string()));
        }
    }

    #[test]
    fn test_random_port_is_nonzero() {
        assert_ne!(random_port().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_no_entry() {
        let registry = ServerRegistry::new();
        let spawner = Recording::default();

        let result = registry.spawn("alice", &spawner, "http://127.0.0.1/hub/api");
        assert!(matches!(result, Err(SpawnError::EmptyCommand)));
        assert!(!registry.contains("alice"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_user_change_is_observed_once_per_switch() {
        let registry = ServerRegistry::new();
        let spawner = Arc::new(Recording::default());

        let _ = registry.spawn("alice", spawner.as_ref(), "");
        let _ = registry.spawn("alice", spawner.as_ref(), "");
        let _ = registry.spawn("bob", spawner.as_ref(), "");

        let changes = spawner.changes.lock().unwrap().clone();
        assert_eq!(
            changes,
            [
                (None, "alice".to_string()),
                (Some("alice".to_string()), "bob".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_unknown_worker() {
        let registry = ServerRegistry::new();
        assert!(matches!(
            registry.stop("ghost").await,
            Err(SpawnError::NotRunning(u)) if u == "ghost"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_stop_process() {
        let registry = ServerRegistry::new();
        let spawner = Recording {
            cmd: vec!["/bin/sh".into(), "-c".into(), "sleep 30".into(), "worker".into()],
            ..Default::default()
        };

        let info = registry.spawn("alice", &spawner, "").unwrap();
        assert_eq!(info.name, "alice");
        assert!(info.pid.is_some());
        assert_eq!(registry.port("alice"), Some(info.port));

        assert!(matches!(
            registry.spawn("alice", &spawner, ""),
            Err(SpawnError::AlreadyRunning(_))
        ));

        registry.stop_all().await;
        assert!(registry.is_empty());
    }
}
