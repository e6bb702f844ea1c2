//! Worker spawning capability.
//!
//! # Data Flow
//! ```text
//! hub asked to start a worker for `user`
//!     → user_changed(old, user)
//!     → launch_spec: cmd + args, base_env → user_env, privileges
//!     → LaunchSpec::command (tokio Command, env replaced, uid/gid on unix)
//!     → ServerRegistry owns the child
//! ```
//!
//! # Design Decisions
//! - `launch_spec` is a provided method with a fixed step order; variants
//!   override individual steps, never the sequence
//! - Building the command is separate from running it

pub mod local;

pub use local::LocalProcessSpawner;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::process::Stdio;
use thiserror::Error;

/// Environment passed to a worker.
pub type Env = BTreeMap<String, String>;

/// Host variables copied into every worker environment when set.
pub const ENV_KEEP: &[&str] = &["PATH", "LANG", "LC_ALL"];

/// Errors raised while preparing or managing workers.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The configured launch command is empty.
    #[error("worker command is empty")]
    EmptyCommand,

    /// The user has no host account.
    #[error("no host account for user `{0}`")]
    UnknownUser(String),

    /// The account database could not be read.
    #[error("account lookup for `{user}` failed: {source}")]
    AccountLookup {
        user: String,
        #[source]
        source: io::Error,
    },

    /// Starting or stopping the process failed.
    #[error("worker process error: {0}")]
    Process(#[from] io::Error),

    /// The user already has a running worker.
    #[error("worker for `{0}` is already running")]
    AlreadyRunning(String),

    /// The user has no running worker.
    #[error("no worker running for `{0}`")]
    NotRunning(String),
}

/// Identity a worker process switches to before exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Privileges {
    pub uid: u32,
    pub gid: u32,
}

/// How a worker reaches back to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubApi {
    /// Base URL of the hub API.
    pub url: String,
    /// Token identifying this worker to the hub.
    pub token: String,
}

/// A fully prepared worker launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Env,
    pub privileges: Option<Privileges>,
}

impl LaunchSpec {
    /// Build the process command. The environment is replaced, not inherited.
    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            if let Some(privileges) = self.privileges {
                cmd.uid(privileges.uid).gid(privileges.gid);
            }
        }

        cmd
    }
}

/// Pluggable worker launcher.
pub trait Spawner: Send + Sync {
    /// The worker executable and its fixed leading arguments.
    fn cmd(&self) -> Vec<String>;

    /// Per-launch arguments.
    fn args(&self, user: &str, port: u16) -> Vec<String> {
        vec![format!("--user={user}"), format!("--port={port}")]
    }

    /// Environment every worker starts from.
    fn base_env(&self, user: &str, api: &HubApi) -> Env {
        let mut env: Env = ENV_KEEP
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        env.insert("HUB_USER".to_string(), user.to_string());
        env.insert("HUB_API_URL".to_string(), api.url.clone());
        env.insert("HUB_API_TOKEN".to_string(), api.token.clone());
        env
    }

    /// Adjust the environment for `user`.
    fn user_env(&self, user: &str, env: Env) -> Result<Env, SpawnError>;

    /// Resolve the identity the worker should drop to, if any.
    fn privileges(&self, user: &str) -> Result<Option<Privileges>, SpawnError>;

    /// Observer for changes to the user this spawner is acting for.
    fn user_changed(&self, old: Option<&str>, new: &str);

    /// Assemble the complete launch for `user` on `port`.
    fn launch_spec(&self, user: &str, port: u16, api: &HubApi) -> Result<LaunchSpec, SpawnError> {
        let mut cmd = self.cmd().into_iter();
        let program = cmd.next().ok_or(SpawnError::EmptyCommand)?;
        let mut args: Vec<String> = cmd.collect();
        args.extend(self.args(user, port));

        let env = self.user_env(user, self.base_env(user, api))?;
        let privileges = self.privileges(user)?;

        Ok(LaunchSpec {
            program,
            args,
            env,
            privileges,
        })
    }
}
