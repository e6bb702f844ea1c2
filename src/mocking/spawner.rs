//! Spawner double.

use std::io;
use std::path::{Path, PathBuf};

use crate::spawner::{Env, LocalProcessSpawner, Privileges, SpawnError, Spawner};

/// File name of the in-repo stand-in worker.
pub const WORKER_BIN: &str = "mock-worker";

/// Find the stand-in worker next to the running executable.
///
/// Test binaries live one level below the other build outputs (`deps/`),
/// so that directory is skipped.
pub fn locate_worker() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let mut dir = exe
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"))?;
    if dir.ends_with("deps") {
        dir.pop();
    }
    Ok(dir.join(format!("{WORKER_BIN}{}", std::env::consts::EXE_SUFFIX)))
}

/// [`LocalProcessSpawner`] that launches the stand-in worker without
/// touching accounts or privileges.
pub struct MockSpawner {
    inner: LocalProcessSpawner,
}

impl MockSpawner {
    /// Use the worker found by [`locate_worker`].
    pub fn new() -> Self {
        let worker = locate_worker().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not locate mock worker; relying on PATH");
            PathBuf::from(WORKER_BIN)
        });
        Self::with_worker(worker)
    }

    /// Use an explicit worker executable.
    pub fn with_worker(worker: impl AsRef<Path>) -> Self {
        let worker = worker.as_ref().to_string_lossy().into_owned();
        Self {
            inner: LocalProcessSpawner::new().with_cmd([worker]),
        }
    }
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for MockSpawner {
    fn cmd(&self) -> Vec<String> {
        self.inner.cmd()
    }

    fn user_env(&self, _user: &str, env: Env) -> Result<Env, SpawnError> {
        Ok(env)
    }

    fn privileges(&self, _user: &str) -> Result<Option<Privileges>, SpawnError> {
        Ok(None)
    }

    fn user_changed(&self, _old: Option<&str>, _new: &str) {}
}
