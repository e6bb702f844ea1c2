//! Local process spawner.
//!
//! Launches workers on this host as the user's own account.

use std::path::{Path, PathBuf};

use super::{Env, Privileges, SpawnError, Spawner};
use crate::auth::accounts::{self, Account};

/// Worker command used when none is configured.
pub const DEFAULT_CMD: &str = "hub-singleuser";

/// Spawns workers as local processes owned by the user's host account.
#[derive(Debug, Clone)]
pub struct LocalProcessSpawner {
    cmd: Vec<String>,
    passwd: PathBuf,
}

impl LocalProcessSpawner {
    /// Create a spawner with the default command.
    pub fn new() -> Self {
        Self {
            cmd: vec![DEFAULT_CMD.to_string()],
            passwd: PathBuf::from(accounts::PASSWD_PATH),
        }
    }

    /// Replace the worker command.
    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Read accounts from a different `passwd(5)` file.
    pub fn with_passwd(mut self, path: impl AsRef<Path>) -> Self {
        self.passwd = path.as_ref().to_path_buf();
        self
    }

    fn account(&self, user: &str) -> Result<Account, SpawnError> {
        accounts::lookup_in(&self.passwd, user)
            .map_err(|source| SpawnError::AccountLookup {
                user: user.to_string(),
                source,
            })?
            .ok_or_else(|| SpawnError::UnknownUser(user.to_string()))
    }
}

impl Default for LocalProcessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for LocalProcessSpawner {
    fn cmd(&self) -> Vec<String> {
        self.cmd.clone()
    }

    fn user_env(&self, user: &str, mut env: Env) -> Result<Env, SpawnError> {
        let account = self.account(user)?;
        env.insert("USER".to_string(), account.name.clone());
        env.insert("LOGNAME".to_string(), account.name);
        env.insert("HOME".to_string(), account.home);
        env.insert("SHELL".to_string(), account.shell);
        Ok(env)
    }

    fn privileges(&self, user: &str) -> Result<Option<Privileges>, SpawnError> {
        let account = self.account(user)?;
        Ok(Some(Privileges {
            uid: account.uid,
            gid: account.gid,
        }))
    }

    fn user_changed(&self, old: Option<&str>, new: &str) {
        match self.account(new) {
            Ok(account) => tracing::debug!(
                old = ?old,
                user = %new,
                home = %account.home,
                "Spawner user changed"
            ),
            Err(e) => tracing::warn!(user = %new, error = %e, "Spawner user has no usable account"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawner::HubApi;

    fn spawner(dir: &Path) -> LocalProcessSpawner {
        let path = dir.join("passwd");
        std::fs::write(&path, "alice:x:1000:1001::/home/alice:/bin/sh\n").unwrap();
        LocalProcessSpawner::new().with_passwd(path)
    }

    #[test]
    fn test_user_env_adds_account_fields() {
        let dir = tempfile::tempdir().unwrap();
        let env = spawner(dir.path()).user_env("alice", Env::new()).unwrap();
        assert_eq!(env["USER"], "alice");
        assert_eq!(env["HOME"], "/home/alice");
        assert_eq!(env["SHELL"], "/bin/sh");
    }

    #[test]
    fn test_privileges_resolve_account_ids() {
        let dir = tempfile::tempdir().unwrap();
        let privileges = spawner(dir.path()).privileges("alice").unwrap();
        assert_eq!(privileges, Some(Privileges { uid: 1000, gid: 1001 }));
    }

    #[test]
    fn test_unknown_user_fails_launch() {
        let dir = tempfile::tempdir().unwrap();
        let api = HubApi {
            url: "http://127.0.0.1/hub/api".to_string(),
            token: "t".to_string(),
        };
        let result = spawner(dir.path()).launch_spec("bob", 9000, &api);
        assert!(matches!(result, Err(SpawnError::UnknownUser(u)) if u == "bob"));
    }

    #[test]
    fn test_default_command() {
        assert_eq!(LocalProcessSpawner::default().cmd(), [DEFAULT_CMD]);
        let custom = LocalProcessSpawner::new().with_cmd(["worker", "-v"]);
        assert_eq!(custom.cmd(), ["worker", "-v"]);
    }
}
