//! Host account lookup.
//!
//! Reads the `passwd(5)` database. Only the fields the hub needs are kept.

use std::io;
use std::path::Path;

/// Default location of the account database.
pub const PASSWD_PATH: &str = "/etc/passwd";

/// A host account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
}

/// Parse `passwd(5)` formatted text. Malformed lines and comments are skipped.
pub fn parse(text: &str) -> Vec<Account> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Account> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split(':');
    let name = fields.next()?;
    let _password = fields.next()?;
    let uid = fields.next()?.parse().ok()?;
    let gid = fields.next()?.parse().ok()?;
    let _gecos = fields.next()?;
    let home = fields.next()?;
    let shell = fields.next().unwrap_or_default();

    if name.is_empty() {
        return None;
    }

    Some(Account {
        name: name.to_string(),
        uid,
        gid,
        home: home.to_string(),
        shell: shell.to_string(),
    })
}

/// Find an account by name in the database at `path`.
pub fn lookup_in(path: &Path, name: &str) -> io::Result<Option<Account>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse(&text).into_iter().find(|a| a.name == name))
}

/// Find an account by name in the system database.
pub fn lookup(name: &str) -> io::Result<Option<Account>> {
    lookup_in(Path::new(PASSWD_PATH), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# local accounts
root:x:0:0:root:/root:/bin/bash
alice:x:1000:1000:Alice,,,:/home/alice:/bin/zsh
broken:x:notanumber:1:::
nologin:x:65534:65534::/nonexistent
";

    #[test]
    fn test_parse_skips_malformed_lines() {
        let accounts = parse(SAMPLE);
        let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["root", "alice", "nologin"]);

        let alice = &accounts[1];
        assert_eq!(alice.uid, 1000);
        assert_eq!(alice.home, "/home/alice");
        assert_eq!(alice.shell, "/bin/zsh");
        assert_eq!(accounts[2].shell, "");
    }

    #[test]
    fn test_lookup_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passwd");
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(lookup_in(&path, "alice").unwrap().unwrap().gid, 1000);
        assert!(lookup_in(&path, "bob").unwrap().is_none());
        assert!(lookup_in(&dir.path().join("missing"), "alice").is_err());
    }
}
