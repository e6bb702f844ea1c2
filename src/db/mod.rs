//! User store and its on-disk artifact.
//!
//! # Data Flow
//! ```text
//! database url ("file:///…/hub.json" | "memory:")
//!     → StoreLocation::parse
//!     → Database::open (loads an existing document)
//!     → add_user / upsert_user / remove_user (in memory)
//!     → commit (JSON document, written to a temp file then renamed)
//! ```
//!
//! The store is not synchronized internally. The hub keeps it behind a
//! mutex that is only locked from the hub's own event-loop thread.

pub mod user;

pub use user::{Role, User};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors raised by the user store.
#[derive(Debug, Error)]
pub enum DbError {
    /// The store URL could not be parsed.
    #[error("invalid database url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The store URL names a backend this store does not provide.
    #[error("unsupported database scheme `{0}`")]
    UnsupportedScheme(String),

    /// Reading or writing the store file failed.
    #[error("database io error: {0}")]
    Io(#[from] io::Error),

    /// The store file is not a valid document.
    #[error("database encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A user with this name already exists.
    #[error("user `{0}` already exists")]
    DuplicateUser(String),
}

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Nothing is written to disk.
    Memory,
    /// A JSON document at this path.
    File(PathBuf),
}

impl StoreLocation {
    /// Parse a database URL.
    pub fn parse(url: &str) -> Result<Self, DbError> {
        if url == "memory:" || url == "memory://" {
            return Ok(Self::Memory);
        }

        let parsed = Url::parse(url).map_err(|e| DbError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "file" => parsed
                .to_file_path()
                .map(Self::File)
                .map_err(|()| DbError::InvalidUrl {
                    url: url.to_string(),
                    reason: "not an absolute local path".to_string(),
                }),
            other => Err(DbError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Build a `file://` URL for a path.
    pub fn file_url(path: &Path) -> Result<String, DbError> {
        Url::from_file_path(path)
            .map(String::from)
            .map_err(|()| DbError::InvalidUrl {
                url: path.display().to_string(),
                reason: "not an absolute local path".to_string(),
            })
    }
}

/// Serialized form of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    users: Vec<User>,
}

/// The hub's user store.
#[derive(Debug)]
pub struct Database {
    location: StoreLocation,
    users: BTreeMap<String, User>,
}

impl Database {
    /// Open the store behind `url`, loading its document if one exists.
    pub fn open(url: &str) -> Result<Self, DbError> {
        let location = StoreLocation::parse(url)?;
        let mut db = Self {
            location,
            users: BTreeMap::new(),
        };

        if let StoreLocation::File(path) = &db.location {
            if path.exists() {
                let reader = BufReader::new(File::open(path)?);
                let document: StoreDocument = serde_json::from_reader(reader)?;
                db.users = document
                    .users
                    .into_iter()
                    .map(|u| (u.name.clone(), u))
                    .collect();
                tracing::info!(path = %path.display(), users = db.users.len(), "Loaded user store");
            }
        }

        Ok(db)
    }

    /// Open a store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            users: BTreeMap::new(),
        }
    }

    /// Insert a new user. Fails if the name is taken.
    pub fn add_user(&mut self, user: User) -> Result<(), DbError> {
        if self.users.contains_key(&user.name) {
            return Err(DbError::DuplicateUser(user.name));
        }
        self.users.insert(user.name.clone(), user);
        Ok(())
    }

    /// Insert a user, merging roles into an existing record of the same name.
    pub fn upsert_user(&mut self, user: User) -> &User {
        let entry = self
            .users
            .entry(user.name.clone())
            .or_insert_with(|| User::new(user.name.clone()));
        entry.roles.extend(user.roles);
        entry
    }

    /// Look up a user by name.
    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    /// All users, ordered by name.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Remove a user.
    pub fn remove_user(&mut self, name: &str) -> Option<User> {
        self.users.remove(name)
    }

    /// Persist the current state. A no-op for in-memory stores.
    pub fn commit(&self) -> Result<(), DbError> {
        let StoreLocation::File(path) = &self.location else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let document = StoreDocument {
            users: self.users.values().cloned().collect(),
        };

        let staging = staging_path(path);
        {
            let writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(writer, &document)?;
        }
        fs::rename(&staging, path)?;

        tracing::debug!(path = %path.display(), users = document.users.len(), "Committed user store");
        Ok(())
    }

    /// The file backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path),
            StoreLocation::Memory => None,
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Delete a store artifact. A missing file counts as success.
pub fn remove_artifact(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed store artifact");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
