//! Authentication capability.
//!
//! # Data Flow
//! ```text
//! login request (raw form bytes)
//!     → Credential::Bytes
//!     → Authenticator::authenticate (whitelist, then injected CredentialCheck)
//!     → Authenticator::add_user (system_user_exists)
//!     → user record in the store
//! ```
//!
//! # Design Decisions
//! - The credential check is a constructor parameter, so tests swap it
//!   without touching process-global state
//! - `add_user` is a provided method calling `system_user_exists` through
//!   `self`; overriding the existence check is enough to change it

pub mod accounts;
pub mod pam;

pub use pam::{CredentialCheck, PamAuthenticator};

use thiserror::Error;

/// A value submitted as a username or password.
///
/// Backends differ in how they treat decoded text versus raw bytes, so the
/// distinction is kept rather than normalized away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Raw byte-string value.
    Bytes(Vec<u8>),
    /// Unicode text value.
    Text(String),
}

impl Credential {
    /// The credential's bytes, whichever form it arrived in.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(b) => b,
            Self::Text(s) => s.as_bytes(),
        }
    }

    /// Whether this is a text value.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&[u8]> for Credential {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Credential {
    fn from(b: &[u8; N]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Credential {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// Errors raised while registering users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The identity has no account on the host.
    #[error("system user `{0}` does not exist")]
    UnknownSystemUser(String),
}

/// Pluggable authentication backend.
pub trait Authenticator: Send + Sync {
    /// Check a username/password pair. A mismatch is `false`, never an error.
    fn authenticate(&self, username: &Credential, password: &Credential) -> bool;

    /// Whether `name` has an account on the host.
    fn system_user_exists(&self, name: &str) -> bool;

    /// Prepare the backend for a new hub user.
    fn add_user(&self, name: &str) -> Result<(), AuthError> {
        if self.system_user_exists(name) {
            Ok(())
        } else {
            Err(AuthError::UnknownSystemUser(name.to_string()))
        }
    }
}
