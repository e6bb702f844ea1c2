//! PAM-style authenticator.
//!
//! The actual PAM conversation is an external collaborator: it is handed in
//! as a [`CredentialCheck`]. This type owns the control flow around it.

use std::collections::BTreeSet;

use super::accounts;
use super::{Authenticator, Credential};

/// Default PAM service name.
pub const DEFAULT_SERVICE: &str = "login";

/// The primitive credential verification step.
pub trait CredentialCheck: Send + Sync {
    /// Verify `password` for `username` against `service`.
    fn check(&self, username: &Credential, password: &Credential, service: &str) -> bool;
}

impl<F> CredentialCheck for F
where
    F: Fn(&Credential, &Credential, &str) -> bool + Send + Sync,
{
    fn check(&self, username: &Credential, password: &Credential, service: &str) -> bool {
        self(username, password, service)
    }
}

/// Authenticates against host accounts through an injected check.
pub struct PamAuthenticator<C> {
    check: C,
    service: String,
    whitelist: BTreeSet<String>,
}

impl<C: CredentialCheck> PamAuthenticator<C> {
    /// Create an authenticator around `check` for the default service.
    pub fn new(check: C) -> Self {
        Self {
            check,
            service: DEFAULT_SERVICE.to_string(),
            whitelist: BTreeSet::new(),
        }
    }

    /// Use a different PAM service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Only allow these names to log in. An empty whitelist allows everyone.
    pub fn with_whitelist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = names.into_iter().map(Into::into).collect();
        self
    }

    /// The configured PAM service.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn check_whitelist(&self, username: &Credential) -> bool {
        self.whitelist.is_empty()
            || self
                .whitelist
                .iter()
                .any(|name| name.as_bytes() == username.as_bytes())
    }
}

impl<C: CredentialCheck> Authenticator for PamAuthenticator<C> {
    fn authenticate(&self, username: &Credential, password: &Credential) -> bool {
        if !self.check_whitelist(username) {
            tracing::debug!("Login rejected: user not whitelisted");
            return false;
        }
        self.check.check(username, password, &self.service)
    }

    fn system_user_exists(&self, name: &str) -> bool {
        match accounts::lookup(name) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(user = %name, error = %e, "Account lookup failed");
                false
            }
        }
    }
}
