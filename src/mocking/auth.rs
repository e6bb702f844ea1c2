//! Authenticator double.

use crate::auth::{Authenticator, Credential, PamAuthenticator};

/// Identities starting with this prefix have no host account.
pub const NONEXISTENT_PREFIX: &str = "dne";

/// Stand-in for the PAM credential check.
///
/// Text values always fail, as they do in the PAM binding this replaces;
/// byte values pass when the password equals the username.
pub fn mock_authenticate(username: &Credential, password: &Credential, _service: &str) -> bool {
    if username.is_text() || password.is_text() {
        return false;
    }
    password.as_bytes() == username.as_bytes()
}

type MockCheck = fn(&Credential, &Credential, &str) -> bool;

/// [`PamAuthenticator`] with the mock check and no host account lookups.
pub struct MockPamAuthenticator {
    inner: PamAuthenticator<MockCheck>,
}

impl MockPamAuthenticator {
    pub fn new() -> Self {
        Self {
            inner: PamAuthenticator::new(mock_authenticate as MockCheck),
        }
    }

    /// Restrict logins to `names`, as the production whitelist does.
    pub fn with_whitelist<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: self.inner.with_whitelist(names),
        }
    }
}

impl Default for MockPamAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for MockPamAuthenticator {
    fn authenticate(&self, username: &Credential, password: &Credential) -> bool {
        self.inner.authenticate(username, password)
    }

    fn system_user_exists(&self, name: &str) -> bool {
        !name.starts_with(NONEXISTENT_PREFIX)
    }
}
