use std::collections::HashMap;

use subtle::ConstantTimeEq;

use crate::error::{LedgerError, Result};

/// Checks a username/password pair. Swap the implementation to plug in a real
/// identity provider.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Fixed username → password table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<U: Into<String>, P: Into<String>> FromIterator<(U, P)> for StaticCredentials {
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().map(|(u, p)| (u.into(), p.into())).collect(),
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(expected) => expected.as_bytes().ct_eq(password.as_bytes()).into(),
            None => false,
        }
    }
}

/// Identity of an authenticated caller, scoped to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub username: String,
}

pub fn authenticate(verifier: &dyn CredentialVerifier, username: &str, password: &str) -> bool {
    verifier.verify(username, password)
}

pub fn require(verifier: &dyn CredentialVerifier, username: &str, password: &str) -> Result<CallerIdentity> {
    if authenticate(verifier, username, password) {
        Ok(CallerIdentity {
            username: username.to_string(),
        })
    } else {
        Err(LedgerError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> StaticCredentials {
        [("adit", "shruti"), ("vikram", "rikita"), ("ghanshyam", "jalpa")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_authenticate() {
        let users = users();
        assert!(authenticate(&users, "adit", "shruti"));
        assert!(!authenticate(&users, "adit", "wrong"));
        assert!(!authenticate(&users, "nouser", "x"));
        assert!(!authenticate(&users, "adit", ""));
        assert!(!authenticate(&users, "adit", "shruti "));
    }

    #[test]
    fn test_require_returns_caller() {
        let users = users();
        let caller = require(&users, "vikram", "rikita").unwrap();
        assert_eq!(caller.username, "vikram");
        assert!(matches!(require(&users, "vikram", "jalpa"), Err(LedgerError::Authentication)));
    }

    #[test]
    fn test_empty_table_rejects_everyone() {
        let users = StaticCredentials::new();
        assert!(users.is_empty());
        assert!(!authenticate(&users, "", ""));
    }
}
