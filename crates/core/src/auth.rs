use serde::{Deserialize, Serialize};

/// Capability for anything that can report the role names held by a caller.
///
/// Identity providers implement this; authorization code depends only on the
/// trait and never on a concrete identity type.
pub trait RoleProvider: Send + Sync {
    /// Returns the caller's role names. Duplicates and ordering are irrelevant.
    fn role_names(&self) -> Vec<String>;
}

/// Caller information established by an upstream authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    subject: String,
    roles: Vec<String>,
}

impl CallerIdentity {
    /// Creates a caller identity from an authenticated subject and its roles.
    #[must_use]
    pub fn new(subject: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            roles,
        }
    }

    /// Creates an identity for a caller without any role.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("anonymous", Vec::new())
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the roles attached to the caller.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

impl RoleProvider for CallerIdentity {
    fn role_names(&self) -> Vec<String> {
        self.roles.clone()
    }
}
