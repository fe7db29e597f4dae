//! Role and binding rules loaded from TOML.

use policy::{USE_VERB, UserInfo};
use serde::{Deserialize, Serialize};

const WILDCARD: &str = "*";

/// Rules configuration.
///
/// ```toml
/// [[role]]
/// name = "web-issuer"
/// verbs = ["use"]
/// policies = ["web-certs"]
///
/// [[binding]]
/// role = "web-issuer"
/// namespace = "team-a"
/// subjects = [{ kind = "group", name = "devs" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default, rename = "role")]
    pub roles: Vec<Role>,

    #[serde(default, rename = "binding")]
    pub bindings: Vec<Binding>,
}

/// A named set of permissions on policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,

    /// Granted verbs; `"*"` grants all.
    #[serde(default = "default_verbs")]
    pub verbs: Vec<String>,

    /// Policy names the role applies to. Empty or `"*"` means every policy.
    #[serde(default)]
    pub policies: Vec<String>,
}

fn default_verbs() -> Vec<String> {
    vec![USE_VERB.to_string()]
}

impl Role {
    pub fn grants(&self, verb: &str, policy: &str) -> bool {
        let verb_allowed = self.verbs.iter().any(|v| v == WILDCARD || v == verb);
        let policy_allowed =
            self.policies.is_empty() || self.policies.iter().any(|p| p == WILDCARD || p == policy);
        verb_allowed && policy_allowed
    }
}

/// Grants a role to subjects, in one namespace or cluster wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,

    /// Namespace the grant is limited to. Without one the binding applies
    /// in every namespace and at cluster scope.
    #[serde(default)]
    pub namespace: Option<String>,

    pub subjects: Vec<Subject>,
}

impl Binding {
    /// Whether the binding applies to a query in `namespace` (empty for cluster scope).
    pub fn applies_in(&self, namespace: &str) -> bool {
        match &self.namespace {
            None => true,
            Some(ns) => ns == namespace,
        }
    }

    pub fn binds(&self, user: &UserInfo) -> bool {
        self.subjects.iter().any(|s| s.matches(user))
    }
}

/// Who a binding applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    User { name: String },
    Group { name: String },
}

impl Subject {
    pub fn matches(&self, user: &UserInfo) -> bool {
        match self {
            Subject::User { name } => &user.username == name,
            Subject::Group { name } => user.groups.iter().any(|g| g == name),
        }
    }
}
