//! Permission queries asking whether a user may use a policy.

use crate::{Result, UserInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API group of the policy resource.
pub const POLICY_GROUP: &str = "policy.cert-manager.io";

/// Resource name of policies.
pub const POLICY_RESOURCE: &str = "certificaterequestpolicies";

/// The only verb the approver ever asks about.
pub const USE_VERB: &str = "use";

/// Where a permission grant applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Namespaced(String),
    Cluster,
}

impl Scope {
    /// Scope for a namespace name, where the empty string means cluster scope.
    pub fn for_namespace(namespace: &str) -> Self {
        if namespace.is_empty() {
            Self::Cluster
        } else {
            Self::Namespaced(namespace.to_string())
        }
    }

    /// The namespace as sent to an oracle; empty for cluster scope.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Namespaced(ns) => ns,
            Self::Cluster => "",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespaced(ns) => write!(f, "namespace {ns}"),
            Self::Cluster => f.write_str("cluster"),
        }
    }
}

/// The resource a permission query is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub group: String,
    pub resource: String,
    pub name: String,
    /// Empty for cluster scope.
    pub namespace: String,
    pub verb: String,
}

/// A single "may this user use this policy here?" question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReview {
    /// Snapshot of the requester, owned by this query.
    pub user: UserInfo,
    pub resource: ResourceAttributes,
}

impl AccessReview {
    /// Ask whether `user` may use the policy named `policy` within `scope`.
    pub fn use_policy(user: &UserInfo, policy: &str, scope: &Scope) -> Self {
        Self {
            user: user.clone(),
            resource: ResourceAttributes {
                group: POLICY_GROUP.to_string(),
                resource: POLICY_RESOURCE.to_string(),
                name: policy.to_string(),
                namespace: scope.namespace().to_string(),
                verb: USE_VERB.to_string(),
            },
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::for_namespace(&self.resource.namespace)
    }
}

/// Answers permission queries on behalf of the approver.
///
/// Must be safe to share between concurrent reviews.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Returns whether the review's user may perform the verb on the resource.
    async fn check(&self, review: &AccessReview) -> Result<bool>;
}
