//! Certificate request policies and policy documents.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// A named rule set that certificate requests are evaluated against.
///
/// The `spec` is owned by the evaluators; the approver never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRequestPolicy {
    pub name: String,

    #[serde(default)]
    pub spec: Value,
}

impl CertificateRequestPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }
}

/// A set of policies loaded from a TOML document.
///
/// ```toml
/// [[policy]]
/// name = "web-certs"
///
/// [policy.spec]
/// allowed_dns_names = ["*.example.com"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyList {
    #[serde(default, rename = "policy")]
    pub items: Vec<CertificateRequestPolicy>,
}

impl PolicyList {
    /// Load a policy document from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a policy document from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let list: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        list.validate()?;
        Ok(list)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for policy in &self.items {
            if policy.name.is_empty() {
                return Err(Error::Invalid("policy name must not be empty".into()));
            }
            if !seen.insert(policy.name.as_str()) {
                return Err(Error::Invalid(format!(
                    "policy {:?} is defined more than once",
                    policy.name
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl IntoIterator for PolicyList {
    type Item = CertificateRequestPolicy;
    type IntoIter = std::vec::IntoIter<CertificateRequestPolicy>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Source of the currently defined policies.
///
/// Policies are listed fresh for every review. The order of the returned
/// policies is not guaranteed to be stable between calls.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn list(&self) -> Result<Vec<CertificateRequestPolicy>>;
}
