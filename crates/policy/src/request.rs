//! Certificate requests and requester identity.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Identity of the user that submitted a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub uid: String,

    /// Extra attributes attached by the authenticator.
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl UserInfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.extra.insert(key.into(), values);
        self
    }
}

/// A certificate signing request awaiting approval.
///
/// The `spec` is opaque to the approver and only handed to evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub name: String,

    /// Namespace the request was created in. Empty means cluster scope.
    #[serde(default)]
    pub namespace: String,

    pub user: UserInfo,

    #[serde(default)]
    pub spec: Value,
}

impl CertificateRequest {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, user: UserInfo) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            user,
            spec: Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    /// Load a request document from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a request document from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let request: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        if request.name.is_empty() {
            return Err(Error::Invalid("request name must not be empty".into()));
        }
        Ok(request)
    }

    /// `namespace/name`, or just `name` for cluster scoped requests.
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}
