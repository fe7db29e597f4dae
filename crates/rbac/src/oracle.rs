//! Rule-based permission oracle.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use policy::{AccessReview, POLICY_GROUP, POLICY_RESOURCE, PermissionOracle};
use tracing::debug;

use crate::{Error, Result, Role, Rules};

/// Answers permission queries from a fixed set of roles and bindings.
#[derive(Debug, Clone, Default)]
pub struct RbacOracle {
    rules: Rules,
    roles: HashMap<String, usize>,
}

impl RbacOracle {
    /// Build an oracle, rejecting duplicate roles and bindings to unknown roles.
    pub fn new(rules: Rules) -> Result<Self> {
        let mut roles = HashMap::new();
        for (idx, role) in rules.roles.iter().enumerate() {
            if roles.insert(role.name.clone(), idx).is_some() {
                return Err(Error::Invalid(format!(
                    "role {:?} is defined more than once",
                    role.name
                )));
            }
        }

        for binding in &rules.bindings {
            if !roles.contains_key(&binding.role) {
                return Err(Error::Invalid(format!(
                    "binding references unknown role {:?}",
                    binding.role
                )));
            }
        }

        Ok(Self { rules, roles })
    }

    /// An oracle that denies everything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load rules from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse rules from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let rules: Rules = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name).map(|&idx| &self.rules.roles[idx])
    }

    /// Check a review against the rules.
    pub fn allows(&self, review: &AccessReview) -> bool {
        let resource = &review.resource;
        if resource.group != POLICY_GROUP || resource.resource != POLICY_RESOURCE {
            return false;
        }

        self.rules
            .bindings
            .iter()
            .filter(|b| b.applies_in(&resource.namespace))
            .filter(|b| b.binds(&review.user))
            .filter_map(|b| self.role(&b.role))
            .any(|role| role.grants(&resource.verb, &resource.name))
    }
}

#[async_trait]
impl PermissionOracle for RbacOracle {
    async fn check(&self, review: &AccessReview) -> policy::Result<bool> {
        let allowed = self.allows(review);
        debug!(
            user = %review.user.username,
            policy = %review.resource.name,
            scope = %review.scope(),
            allowed,
            "rbac check"
        );
        Ok(allowed)
    }
}
