// web-server/src/policy.rs
use std::collections::HashMap;
use common::{ConfigError, Role};

/// Named set of role tags accepted by a protected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: String,
    pub roles: Vec<Role>,
}

impl Policy {
    pub fn new(name: impl Into<String>, roles: impl Into<Vec<Role>>) -> Self {
        Self {
            name: name.into(),
            roles: roles.into(),
        }
    }

    /// The role claim must exactly match one of the accepted roles.
    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Policy names are matched case-insensitively; the `config` crate lowercases
/// keys read from files.
#[derive(Debug, Clone, Default)]
pub struct Policies {
    by_name: HashMap<String, Policy>,
}

impl Policies {
    pub fn from_config(policies: &HashMap<String, Vec<Role>>) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::new();
        for (name, roles) in policies {
            if roles.is_empty() {
                return Err(ConfigError::EmptyPolicy(name.clone()));
            }
            by_name.insert(name.to_ascii_lowercase(), Policy::new(name.clone(), roles.clone()));
        }
        Ok(Self { by_name })
    }

    /// Look up a policy a route depends on; absence is a startup error.
    pub fn require(&self, name: &str) -> Result<Policy, ConfigError> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))
    }
}
