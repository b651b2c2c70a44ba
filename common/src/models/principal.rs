// common/src/models/principal.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of role tags carried in the token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Director,
    Manager,
    Staff,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Director, Role::Manager, Role::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "Director",
            Role::Manager => "Manager",
            Role::Staff => "Staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    // Exact match only; role claims are compared verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The authenticated user's profile, paired with a credential.
///
/// `id` and `role` are required. A missing display name stays `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, name: None, role }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Strictly parse a persisted principal record.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
