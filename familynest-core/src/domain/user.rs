//! User domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::deserialize_id;

/// Family role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
}

impl Role {
    /// Lower-case form used locally and in persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
        }
    }

    /// Upper-case form used by the account service
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::Parent => "PARENT",
            Role::Child => "CHILD",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parse a role, ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "child" => Ok(Role::Child),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An authenticated family member, as issued by the account service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }
}
