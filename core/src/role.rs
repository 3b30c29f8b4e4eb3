use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Privilege tier. Variants are declared in ascending order so the derived
/// `Ord` is the hierarchy: `Regular < UserManager < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Role {
    Regular,
    UserManager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Regular, Role::UserManager, Role::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::UserManager => "user_manager",
            Role::Admin => "admin",
        }
    }

    #[must_use]
    pub fn is_regular(self) -> bool {
        self == Role::Regular
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    /// True when an actor holding `self` may act on a different account
    /// whose role is `target`.
    #[must_use]
    pub fn may_manage(self, target: Role) -> bool {
        !self.is_regular() && target <= self
    }

    /// True when an actor holding `self` may hand out `granted`.
    #[must_use]
    pub fn may_grant(self, granted: Role) -> bool {
        granted <= self
    }
}

impl From<Role> for i64 {
    fn from(role: Role) -> Self {
        match role {
            Role::Regular => 0,
            Role::UserManager => 1,
            Role::Admin => 2,
        }
    }
}

impl TryFrom<i64> for Role {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Regular),
            1 => Ok(Role::UserManager),
            2 => Ok(Role::Admin),
            other => Err(Error::InvalidRequest(format!("Unknown role {other}"))),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" | "0" => Ok(Role::Regular),
            "user_manager" | "user-manager" | "manager" | "1" => Ok(Role::UserManager),
            "admin" | "2" => Ok(Role::Admin),
            _ => Err(Error::InvalidRequest(format!(
                "Invalid role '{s}'. Use regular, user_manager, or admin"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
