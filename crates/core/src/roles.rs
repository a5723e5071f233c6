//! User roles and their ordering.
//!
//! Roles form a strict hierarchy `employee < admin < super admin`. Access
//! checks compare [`Role`] values directly instead of matching strings.
//! The string forms must match the `users.role` check constraint in
//! `20250101000001_create_users_table.sql`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super admin";

/// A user's role. Variant order defines the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "employee")]
    Employee,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "super admin")]
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => ROLE_EMPLOYEE,
            Role::Admin => ROLE_ADMIN,
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
        }
    }

    /// Whether this role meets or exceeds `minimum`.
    pub fn at_least(self, minimum: Role) -> bool {
        self >= minimum
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_EMPLOYEE => Ok(Role::Employee),
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_SUPER_ADMIN => Ok(Role::SuperAdmin),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_totally_ordered() {
        assert!(Role::Employee < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
        assert!(Role::SuperAdmin.at_least(Role::Admin));
        assert!(Role::Admin.at_least(Role::Admin));
        assert!(!Role::Employee.at_least(Role::Admin));
    }

    #[test]
    fn parses_stored_names() {
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("super admin".parse::<Role>().unwrap(), Role::SuperAdmin);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("superadmin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super admin\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::SuperAdmin);
    }
}
