use core::str::FromStr;

use serde::{Deserialize, Serialize};

use harborcrm_core::DomainError;

/// Role of an account.
///
/// The set is closed by design: there is no role hierarchy and no
/// inheritance, and policy layers match on the variant directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Executive,
    Manager,
    Staff,
    Guest,
}

impl Role {
    /// All roles, in descending order of privilege.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Executive,
        Role::Manager,
        Role::Staff,
        Role::Guest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Executive => "executive",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Guest => "guest",
        }
    }

    /// Admins bypass the capability table, section overrides, and branch
    /// partitioning entirely.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "executive" => Ok(Role::Executive),
            "manager" => Ok(Role::Manager),
            "staff" => Ok(Role::Staff),
            "guest" => Ok(Role::Guest),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_roles() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn serde_round_trip_uses_lowercase() {
        let json = serde_json::to_string(&Role::Executive).unwrap();
        assert_eq!(json, "\"executive\"");
        assert_eq!(serde_json::from_str::<Role>(&json).unwrap(), Role::Executive);
    }
}
