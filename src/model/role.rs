use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Portal roles. Everything that is not a manager is an employee.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    pub fn is_manager(self) -> bool {
        self == Role::Manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_stored_role_names() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::from_str("employee").unwrap(), Role::Employee);
        assert!(Role::from_str("admin").is_err());
        assert_eq!(Role::Manager.as_ref(), "manager");
    }
}
