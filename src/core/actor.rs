//! Acting identity and roles for ownership checks

use serde::{Deserialize, Serialize};

/// Roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The user performing an operation
///
/// Every row written to the store records the actor's username as its
/// creator; deletes are restricted to that creator unless the actor is an
/// admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn member(username: impl Into<String>) -> Self {
        Self::new(username, Role::Member)
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this actor may modify or delete a row created by `owner`
    pub fn can_modify(&self, owner: &str) -> bool {
        self.is_admin() || self.username == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Member.to_string(), "member");
    }

    #[test]
    fn test_owner_scope() {
        let alice = Actor::member("alice");
        let root = Actor::admin("root");

        assert!(alice.can_modify("alice"));
        assert!(!alice.can_modify("bob"));
        assert!(root.can_modify("bob"));
    }
}
