//! Authentication and authorization types for FacilityDesk.
//!
//! Service users (IT staff who operate FacilityDesk) are distinct from
//! [`crate::models::Employee`] records, which are the people the service
//! tracks.

pub mod password;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A service user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Email address (unique).
    pub email: String,
    /// Login name (unique).
    pub username: String,
    /// Argon2id password hash in PHC string format.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Optional display name shown in the UI.
    pub display_name: Option<String>,
    /// Authorization role.
    pub role: Role,
    /// Whether the account may log in.
    pub enabled: bool,
    /// Timestamp of the last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new enabled user.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            display_name: None,
            role,
            enabled: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name to display for this user.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Authorization role of a service user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Everything except user management.
    Manager,
    /// Day-to-day desk work: tickets, chat, stock movements, visits.
    Agent,
}

impl Role {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
        }
    }

    /// Returns true if this role may manage service users.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns true if this role may change configuration records
    /// (SLA policies, suppliers) and delete entities.
    pub fn can_manage_records(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "agent" => Ok(Role::Agent),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Data stored in the session cookie store for a logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// The logged-in user's id.
    pub user_id: Uuid,
    /// Username at login time (for logging; the user row is re-read on
    /// every request).
    pub username: String,
    /// When the session was established.
    pub logged_in_at: DateTime<Utc>,
}

impl SessionData {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            logged_in_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("AGENT".parse::<Role>(), Ok(Role::Agent));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can_manage_users());
        assert!(!Role::Manager.can_manage_users());
        assert!(Role::Manager.can_manage_records());
        assert!(!Role::Agent.can_manage_records());
    }

    #[test]
    fn test_display_falls_back_to_username() {
        let mut user = User::new("a@b.c", "alice", "hash", Role::Agent);
        assert_eq!(user.display(), "alice");
        user.display_name = Some("Alice A.".to_string());
        assert_eq!(user.display(), "Alice A.");
    }
}
