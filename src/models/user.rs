//! User model
//!
//! Users are keyed by username rather than a numeric id. The password is
//! stored only as a hash produced by the encryption manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An operator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Login name; primary key
    pub username: String,

    /// Display name
    #[serde(default)]
    pub display_name: String,

    /// Role tag (e.g. "admin", "cashier"); permission checks live outside
    /// this crate
    #[serde(default)]
    pub role: String,

    /// Key-salted password hash (hex)
    pub password_hash: String,

    /// When the user was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with an already-computed password hash
    pub fn new(
        username: impl Into<String>,
        role: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            display_name: username.clone(),
            username,
            role: role.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = User::new("ada", "admin", "deadbeef");
        assert_eq!(user.username, "ada");
        assert_eq!(user.display_name, "ada");
        assert_eq!(user.role, "admin");
    }
}
