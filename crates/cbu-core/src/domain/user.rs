use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity - an account that can author posts and join projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    /// Role names granted to this account ("admin", "user", ...).
    pub roles: Vec<String>,
    /// Third-party OAuth token, encrypted at rest with the assembled key.
    pub facebook_token: Option<String>,
    /// Third-party OAuth token, encrypted at rest with the assembled key.
    pub twitter_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID, the default "user" role, and
    /// timestamps.
    pub fn new(email: String, display_name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            roles: vec!["user".to_string()],
            facebook_token: None,
            twitter_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
