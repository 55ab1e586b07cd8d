use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub embark_id: Option<String>,
    pub role: String,
    pub is_banned: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl User {
    pub fn new(
        username: String,
        password_hash: String,
        embark_id: Option<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: new_id(),
            username,
            password_hash,
            embark_id,
            role: role.as_str().to_string(),
            is_banned: false,
            created_at: now_timestamp(),
        }
    }

    pub fn role(&self) -> UserRole {
        UserRole::parse(&self.role).unwrap_or(UserRole::User)
    }
}

/// The caller's own account, contact handle included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub embark_id: Option<String>,
    pub role: UserRole,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let role = user.role();
        Self {
            id: user.id,
            username: user.username,
            embark_id: user.embark_id,
            role,
            created_at: user.created_at,
        }
    }
}

/// Aggregate of every rating a user has received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// What other players may see about a user. Never carries the contact handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub created_at: String,
    pub rating: RatingSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUserRow {
    pub id: String,
    pub username: String,
    pub role: String,
    pub is_banned: bool,
    pub created_at: String,
}
