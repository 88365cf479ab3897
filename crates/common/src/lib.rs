// ================
// crates/common/src/lib.rs
// ================
//! Record types shared by the user store and the authentication service.
//! These are the shapes persisted to the flat file and handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a user record
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Allocate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque session identifier carried in the session cookie
pub type SessionId = String;

/// A registered user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique id, assigned on signup
    pub id: UserId,
    /// Unique email address
    pub email: String,
    /// PHC-formatted password hash
    pub hashed_password: String,
    /// Session currently tracked for this user, if logged in
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Outstanding password reset token
    #[serde(default)]
    pub reset_token: Option<String>,
}

impl User {
    /// Build a new record with no session and no reset token
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            session_id: None,
            reset_token: None,
        }
    }

    /// Public view of the user, never includes credentials
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "email": self.email,
        })
    }
}

/// Server-side record of an issued session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// Random session id
    pub session_id: SessionId,
    /// Owner of the session
    pub user_id: UserId,
    /// Issue time
    pub created_at: DateTime<Utc>,
}
