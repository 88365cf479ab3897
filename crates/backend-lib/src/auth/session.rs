// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session id handling and management.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use metrics::{counter, gauge};
use rand::RngCore;
use std::{collections::HashMap, fmt, time::Duration};
use tracing::{debug, info};
use userauth_common::{SessionEntry, SessionId, User, UserId};

use super::{session_cookie, AuthRequest, Authenticator};
use crate::error::AuthError;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_DESTROYED};
use crate::storage::Persistence;
use crate::store::UserStore;

/// Default name of the session cookie
pub const DEFAULT_SESSION_NAME: &str = "session_id";

/// Random bytes behind each session id
const SESSION_ID_BYTES: usize = 32;

/// Fresh session id: CSPRNG bytes, base64url without padding
fn new_session_id() -> SessionId {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Cookie instruction for the caller to apply to its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCookie {
    Set { name: String, value: SessionId },
    Clear { name: String },
}

impl SessionCookie {
    pub fn name(&self) -> &str {
        match self {
            SessionCookie::Set { name, .. } | SessionCookie::Clear { name } => name,
        }
    }
}

/// Renders the `Set-Cookie` header value
impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionCookie::Set { name, value } => {
                write!(f, "{name}={value}; Path=/; HttpOnly; SameSite=Lax")
            }
            SessionCookie::Clear { name } => {
                write!(f, "{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
            }
        }
    }
}

/// Registry of issued sessions, keyed by session id
#[derive(Debug, Clone)]
pub struct SessionAuth {
    session_name: String,
    session_duration: Option<Duration>,
    sessions: HashMap<SessionId, SessionEntry>,
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_NAME)
    }
}

impl SessionAuth {
    /// Sessions that never expire, carried in the cookie `session_name`
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            session_duration: None,
            sessions: HashMap::new(),
        }
    }

    /// Reject sessions older than `duration`; `None` disables expiry
    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.session_duration = duration;
        self
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_duration(&self) -> Option<Duration> {
        self.session_duration
    }

    /// Number of sessions currently held
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Issue a fresh session id for `user_id`. Expired sessions are
    /// purged first.
    pub fn create_session(&mut self, user_id: UserId) -> SessionId {
        self.purge_expired();

        let mut session_id = new_session_id();
        while self.sessions.contains_key(&session_id) {
            session_id = new_session_id();
        }

        let entry = SessionEntry {
            session_id: session_id.clone(),
            user_id,
            created_at: Utc::now(),
        };
        self.sessions.insert(session_id.clone(), entry);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        info!(%user_id, "session created");

        session_id
    }

    pub fn entry(&self, session_id: &str) -> Option<&SessionEntry> {
        self.sessions.get(session_id)
    }

    /// Owner of a live session, `None` when unknown or expired
    pub fn user_id_for_session_id(&self, session_id: &str) -> Option<UserId> {
        let entry = self.sessions.get(session_id)?;
        if self.is_expired(entry) {
            debug!(user_id = %entry.user_id, "session expired");
            return None;
        }
        Some(entry.user_id)
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        let Some(duration) = self.session_duration else {
            return false;
        };
        // a duration too large for chrono never elapses
        chrono::Duration::from_std(duration)
            .ok()
            .and_then(|ttl| entry.created_at.checked_add_signed(ttl))
            .is_some_and(|deadline| deadline < Utc::now())
    }

    /// Resolve a session id to its user
    pub fn validate<P: Persistence>(
        &self,
        store: &UserStore<P>,
        session_id: Option<&str>,
    ) -> Result<User, AuthError> {
        let session_id = session_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::NoSessionCookie)?;
        let user_id = self
            .user_id_for_session_id(session_id)
            .ok_or(AuthError::UnknownSession)?;
        store
            .find_by_id(user_id)
            .cloned()
            .ok_or(AuthError::UnknownSession)
    }

    /// Drop a session; `false` if it was not held
    pub fn destroy_session(&mut self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if let Some(entry) = &removed {
            counter!(SESSION_DESTROYED).increment(1);
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
            info!(user_id = %entry.user_id, "session destroyed");
        }
        removed.is_some()
    }

    /// Drop every session held by `user_id` except `keep`, returns how many
    /// were removed
    pub fn destroy_other_sessions(&mut self, user_id: UserId, keep: &str) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|id, entry| entry.user_id != user_id || id == keep);
        let removed = before - self.sessions.len();
        if removed > 0 {
            counter!(SESSION_DESTROYED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        }
        removed
    }

    /// Re-register sessions recorded on user records, e.g. after a restart.
    /// Restored sessions start their lifetime now.
    pub fn restore<'u>(&mut self, users: impl IntoIterator<Item = &'u User>) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        for user in users {
            if let Some(session_id) = user.session_id.as_ref().filter(|id| !id.is_empty()) {
                self.sessions.insert(
                    session_id.clone(),
                    SessionEntry {
                        session_id: session_id.clone(),
                        user_id: user.id,
                        created_at: now,
                    },
                );
            }
        }
        let restored = self.sessions.len() - before;
        if restored > 0 {
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
            info!(restored, "sessions restored from user records");
        }
        restored
    }

    /// Remove sessions past their duration
    pub fn purge_expired(&mut self) -> usize {
        let before = self.sessions.len();
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|entry| self.is_expired(entry))
            .map(|entry| entry.session_id.clone())
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        let removed = before - self.sessions.len();
        if removed > 0 {
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
            debug!(removed, "purged expired sessions");
        }
        removed
    }

    /// Session id from the request's session cookie
    pub fn session_cookie<'r>(&self, request: &'r AuthRequest) -> Option<&'r str> {
        session_cookie(request, &self.session_name)
    }

    /// Instruction to set the session cookie
    pub fn set_cookie(&self, session_id: &str) -> SessionCookie {
        SessionCookie::Set {
            name: self.session_name.clone(),
            value: session_id.to_string(),
        }
    }

    /// Instruction to clear the session cookie
    pub fn clear_cookie(&self) -> SessionCookie {
        SessionCookie::Clear {
            name: self.session_name.clone(),
        }
    }
}

impl Authenticator for SessionAuth {
    fn current_user<P: Persistence>(
        &self,
        store: &UserStore<P>,
        request: &AuthRequest,
    ) -> Result<User, AuthError> {
        self.validate(store, self.session_cookie(request))
    }
}
