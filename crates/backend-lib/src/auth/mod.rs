// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.
//!
//! [`AuthRequest`] is the framework-neutral view of an incoming request:
//! the raw `Authorization` header and the cookies it carried. The
//! authenticators resolve it to a [`User`] against a [`UserStore`].
pub mod basic;
pub mod password;
mod service;
pub mod session;

use std::collections::HashMap;
use userauth_common::User;

use crate::error::AuthError;
use crate::storage::Persistence;
use crate::store::UserStore;

pub use basic::BasicAuth;
pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthService, SessionToken};
pub use session::{SessionAuth, SessionCookie};

/// Request data the authenticators need
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    authorization: Option<String>,
    cookies: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw header values as received
    pub fn from_headers(authorization: Option<&str>, cookie_header: Option<&str>) -> Self {
        Self {
            authorization: authorization.map(str::to_string),
            cookies: cookie_header.map(parse_cookies).unwrap_or_default(),
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Parse a `Cookie` header (`a=1; b=2`). Later duplicates are ignored.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"');
        cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    cookies
}

/// Whether `path` needs authentication given the excluded paths.
///
/// Paths compare equal ignoring one trailing slash. An excluded entry ending
/// in `*` matches every path starting with the part before the `*`.
pub fn require_auth<S: AsRef<str>>(path: &str, excluded_paths: &[S]) -> bool {
    if excluded_paths.is_empty() {
        return true;
    }

    let normalized = path.strip_suffix('/').unwrap_or(path);
    !excluded_paths.iter().any(|excluded| {
        let excluded = excluded.as_ref();
        match excluded.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => excluded.strip_suffix('/').unwrap_or(excluded) == normalized,
        }
    })
}

/// The raw `Authorization` header, if present
pub fn authorization_header(request: &AuthRequest) -> Option<&str> {
    request.authorization.as_deref()
}

/// Value of the session cookie called `name`, if present
pub fn session_cookie<'r>(request: &'r AuthRequest, name: &str) -> Option<&'r str> {
    request.cookie(name)
}

/// Resolves a request to the user it authenticates
pub trait Authenticator {
    fn current_user<P: Persistence>(
        &self,
        store: &UserStore<P>,
        request: &AuthRequest,
    ) -> Result<User, AuthError>;
}
