// ============================
// crates/backend-lib/src/auth/basic.rs
// ============================
//! HTTP Basic authentication.
//!
//! `Authorization: Basic <base64(email:password)>` is checked in steps, each
//! with its own rejection: scheme prefix, base64 payload, credential pair,
//! user lookup, password.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};
use userauth_common::User;

use super::{authorization_header, AuthRequest, Authenticator, PasswordHasher};
use crate::error::AuthError;
use crate::storage::Persistence;
use crate::store::UserStore;

/// Scheme prefix, including the separating space
pub const BASIC_PREFIX: &str = "Basic ";

/// Basic authenticator verifying passwords with `hasher`
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuth {
    hasher: PasswordHasher,
}

impl BasicAuth {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self { hasher }
    }

    /// Base64 part of the header value
    pub fn extract_base64_authorization_header(header: &str) -> Result<&str, AuthError> {
        header
            .strip_prefix(BASIC_PREFIX)
            .ok_or(AuthError::MalformedHeader)
    }

    /// Decode the base64 payload into UTF-8 text
    pub fn decode_base64(encoded: &str) -> Result<String, AuthError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::DecodeError)?;
        String::from_utf8(bytes).map_err(|_| AuthError::DecodeError)
    }

    /// Split `email:password`; exactly one `:` is accepted
    pub fn extract_user_credentials(decoded: &str) -> Result<(&str, &str), AuthError> {
        let (email, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;
        if password.contains(':') {
            return Err(AuthError::MalformedCredentials);
        }
        Ok((email, password))
    }

    /// Look up `email` and verify `password` against its hash
    pub fn user_object_from_credentials<P: Persistence>(
        &self,
        store: &UserStore<P>,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = store.find_by_email(email).ok_or_else(|| {
            warn!(%email, "basic auth for unknown user");
            AuthError::UserNotFound
        })?;

        if !self.hasher.verify(&user.hashed_password, password) {
            warn!(user_id = %user.id, "basic auth with wrong password");
            return Err(AuthError::InvalidPassword);
        }

        debug!(user_id = %user.id, "basic auth accepted");
        Ok(user.clone())
    }

    /// Run every step against a raw header value
    pub fn authenticate<P: Persistence>(
        &self,
        store: &UserStore<P>,
        header: Option<&str>,
    ) -> Result<User, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let encoded = Self::extract_base64_authorization_header(header)?;
        let decoded = Self::decode_base64(encoded)?;
        let (email, password) = Self::extract_user_credentials(&decoded)?;
        self.user_object_from_credentials(store, email, password)
    }
}

impl Authenticator for BasicAuth {
    fn current_user<P: Persistence>(
        &self,
        store: &UserStore<P>,
        request: &AuthRequest,
    ) -> Result<User, AuthError> {
        self.authenticate(store, authorization_header(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4, 8, 1).unwrap()
    }

    fn store_with_bob() -> UserStore<MemoryPersistence> {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let hash = hasher().hash("secret123").unwrap();
        store.add_user("bob@example.com", &hash).unwrap();
        store
    }

    fn header_for(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[test]
    fn test_known_header_yields_user() {
        let store = store_with_bob();
        let auth = BasicAuth::new(hasher());

        let user = auth
            .authenticate(&store, Some("Basic Ym9iQGV4YW1wbGUuY29tOnNlY3JldDEyMw=="))
            .unwrap();
        assert_eq!(user.email, "bob@example.com");
    }

    #[test]
    fn test_scheme_prefix_required() {
        let store = store_with_bob();
        let auth = BasicAuth::new(hasher());

        for header in ["Bearer abc", "basic Ym9i", "BasicYm9i", ""] {
            assert!(
                matches!(auth.authenticate(&store, Some(header)), Err(AuthError::MalformedHeader)),
                "{header:?} should be malformed"
            );
        }
        assert!(matches!(
            auth.authenticate(&store, None),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            BasicAuth::decode_base64("not base64!"),
            Err(AuthError::DecodeError)
        ));
        // valid base64, invalid UTF-8
        assert!(matches!(
            BasicAuth::decode_base64(&STANDARD.encode([0xff, 0xfe])),
            Err(AuthError::DecodeError)
        ));
        assert_eq!(
            BasicAuth::decode_base64("SG9sYmVydG9u").unwrap(),
            "Holberton"
        );
    }

    #[test]
    fn test_credential_pair_needs_exactly_one_colon() {
        assert!(matches!(
            BasicAuth::extract_user_credentials("no-separator"),
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            BasicAuth::extract_user_credentials("a@b.io:pa:ss"),
            Err(AuthError::MalformedCredentials)
        ));
        assert_eq!(
            BasicAuth::extract_user_credentials("a@b.io:pass").unwrap(),
            ("a@b.io", "pass")
        );
        assert_eq!(
            BasicAuth::extract_user_credentials("a@b.io:").unwrap(),
            ("a@b.io", "")
        );

        let store = store_with_bob();
        let auth = BasicAuth::new(hasher());
        assert!(matches!(
            auth.authenticate(&store, Some(&header_for("bob@example.com"))),
            Err(AuthError::MalformedCredentials)
        ));
    }

    #[test]
    fn test_unknown_user_and_wrong_password() {
        let store = store_with_bob();
        let auth = BasicAuth::new(hasher());

        assert!(matches!(
            auth.authenticate(&store, Some(&header_for("alice@example.com:secret123"))),
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.authenticate(&store, Some(&header_for("bob@example.com:secret12"))),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[test]
    fn test_authenticator_reads_request_header() {
        let store = store_with_bob();
        let auth = BasicAuth::new(hasher());
        let request = AuthRequest::new().with_authorization(header_for("bob@example.com:secret123"));

        assert_eq!(auth.current_user(&store, &request).unwrap().email, "bob@example.com");
        assert!(matches!(
            auth.current_user(&store, &AuthRequest::new()),
            Err(AuthError::MissingHeader)
        ));
    }
}
