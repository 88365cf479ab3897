// =============
// crates/backend-lib/src/auth/service.rs
// =============
//! Façade over the user store and the session registry, used by route
//! handlers. It borrows both for the duration of one request.
use metrics::counter;
use tracing::{info, warn};
use userauth_common::{SessionId, User};
use uuid::Uuid;

use super::{PasswordHasher, SessionAuth, SessionCookie};
use crate::error::{AuthError, StoreError};
use crate::metrics::{LOGIN_REJECTED, USER_REGISTERED};
use crate::storage::Persistence;
use crate::store::UserStore;

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub session_id: SessionId,
    pub user: User,
    /// Cookie the caller must set on its response
    pub cookie: SessionCookie,
}

pub struct AuthService<'a, P> {
    store: &'a mut UserStore<P>,
    sessions: &'a mut SessionAuth,
    hasher: PasswordHasher,
}

impl<'a, P: Persistence> AuthService<'a, P> {
    pub fn new(
        store: &'a mut UserStore<P>,
        sessions: &'a mut SessionAuth,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            sessions,
            hasher,
        }
    }

    /// Register a new user, failing if the email is taken
    pub fn register_user(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        if self.store.find_by_email(email).is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let hashed = self.hasher.hash(password)?;
        let user = self
            .store
            .add_user(email, &hashed)
            .map_err(|e| match e {
                StoreError::DuplicateEmail(_) => AuthError::EmailAlreadyRegistered,
                other => AuthError::Store(other),
            })?;

        counter!(USER_REGISTERED).increment(1);
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check credentials without opening a session
    pub fn valid_login(&self, email: &str, password: &str) -> bool {
        self.store
            .find_by_email(email)
            .is_some_and(|user| self.hasher.verify(&user.hashed_password, password))
    }

    /// Verify credentials and open a session.
    ///
    /// Once the record is saved, any session the user held before is
    /// destroyed.
    pub fn login(&mut self, email: &str, password: &str) -> Result<SessionToken, AuthError> {
        let Some(user) = self.store.find_by_email(email).cloned() else {
            counter!(LOGIN_REJECTED).increment(1);
            warn!(%email, "login for unknown user");
            return Err(AuthError::UserNotFound);
        };

        if !self.hasher.verify(&user.hashed_password, password) {
            counter!(LOGIN_REJECTED).increment(1);
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidPassword);
        }

        let session_id = self.sessions.create_session(user.id);

        let mut updated = user;
        updated.session_id = Some(session_id.clone());
        let user = match self.store.save(updated) {
            Ok(user) => user,
            Err(err) => {
                // earlier sessions stay live, matching the unchanged record
                self.sessions.destroy_session(&session_id);
                return Err(err.into());
            }
        };
        self.sessions.destroy_other_sessions(user.id, &session_id);

        info!(user_id = %user.id, "logged in");
        Ok(SessionToken {
            cookie: self.sessions.set_cookie(&session_id),
            session_id,
            user,
        })
    }

    /// Destroy a session; `false` if the id was not a live session
    pub fn logout(&mut self, session_id: &str) -> bool {
        let Some(user_id) = self.sessions.entry(session_id).map(|e| e.user_id) else {
            return false;
        };
        self.sessions.destroy_session(session_id);

        if let Some(mut user) = self.store.find_by_session_id(session_id).cloned() {
            user.session_id = None;
            if let Err(err) = self.store.save(user) {
                warn!(%user_id, error = %err, "could not clear session on user record");
            }
        }

        info!(%user_id, "logged out");
        true
    }

    /// User owning `session_id`
    pub fn current_user(&self, session_id: Option<&str>) -> Result<User, AuthError> {
        self.sessions.validate(&*self.store, session_id)
    }

    /// Cookie instruction to clear the session cookie after logout
    pub fn clear_cookie(&self) -> SessionCookie {
        self.sessions.clear_cookie()
    }

    /// Issue a password reset token for `email`
    pub fn get_reset_password_token(&mut self, email: &str) -> Result<String, AuthError> {
        let mut user = self
            .store
            .find_by_email(email)
            .cloned()
            .ok_or(AuthError::UserNotFound)?;

        let token = Uuid::new_v4().to_string();
        user.reset_token = Some(token.clone());
        let user = self.store.save(user)?;

        info!(user_id = %user.id, "reset token issued");
        Ok(token)
    }

    /// Replace the password of the user holding `reset_token`.
    /// The token is single use.
    pub fn update_password(&mut self, reset_token: &str, new_password: &str) -> Result<(), AuthError> {
        let mut user = self
            .store
            .find_by_reset_token(reset_token)
            .cloned()
            .ok_or(AuthError::InvalidResetToken)?;

        user.hashed_password = self.hasher.hash(new_password)?;
        user.reset_token = None;
        let user = self.store.save(user)?;

        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;
    use std::cell::Cell;

    /// In-memory backend whose writes can be switched to fail
    #[derive(Default)]
    struct SwitchablePersistence {
        inner: MemoryPersistence,
        failing: Cell<bool>,
    }

    impl Persistence for SwitchablePersistence {
        fn load(&self) -> Result<Vec<User>, StoreError> {
            self.inner.load()
        }

        fn store(&mut self, users: &[User]) -> Result<(), StoreError> {
            if self.failing.get() {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.store(users)
        }
    }

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4, 8, 1).unwrap()
    }

    #[test]
    fn test_register_then_login() {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());

        let bob = auth.register_user("bob@example.com", "secret123").unwrap();
        assert!(matches!(
            auth.register_user("bob@example.com", "other"),
            Err(AuthError::EmailAlreadyRegistered)
        ));
        assert!(auth.valid_login("bob@example.com", "secret123"));
        assert!(!auth.valid_login("bob@example.com", "secret"));
        assert!(!auth.valid_login("alice@example.com", "secret123"));

        let token = auth.login("bob@example.com", "secret123").unwrap();
        assert_eq!(token.user.id, bob.id);
        assert_eq!(token.user.session_id.as_deref(), Some(token.session_id.as_str()));
        assert_eq!(
            token.cookie,
            SessionCookie::Set {
                name: "session_id".to_string(),
                value: token.session_id.clone()
            }
        );
        assert_eq!(auth.current_user(Some(&token.session_id)).unwrap().id, bob.id);
    }

    #[test]
    fn test_login_rejections() {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        auth.register_user("bob@example.com", "secret123").unwrap();

        assert!(matches!(
            auth.login("alice@example.com", "secret123"),
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.login("bob@example.com", "wrong"),
            Err(AuthError::InvalidPassword)
        ));
        drop(auth);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_relogin_replaces_session() {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        auth.register_user("bob@example.com", "secret123").unwrap();

        let first = auth.login("bob@example.com", "secret123").unwrap();
        let second = auth.login("bob@example.com", "secret123").unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert!(matches!(
            auth.current_user(Some(&first.session_id)),
            Err(AuthError::UnknownSession)
        ));
        assert!(auth.current_user(Some(&second.session_id)).is_ok());
        drop(auth);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_failed_login_keeps_previous_session() {
        let mut store = UserStore::open(SwitchablePersistence::default()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        auth.register_user("bob@example.com", "secret123").unwrap();
        let first = auth.login("bob@example.com", "secret123").unwrap();
        drop(auth);

        store.persistence().failing.set(true);
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        assert!(matches!(
            auth.login("bob@example.com", "secret123"),
            Err(AuthError::Store(StoreError::Io(_)))
        ));
        assert_eq!(
            auth.current_user(Some(&first.session_id)).unwrap().id,
            first.user.id
        );
        drop(auth);

        assert_eq!(sessions.len(), 1);
        assert_eq!(
            store.find_by_email("bob@example.com").unwrap().session_id,
            Some(first.session_id)
        );
    }

    #[test]
    fn test_logout() {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        auth.register_user("bob@example.com", "secret123").unwrap();
        let token = auth.login("bob@example.com", "secret123").unwrap();

        assert!(auth.logout(&token.session_id));
        assert!(!auth.logout(&token.session_id));
        assert!(!auth.logout("never-issued"));
        assert!(matches!(
            auth.current_user(Some(&token.session_id)),
            Err(AuthError::UnknownSession)
        ));
        drop(auth);
        assert_eq!(
            store.find_by_email("bob@example.com").unwrap().session_id,
            None
        );
    }

    #[test]
    fn test_password_reset() {
        let mut store = UserStore::open(MemoryPersistence::new()).unwrap();
        let mut sessions = SessionAuth::default();
        let mut auth = AuthService::new(&mut store, &mut sessions, hasher());
        auth.register_user("guillaume@holberton.io", "b4l0u").unwrap();

        assert!(matches!(
            auth.get_reset_password_token("nobody@holberton.io"),
            Err(AuthError::UserNotFound)
        ));

        let token = auth.get_reset_password_token("guillaume@holberton.io").unwrap();
        assert!(matches!(
            auth.update_password("bogus", "t4rt1fl3tt3"),
            Err(AuthError::InvalidResetToken)
        ));
        auth.update_password(&token, "t4rt1fl3tt3").unwrap();

        assert!(!auth.valid_login("guillaume@holberton.io", "b4l0u"));
        assert!(auth.login("guillaume@holberton.io", "t4rt1fl3tt3").is_ok());
        assert!(matches!(
            auth.update_password(&token, "again"),
            Err(AuthError::InvalidResetToken)
        ));
    }
}
