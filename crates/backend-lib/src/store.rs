//! In-memory user collection backed by a [`Persistence`] implementation.
//!
//! Lookups are linear scans over the loaded records. Every mutation goes
//! through [`UserStore::save`], which hands the full record set to the backend.

use tracing::{debug, info};
use userauth_common::{User, UserId};

use crate::error::StoreError;
use crate::storage::Persistence;
use crate::validation::validate_email;

pub struct UserStore<P> {
    users: Vec<User>,
    persistence: P,
}

impl<P: Persistence> UserStore<P> {
    /// Load all records from `persistence`
    pub fn open(persistence: P) -> Result<Self, StoreError> {
        let users = persistence.load()?;
        info!(count = users.len(), "user store opened");
        Ok(Self { users, persistence })
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let found = self.users.iter().find(|u| u.email == email);
        debug!(%email, found = found.is_some(), "lookup by email");
        found
    }

    pub fn find_by_id(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_by_session_id(&self, session_id: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.session_id.as_deref() == Some(session_id))
    }

    pub fn find_by_reset_token(&self, token: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
    }

    /// Insert or replace `user` by id, then rewrite the backing store.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] when another record already
    /// holds the same email. On a backend failure the in-memory change is
    /// rolled back.
    pub fn save(&mut self, user: User) -> Result<User, StoreError> {
        if self
            .users
            .iter()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let previous = match self.users.iter().position(|u| u.id == user.id) {
            Some(idx) => Some((idx, std::mem::replace(&mut self.users[idx], user.clone()))),
            None => {
                self.users.push(user.clone());
                None
            }
        };

        if let Err(err) = self.persistence.store(&self.users) {
            match previous {
                Some((idx, old)) => self.users[idx] = old,
                None => {
                    self.users.pop();
                }
            }
            return Err(err);
        }

        debug!(user_id = %user.id, "user saved");
        Ok(user)
    }

    /// Create and save a new user with a validated email
    pub fn add_user(&mut self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        validate_email(email).map_err(|e| StoreError::InvalidEmail(e.to_string()))?;
        self.save(User::new(email, hashed_password))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}
