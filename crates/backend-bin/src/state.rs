// ============================
// crates/backend-bin/src/state.rs
// ============================
//! Application state shared across all handlers.
use anyhow::Context;
use parking_lot::Mutex;
use std::sync::Arc;
use userauth_lib::{
    auth::PasswordError, AuthService, FlatFilePersistence, PasswordHasher, Persistence,
    SessionAuth, Settings, UserStore,
};

use crate::error::AppError;

/// Store and session registry, locked together
pub struct AuthState<P> {
    pub store: UserStore<P>,
    pub sessions: SessionAuth,
}

pub struct AppState<P> {
    inner: Arc<Mutex<AuthState<P>>>,
    /// Configuration settings
    pub settings: Arc<Settings>,
    /// Password hasher built from settings
    pub hasher: PasswordHasher,
}

// `P` itself need not be `Clone`
impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            settings: Arc::clone(&self.settings),
            hasher: self.hasher,
        }
    }
}

impl<P: Persistence> AppState<P> {
    /// Create a new application state
    pub fn new(store: UserStore<P>, settings: Settings) -> Result<Self, PasswordError> {
        let hasher = PasswordHasher::from_settings(&settings.hasher)?;
        let mut sessions =
            SessionAuth::new(settings.session_name.clone()).with_duration(settings.session_duration());
        sessions.restore(store.iter());

        Ok(Self {
            inner: Arc::new(Mutex::new(AuthState { store, sessions })),
            settings: Arc::new(settings),
            hasher,
        })
    }
}

impl AppState<FlatFilePersistence> {
    /// State over the flat file named in `settings`
    pub fn open(settings: Settings) -> anyhow::Result<Self> {
        let store = UserStore::open(FlatFilePersistence::new(&settings.data_file))
            .with_context(|| format!("opening {}", settings.data_file.display()))?;
        Ok(Self::new(store, settings)?)
    }
}

impl<P: Persistence + Send + 'static> AppState<P> {
    /// Run `f` with the locked state on the blocking pool.
    /// Password hashing is CPU-bound, so it stays off the async workers.
    pub async fn with_state<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut AuthState<P>) -> T + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            f(&mut *guard)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Run `f` against the auth-service façade
    pub async fn with_auth<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut AuthService<'_, P>) -> T + Send + 'static,
    {
        let hasher = self.hasher;
        self.with_state(move |state| {
            let AuthState { store, sessions } = state;
            let mut service = AuthService::new(store, sessions, hasher);
            f(&mut service)
        })
        .await
    }
}
