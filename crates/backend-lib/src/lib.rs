// ============================
// userauth-lib/src/lib.rs
// ============================
//! User store, Basic and Session authentication, and the auth-service façade.
//!
//! Everything here is synchronous and free of global state: the caller owns
//! the [`UserStore`] and the [`SessionAuth`] registry and lends them to each
//! operation.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod redact;
pub mod storage;
pub mod store;
pub mod validation;

pub use auth::{
    require_auth, AuthRequest, AuthService, Authenticator, BasicAuth, PasswordHasher, SessionAuth,
    SessionCookie, SessionToken,
};
pub use config::{AuthType, Settings};
pub use error::{AuthError, StoreError};
pub use storage::{FlatFilePersistence, MemoryPersistence, Persistence};
pub use store::UserStore;
pub use userauth_common::{SessionEntry, SessionId, User, UserId};
