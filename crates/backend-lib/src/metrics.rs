// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_DESTROYED: &str = "session.destroyed";
pub const SESSION_ACTIVE: &str = "session.active";
pub const LOGIN_REJECTED: &str = "login.rejected";
pub const USER_REGISTERED: &str = "user.registered";
