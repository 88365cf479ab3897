// crates/backend-bin/src/middleware.rs

//! Authentication middleware for the `/api/v1` routes.
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use userauth_lib::{
    require_auth, AuthError, AuthRequest, AuthType, Authenticator, BasicAuth, Persistence,
};

use crate::error::AppError;
use crate::state::AppState;

/// Framework-neutral view of the request headers
pub fn auth_request(headers: &HeaderMap) -> AuthRequest {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let cookies = headers.get(header::COOKIE).and_then(|h| h.to_str().ok());
    AuthRequest::from_headers(authorization, cookies)
}

/// Resolve the current user with the configured authenticator and attach it
/// to the request. Excluded paths pass through untouched.
pub async fn authenticate<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    if !require_auth(&path, &state.settings.excluded_paths) {
        return Ok(next.run(request).await);
    }

    let auth_request = auth_request(request.headers());
    let auth_type = state.settings.auth_type;
    let basic = BasicAuth::new(state.hasher);

    let user = state
        .with_state(move |locked| match auth_type {
            AuthType::BasicAuth => basic.current_user(&locked.store, &auth_request),
            AuthType::SessionAuth => locked.sessions.current_user(&locked.store, &auth_request),
        })
        .await?
        .map_err(|err| {
            tracing::debug!(%path, error = %err, "request rejected");
            match err {
                AuthError::MissingHeader | AuthError::NoSessionCookie => AppError::from(err),
                err if err.is_rejection() => AppError::Forbidden,
                err => AppError::from(err),
            }
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
