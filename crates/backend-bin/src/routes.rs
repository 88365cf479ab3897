// ============================
// crates/backend-bin/src/routes.rs
// ============================
//! HTTP routes. Each handler parses the request, calls one façade operation
//! and shapes the response.
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Extension, Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use userauth_lib::{AuthError, Persistence, User};

use crate::error::AppError;
use crate::middleware::{auth_request, authenticate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordForm {
    email: Option<String>,
    reset_token: Option<String>,
    new_password: Option<String>,
}

/// `{"error": message}` with `status`
fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} missing")))
}

/// Create the application router
pub fn create_router<P: Persistence + Send + 'static>(state: AppState<P>) -> Router {
    let api = Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/auth_session/login", post(session_login::<P>))
        .route("/api/v1/auth_session/login/", post(session_login::<P>))
        .route("/api/v1/auth_session/logout", delete(session_logout::<P>))
        .route("/api/v1/auth_session/logout/", delete(session_logout::<P>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate::<P>,
        ));

    Router::new()
        .route("/", get(index))
        .route("/users", post(register::<P>))
        .route("/sessions", post(login::<P>).delete(logout::<P>))
        .route("/profile", get(profile::<P>))
        .route(
            "/reset_password",
            post(reset_password::<P>).put(update_password::<P>),
        )
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({ "message": "Bienvenue" }))
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

/// Current user as resolved by the authentication middleware
async fn me(Extension(user): Extension<User>) -> Json<serde_json::Value> {
    Json(user.to_json())
}

/// Session login under `/api/v1`: answers with the user and sets the cookie
async fn session_login<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let Some(email) = form.email.filter(|e| !e.is_empty()) else {
        return Ok(reject(StatusCode::BAD_REQUEST, "email missing"));
    };
    let Some(password) = form.password.filter(|p| !p.is_empty()) else {
        return Ok(reject(StatusCode::BAD_REQUEST, "password missing"));
    };

    match state
        .with_auth(move |auth| auth.login(&email, &password))
        .await?
    {
        Ok(token) => Ok((
            [(header::SET_COOKIE, token.cookie.to_string())],
            Json(token.user.to_json()),
        )
            .into_response()),
        Err(AuthError::UserNotFound) => Ok(reject(
            StatusCode::NOT_FOUND,
            "no user found for this email",
        )),
        Err(AuthError::InvalidPassword) => Ok(reject(StatusCode::UNAUTHORIZED, "wrong password")),
        Err(err) => Err(err.into()),
    }
}

async fn session_logout<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = auth_request(&headers)
        .cookie(&state.settings.session_name)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let destroyed = match session_id {
        Some(id) => state.with_auth(move |auth| auth.logout(&id)).await?,
        None => false,
    };
    if !destroyed {
        return Ok(reject(StatusCode::NOT_FOUND, "Not found"));
    }

    Ok(Json(json!({})).into_response())
}

async fn register<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let email = required(form.email, "email")?;
    let password = required(form.password, "password")?;

    let registered = {
        let email = email.clone();
        state
            .with_auth(move |auth| auth.register_user(&email, &password))
            .await?
    };

    match registered {
        Ok(_) => Ok(Json(json!({ "email": email, "message": "user created" })).into_response()),
        Err(AuthError::EmailAlreadyRegistered) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "email already registered" })),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn login<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let email = required(form.email, "email")?;
    let password = required(form.password, "password")?;

    let token = {
        let email = email.clone();
        state
            .with_auth(move |auth| auth.login(&email, &password))
            .await??
    };

    Ok((
        [(header::SET_COOKIE, token.cookie.to_string())],
        Json(json!({ "email": email, "message": "logged in" })),
    )
        .into_response())
}

async fn logout<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = auth_request(&headers)
        .cookie(&state.settings.session_name)
        .map(str::to_string)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::Forbidden)?;

    let (destroyed, clear) = state
        .with_auth(move |auth| (auth.logout(&session_id), auth.clear_cookie()))
        .await?;
    if !destroyed {
        return Err(AppError::Forbidden);
    }

    Ok((
        [(header::SET_COOKIE, clear.to_string())],
        Redirect::to("/"),
    )
        .into_response())
}

async fn profile<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let session_id = auth_request(&headers)
        .cookie(&state.settings.session_name)
        .map(str::to_string);

    let user = state
        .with_auth(move |auth| auth.current_user(session_id.as_deref()))
        .await?
        .map_err(|_| AppError::Forbidden)?;

    Ok(Json(json!({ "email": user.email })))
}

async fn reset_password<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<ResetRequestForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = form
        .email
        .filter(|e| !e.is_empty())
        .ok_or(AppError::Forbidden)?;

    let reset_token = {
        let email = email.clone();
        state
            .with_auth(move |auth| auth.get_reset_password_token(&email))
            .await?
            .map_err(|err| match err {
                AuthError::UserNotFound => AppError::Forbidden,
                other => other.into(),
            })?
    };

    Ok(Json(json!({ "email": email, "reset_token": reset_token })))
}

async fn update_password<P: Persistence + Send + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<UpdatePasswordForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = required(form.email, "email")?;
    let reset_token = required(form.reset_token, "reset_token")?;
    let new_password = required(form.new_password, "new_password")?;

    state
        .with_auth(move |auth| auth.update_password(&reset_token, &new_password))
        .await?
        .map_err(|err| match err {
            AuthError::InvalidResetToken => AppError::Forbidden,
            other => other.into(),
        })?;

    Ok(Json(json!({ "email": email, "message": "Password updated" })))
}
