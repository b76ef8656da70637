use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{error::ApiError, extract::ApiJson, state::AppState};

use super::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    services::{self, is_valid_email},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = payload.username.unwrap_or_default().trim().to_string();
    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    let user = services::register_user(&state.db, &username, &email, &password).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }

    let user = services::login_user(&state.db, &email, &password).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: user.into(),
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn assert_validation(err: ApiError, expected: &str) {
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, expected),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_rejects_missing_field() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            username: None,
            email: Some("alice@x.com".into()),
            password: Some("secret1".into()),
        };
        let err = register(State(state), ApiJson(payload)).await.unwrap_err();
        assert_validation(err, "All fields are required");
    }

    #[tokio::test]
    async fn register_rejects_blank_field() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            username: Some("  ".into()),
            email: Some("alice@x.com".into()),
            password: Some("secret1".into()),
        };
        let err = register(State(state), ApiJson(payload)).await.unwrap_err();
        assert_validation(err, "All fields are required");
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            username: Some("alice".into()),
            email: Some("not-an-email".into()),
            password: Some("secret1".into()),
        };
        let err = register(State(state), ApiJson(payload)).await.unwrap_err();
        assert_validation(err, "Invalid email");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            username: Some("alice".into()),
            email: Some("alice@x.com".into()),
            password: Some("abc".into()),
        };
        let err = register(State(state), ApiJson(payload)).await.unwrap_err();
        assert_validation(err, "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn login_rejects_missing_password() {
        let state = AppState::fake();
        let payload = LoginRequest {
            email: Some("alice@x.com".into()),
            password: None,
        };
        let err = login(State(state), ApiJson(payload)).await.unwrap_err();
        assert_validation(err, "Email and password are required");
    }
}
