use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        password::StoredPassword,
        services::{hash_password_blocking, verify_password_blocking},
    },
    error::ApiError,
    extract::ApiJson,
    state::AppState,
};

use super::{
    dto::{MessageResponse, PublicUser, UpdatePasswordRequest, UpdateUserRequest},
    repo::User,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/:id", get(get_user))
        .route("/users/:id", put(update_user))
        .route("/users/:id/password", put(update_password))
        .route("/users/:id", delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}

/// PUT /users/:id — profile update, self-only.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if user_id != id {
        warn!(caller = %user_id, target = %id, "cross-user profile update rejected");
        return Err(ApiError::Forbidden(
            "Forbidden: You can only update your own profile".into(),
        ));
    }

    // Empty strings count as absent fields.
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation(
            "At least one field (username or email) is required".into(),
        ));
    }

    // A new email must not belong to anyone but the caller.
    if let Some(ref email) = email {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != id {
                return Err(ApiError::Conflict("Email is already taken".into()));
            }
        }
    }

    let updated = User::update_profile(&state.db, id, username, email.as_deref()).await?;
    info!(user_id = %id, "profile updated");
    Ok(Json(updated.into()))
}

/// PUT /users/:id/password — password change, self-only, re-verifies the
/// current password before accepting a new one.
#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if user_id != id {
        warn!(caller = %user_id, target = %id, "cross-user password change rejected");
        return Err(ApiError::Forbidden(
            "Forbidden: You can only update your own password".into(),
        ));
    }

    let current_password = payload.current_password.unwrap_or_default();
    let new_password = payload.new_password.unwrap_or_default();

    if current_password.is_empty() || new_password.is_empty() {
        return Err(ApiError::Validation(
            "Current password and new password are required".into(),
        ));
    }

    if new_password.len() < 6 {
        return Err(ApiError::Validation(
            "New password must be at least 6 characters".into(),
        ));
    }

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let stored = StoredPassword::parse(&user.password_hash);
    let ok = verify_password_blocking(current_password, stored).await?;
    if !ok {
        warn!(user_id = %id, "password change with wrong current password");
        return Err(ApiError::Authentication(
            "Current password is incorrect".into(),
        ));
    }

    let hash = hash_password_blocking(new_password).await?;
    User::update_password(&state.db, id, &hash).await?;

    info!(user_id = %id, "password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

/// DELETE /users/:id — account deletion, self-only.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if user_id != id {
        warn!(caller = %user_id, target = %id, "cross-user account deletion rejected");
        return Err(ApiError::Forbidden(
            "Forbidden: You can only delete your own account".into(),
        ));
    }

    User::delete(&state.db, id).await?;

    info!(user_id = %id, "account deleted");
    Ok(Json(MessageResponse {
        message: "User account deleted successfully".into(),
    }))
}
