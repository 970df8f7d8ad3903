//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, UpdateRole, User},
};

use super::AuthenticatedUser;

/// List user accounts (staff)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User accounts", body = Vec<User>),
        (status = 403, description = "Not allowed to browse accounts")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list_users(&session).await?;
    Ok(Json(users))
}

/// Get one account: one's own, or any account for staff
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(&session, &id).await?;
    Ok(Json(user))
}

/// Create an account document
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Role not grantable by the caller"),
        (status = 409, description = "Account id already exists")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(request): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.users.create_user(&session, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Change a user's role (admin only, never one's own)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 404, description = "User not found"),
        (status = 422, description = "Attempted self-role-change")
    )
)]
pub async fn update_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    let user = state
        .services
        .users
        .change_role(&session, &id, request.role)
        .await?;
    Ok(Json(user))
}
