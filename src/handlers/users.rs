use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::UserRole,
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::users::{LoginRequest, RegisterUserRequest, UpdateUserRequest},
    AppState,
};

fn require_admin(claims: &crate::auth::Claims) -> Result<(), ApiError> {
    if claims.role != UserRole::Admin {
        return Err(ApiError::Unauthorized(
            "Admin privileges required".to_string(),
        ));
    }
    Ok(())
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let usuario = state
        .services
        .users
        .register(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "usuario": usuario,
    })))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .users
        .login(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "usuario": result.usuario,
        "token": result.token,
    })))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;
    let usuarios = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "usuarios": usuarios,
    })))
}

async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let usuario = state
        .services
        .users
        .get_user(claims.sub)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "usuario": usuario,
    })))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Users may edit themselves; only admins may edit others.
    if claims.sub != id {
        require_admin(&claims)?;
    }

    let usuario = state
        .services
        .users
        .update_user(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "usuario": usuario,
    })))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;
    state
        .services
        .users
        .delete_user(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registrar", post(register_user))
        .route("/login", post(login_user))
        .route("/", get(list_users))
        .route("/perfil", get(profile))
        .route("/:id", put(update_user).delete(delete_user))
}
