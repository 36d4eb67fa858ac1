use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::expenses::CreateExpenseRequest,
    AppState,
};

async fn create_expense(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(mut payload): Json<CreateExpenseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    payload.usuario_id = payload.usuario_id.or(Some(claims.sub));

    let gasto = state
        .services
        .expenses
        .create_expense(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "gasto": gasto,
    })))
}

async fn list_expenses(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let gastos = state
        .services
        .expenses
        .list_expenses()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "gastos": gastos,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_expenses).post(create_expense))
}
