use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::customers::{CreateCustomerRequest, CreditCustomersQuery},
    AppState,
};

async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cliente = state
        .services
        .customers
        .create_customer(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "cliente": cliente,
    })))
}

async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let clientes = state
        .services
        .customers
        .list_customers()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "clientes": clientes,
    })))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cliente = state
        .services
        .customers
        .get_customer(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "cliente": cliente,
    })))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cliente_id = state
        .services
        .customers
        .delete_customer(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "message": "Customer deleted successfully",
        "clienteId": cliente_id,
    })))
}

async fn credit_customers(
    State(state): State<AppState>,
    Query(query): Query<CreditCustomersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .customers
        .credit_customers(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "clientes": result.clientes,
        "totalClientes": result.total_clientes,
        "totalSaldoPendiente": result.total_saldo_pendiente,
    })))
}

async fn debtors(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let clientes = state
        .services
        .customers
        .debtors()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "clientes": clientes,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/credito", get(credit_customers))
        .route("/deudores", get(debtors))
        .route("/:id", get(get_customer).delete(delete_customer))
}
