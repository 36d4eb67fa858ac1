use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response},
    services::sales::{CreateSaleRequest, RegisterPaymentRequest, SaleListQuery},
    AppState,
};

async fn create_sale(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(mut payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // The token identity wins over whatever the body claims.
    if let Some(AuthUser(claims)) = auth {
        payload.usuario_id = Some(claims.sub);
    }

    let venta = state
        .services
        .sales
        .create_sale(payload)
        .await
        .map_err(map_service_error)?;

    let utilidad_total = venta.utilidad_total;
    Ok(success_response(json!({
        "success": true,
        "venta": venta,
        "utilidad_total": utilidad_total,
    })))
}

async fn register_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    Json(mut payload): Json<RegisterPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(AuthUser(claims)) = auth {
        payload.usuario_id = Some(claims.sub);
    }

    let result = state
        .services
        .sales
        .register_payment(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "abono": result.abono,
        "venta": result.venta,
    })))
}

async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .sales
        .list_sales(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "ventas": result.ventas,
        "totalesEstado": result.totales_estado,
    })))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let venta = state
        .services
        .sales
        .get_sale(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "venta": venta,
    })))
}

async fn void_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let venta = state
        .services
        .sales
        .void_sale(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "message": "Sale voided successfully",
        "venta": venta,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sale).get(list_sales))
        .route("/:id", get(get_sale).delete(void_sale))
        .route("/:id/abonos", post(register_payment))
}
