use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::products::{CreateProductRequest, ProductQuery, UpdateProductRequest},
    AppState,
};

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let producto = state
        .services
        .products
        .create_product(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "producto": producto,
    })))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let producto = state
        .services
        .products
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "producto": producto,
    })))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let productos = state
        .services
        .products
        .list_products(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "productos": productos,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", put(update_product))
}
