use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    common::DateRangeParams,
    errors::ApiError,
    handlers::common::{map_service_error, success_response},
    services::reports::SaleFilter,
    AppState,
};

#[derive(Debug, Deserialize)]
struct ProfitQuery {
    desde: Option<String>,
    hasta: Option<String>,
    tipo_ventas: Option<SaleFilter>,
}

/// GET /reportes/ganancias?desde=2026-01-01&hasta=2026-12-31&tipo_ventas=pagadas
async fn profit_for_period(
    State(state): State<AppState>,
    Query(query): Query<ProfitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = DateRangeParams {
        desde: query.desde,
        hasta: query.hasta,
    };
    let (desde, hasta) = range.parse().map_err(map_service_error)?;

    let report = state
        .services
        .reports
        .profit_for_period(desde, hasta, query.tipo_ventas.unwrap_or_default())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "success": true,
        "ingresos": report.ingresos,
        "costo_ventas": report.costo_ventas,
        "total_gastos": report.total_gastos,
        "utilidad_bruta": report.utilidad_bruta,
        "utilidad_neta": report.utilidad_neta,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ganancias", get(profit_for_period))
}
