pub mod common;
pub mod customers;
pub mod expenses;
pub mod health;
pub mod products;
pub mod reports;
pub mod sales;
pub mod users;

use axum::{routing::get, Router};

use crate::AppState;

/// Assembles the full API surface.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .nest("/ventas", sales::routes())
        .nest("/clientes", customers::routes())
        .nest("/productos", products::routes())
        .nest("/gastos", expenses::routes())
        .nest("/reportes", reports::routes())
        .nest("/usuarios", users::routes())
}
