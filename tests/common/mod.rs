#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rust_decimal::Decimal;
use uuid::Uuid;

use punto_venta_api::{
    app_router,
    config::AppConfig,
    db,
    entities::product,
    events,
    services::{
        customers::{CreateCustomerRequest, CustomerResponse},
        products::{CreateProductRequest, ProductResponse},
        sales::{CreateSaleRequest, SaleItemInput},
    },
    AppState,
};

use sea_orm::EntityTrait;

/// Test harness: application state backed by an in-memory SQLite database
/// with the real migrations applied.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _event_task: tokio::task::JoinHandle<()>,
}

pub async fn spawn_app() -> TestApp {
    let cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "test_secret_key_for_testing_purposes_only".to_string(),
        3600,
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );

    // A single connection keeps every query on the same in-memory database.
    let db_cfg = db::DbConfig {
        url: cfg.database_url.clone(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout: Duration::from_secs(5),
    };
    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    let (event_sender, event_rx) = events::channel();
    let event_task = tokio::spawn(events::process_events(event_rx));

    let state = AppState::new(Arc::new(pool), cfg, event_sender);
    let router = app_router(state.clone());

    TestApp {
        state,
        router,
        _event_task: event_task,
    }
}

pub async fn create_product(
    app: &TestApp,
    name: &str,
    barcode: &str,
    purchase_price: Decimal,
    sale_price: Decimal,
    stock: i32,
) -> ProductResponse {
    app.state
        .services
        .products
        .create_product(CreateProductRequest {
            codigo_barras: barcode.to_string(),
            nombre: name.to_string(),
            marca: None,
            precio_compra: purchase_price,
            precio_venta: sale_price,
            stock,
        })
        .await
        .expect("failed to create product")
}

pub async fn create_customer(app: &TestApp, name: &str) -> CustomerResponse {
    app.state
        .services
        .customers
        .create_customer(CreateCustomerRequest {
            nombre: name.to_string(),
            telefono: None,
            direccion: None,
            nit: None,
        })
        .await
        .expect("failed to create customer")
}

/// Current stock level, read straight from the products table.
pub async fn product_stock(app: &TestApp, product_id: Uuid) -> i32 {
    product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .expect("query failed")
        .expect("product missing")
        .stock
}

/// Minimal cash-sale request with one line.
pub fn cash_sale(product_id: Uuid, quantity: i32, unit_price: Option<Decimal>) -> CreateSaleRequest {
    CreateSaleRequest {
        cliente_id: None,
        tipo_pago: punto_venta_api::entities::PaymentType::Cash,
        items: vec![SaleItemInput {
            producto_id: product_id,
            cantidad: quantity,
            precio_unitario: unit_price,
        }],
        impuesto: Decimal::ZERO,
        usuario_id: None,
        abono_inicial: Decimal::ZERO,
        plazo_dias: None,
        numero_abonos: None,
    }
}

/// Credit-sale request with one line and the standard 30-day / 2-installment
/// plan used across tests.
pub fn credit_sale(
    customer_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Option<Decimal>,
) -> CreateSaleRequest {
    CreateSaleRequest {
        cliente_id: Some(customer_id),
        tipo_pago: punto_venta_api::entities::PaymentType::Credit,
        items: vec![SaleItemInput {
            producto_id: product_id,
            cantidad: quantity,
            precio_unitario: unit_price,
        }],
        impuesto: Decimal::ZERO,
        usuario_id: None,
        abono_inicial: Decimal::ZERO,
        plazo_dias: Some(30),
        numero_abonos: Some(2),
    }
}
