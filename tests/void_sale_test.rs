mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{cash_sale, create_customer, create_product, credit_sale, product_stock, spawn_app};
use punto_venta_api::{
    entities::{payment, sale_line, SaleStatus},
    errors::ServiceError,
    services::sales::RegisterPaymentRequest,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[tokio::test]
async fn voiding_restores_stock_and_soft_deletes_children() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Jose").await;
    let product = create_product(&app, "Aceite", "7502000100", dec!(8.00), dec!(15.00), 10).await;

    let mut request = credit_sale(customer.id, product.id, 4, None);
    request.abono_inicial = dec!(10.00);
    let venta = app.state.services.sales.create_sale(request).await.unwrap();
    assert_eq!(product_stock(&app, product.id).await, 6);

    let voided = app.state.services.sales.void_sale(venta.id).await.unwrap();
    assert_eq!(voided.estado, SaleStatus::Voided);
    assert_eq!(voided.saldo_pendiente, Decimal::ZERO);
    assert_eq!(product_stock(&app, product.id).await, 10);

    // Lines and payments still exist as rows, but are flagged deleted.
    let lines = sale_line::Entity::find()
        .filter(sale_line::Column::SaleId.eq(venta.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines.iter().all(|l| l.deleted_at.is_some()));

    let payments = payment::Entity::find()
        .filter(payment::Column::SaleId.eq(venta.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert!(payments.iter().all(|p| p.deleted_at.is_some()));

    // The sale itself survives for history, with empty active children.
    let fetched = app.state.services.sales.get_sale(venta.id).await.unwrap();
    assert_eq!(fetched.estado, SaleStatus::Voided);
    assert!(fetched.detalles.is_empty());
    assert!(fetched.abonos.is_empty());
}

#[tokio::test]
async fn second_void_fails_without_touching_stock() {
    let app = spawn_app().await;
    let product = create_product(&app, "Arroz", "7502000101", dec!(4.00), dec!(7.00), 10).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 3, None))
        .await
        .unwrap();
    app.state.services.sales.void_sale(venta.id).await.unwrap();
    assert_eq!(product_stock(&app, product.id).await, 10);

    let again = app.state.services.sales.void_sale(venta.id).await;
    assert_matches!(again, Err(ServiceError::Conflict(_)));

    // Idempotent failure: stock was not restored twice.
    assert_eq!(product_stock(&app, product.id).await, 10);
}

#[tokio::test]
async fn voiding_a_cash_paid_sale_works() {
    let app = spawn_app().await;
    let product = create_product(&app, "Frijol", "7502000102", dec!(2.00), dec!(3.50), 8).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 2, None))
        .await
        .unwrap();
    assert_eq!(venta.estado, SaleStatus::Paid);

    let voided = app.state.services.sales.void_sale(venta.id).await.unwrap();
    assert_eq!(voided.estado, SaleStatus::Voided);
    assert_eq!(voided.saldo_pendiente, Decimal::ZERO);
    assert_eq!(product_stock(&app, product.id).await, 8);
}

#[tokio::test]
async fn voiding_missing_sale_fails_with_not_found() {
    let app = spawn_app().await;
    let result = app.state.services.sales.void_sale(Uuid::new_v4()).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn payments_against_voided_sales_are_rejected() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Rosa").await;
    let product = create_product(&app, "Miel", "7502000103", dec!(5.00), dec!(9.00), 10).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(credit_sale(customer.id, product.id, 2, None))
        .await
        .unwrap();
    app.state.services.sales.void_sale(venta.id).await.unwrap();

    let result = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(5.00),
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}
