mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{cash_sale, create_customer, create_product, credit_sale, product_stock, spawn_app};
use punto_venta_api::{
    entities::{sale, PaymentType, SaleStatus},
    errors::ServiceError,
    services::sales::{RegisterPaymentRequest, SaleItemInput},
};
use sea_orm::EntityTrait;

#[tokio::test]
async fn cash_sale_is_paid_with_zero_balance() {
    let app = spawn_app().await;
    let product = create_product(&app, "Cola 600ml", "7501000100", dec!(8.00), dec!(12.50), 10).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 3, None))
        .await
        .unwrap();

    assert_eq!(venta.estado, SaleStatus::Paid);
    assert_eq!(venta.saldo_pendiente, Decimal::ZERO);
    assert_eq!(venta.subtotal, dec!(37.50));
    assert_eq!(venta.total, dec!(37.50));
    assert_eq!(venta.utilidad_total, dec!(13.50));
    assert_eq!(venta.detalles.len(), 1);
    assert_eq!(venta.detalles[0].costo_unitario, dec!(8.00));

    // Stock moved inside the same unit of work.
    assert_eq!(product_stock(&app, product.id).await, 7);
}

#[tokio::test]
async fn line_subtotals_round_to_two_decimals() {
    let app = spawn_app().await;
    let product = create_product(&app, "Cable USB", "7501000101", dec!(10.00), dec!(19.99), 50).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 3, None))
        .await
        .unwrap();

    assert_eq!(venta.detalles[0].subtotal, dec!(59.97));
    assert_eq!(venta.total, dec!(59.97));
}

#[tokio::test]
async fn explicit_unit_price_overrides_catalog_price() {
    let app = spawn_app().await;
    let product = create_product(&app, "Harina 1kg", "7501000102", dec!(3.00), dec!(5.00), 20).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 2, Some(dec!(4.50))))
        .await
        .unwrap();

    assert_eq!(venta.detalles[0].precio_unitario, dec!(4.50));
    assert_eq!(venta.total, dec!(9.00));
}

#[tokio::test]
async fn credit_sale_scenario_pays_down_to_zero() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Jose Perez").await;
    let product = create_product(&app, "Aceite 1L", "7501000103", dec!(8.00), dec!(15.00), 10).await;

    // Credit sale: 2 × 12.00, 30-day term, 2 planned installments.
    let venta = app
        .state
        .services
        .sales
        .create_sale(credit_sale(customer.id, product.id, 2, Some(dec!(12.00))))
        .await
        .unwrap();

    assert_eq!(venta.total, dec!(24.00));
    assert_eq!(venta.estado, SaleStatus::Pending);
    assert_eq!(venta.saldo_pendiente, dec!(24.00));

    // First installment: 10.00 → balance 14.00, still pending.
    let first = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(10.00),
                usuario_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.venta.saldo_pendiente, dec!(14.00));
    assert_eq!(first.venta.estado, SaleStatus::Pending);

    // Second installment: 14.00 → balance 0, paid.
    let second = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(14.00),
                usuario_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(second.venta.saldo_pendiente, Decimal::ZERO);
    assert_eq!(second.venta.estado, SaleStatus::Paid);
    assert_eq!(second.venta.abonos.len(), 2);

    // Third attempt hits the installment limit.
    let third = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(1.00),
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(third, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn balance_never_goes_negative() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Maria Lopez").await;
    let product = create_product(&app, "Azucar 2kg", "7501000104", dec!(2.00), dec!(4.00), 10).await;

    let mut request = credit_sale(customer.id, product.id, 5, None);
    request.numero_abonos = Some(5);
    let venta = app.state.services.sales.create_sale(request).await.unwrap();
    assert_eq!(venta.saldo_pendiente, dec!(20.00));

    let result = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(20.01),
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    // Balance untouched by the rejected payment.
    let after = app.state.services.sales.get_sale(venta.id).await.unwrap();
    assert_eq!(after.saldo_pendiente, dec!(20.00));
    assert!(after.abonos.is_empty());
}

#[tokio::test]
async fn non_positive_payment_amount_is_rejected() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Luis").await;
    let product = create_product(&app, "Sal 1kg", "7501000105", dec!(1.00), dec!(2.00), 10).await;

    let venta = app
        .state
        .services
        .sales
        .create_sale(credit_sale(customer.id, product.id, 1, None))
        .await
        .unwrap();

    let result = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: Decimal::ZERO,
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn payment_against_missing_or_cash_sale_fails() {
    let app = spawn_app().await;
    let product = create_product(&app, "Pan", "7501000106", dec!(0.50), dec!(1.00), 10).await;

    let missing = app
        .state
        .services
        .sales
        .register_payment(
            Uuid::new_v4(),
            RegisterPaymentRequest {
                monto: dec!(1.00),
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));

    let venta = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 1, None))
        .await
        .unwrap();
    let on_cash = app
        .state
        .services
        .sales
        .register_payment(
            venta.id,
            RegisterPaymentRequest {
                monto: dec!(1.00),
                usuario_id: None,
            },
        )
        .await;
    assert_matches!(on_cash, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let app = spawn_app().await;
    let product = create_product(&app, "Cafe", "7501000107", dec!(5.00), dec!(9.00), 10).await;

    let mut request = cash_sale(product.id, 1, None);
    request.items.clear();

    let result = app.state.services.sales.create_sale(request).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn credit_sale_requires_customer_term_and_installments() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Carlos").await;
    let product = create_product(&app, "Arroz 5kg", "7501000108", dec!(4.00), dec!(7.00), 10).await;

    let mut no_customer = credit_sale(customer.id, product.id, 1, None);
    no_customer.cliente_id = None;
    assert_matches!(
        app.state.services.sales.create_sale(no_customer).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut bad_term = credit_sale(customer.id, product.id, 1, None);
    bad_term.plazo_dias = Some(0);
    assert_matches!(
        app.state.services.sales.create_sale(bad_term).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut no_installments = credit_sale(customer.id, product.id, 1, None);
    no_installments.numero_abonos = None;
    assert_matches!(
        app.state.services.sales.create_sale(no_installments).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn insufficient_stock_leaves_stock_untouched() {
    let app = spawn_app().await;
    let product = create_product(&app, "Leche 1L", "7501000109", dec!(1.20), dec!(2.00), 3).await;

    let result = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 5, None))
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(product_stock(&app, product.id).await, 3);

    // No sale row escaped the rolled-back transaction.
    let sales = sale::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(sales.is_empty());
}

#[tokio::test]
async fn unknown_product_fails_with_not_found() {
    let app = spawn_app().await;

    let result = app
        .state
        .services
        .sales
        .create_sale(cash_sale(Uuid::new_v4(), 1, None))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let app = spawn_app().await;
    let product = create_product(&app, "Jabon", "7501000110", dec!(1.00), dec!(2.00), 10).await;

    let result = app
        .state
        .services
        .sales
        .create_sale(cash_sale(product.id, 0, None))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn initial_payment_reduces_balance() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Ana").await;
    let product = create_product(&app, "Atun", "7501000111", dec!(1.00), dec!(10.00), 10).await;

    let mut request = credit_sale(customer.id, product.id, 5, None);
    request.abono_inicial = dec!(20.00);

    let venta = app.state.services.sales.create_sale(request).await.unwrap();
    assert_eq!(venta.total, dec!(50.00));
    assert_eq!(venta.saldo_pendiente, dec!(30.00));
    assert_eq!(venta.estado, SaleStatus::Pending);
    assert_eq!(venta.abonos.len(), 1);
    assert_eq!(venta.abonos[0].monto, dec!(20.00));
}

#[tokio::test]
async fn full_initial_payment_marks_sale_paid() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Pedro").await;
    let product = create_product(&app, "Yogur", "7501000112", dec!(1.00), dec!(10.00), 10).await;

    let mut request = credit_sale(customer.id, product.id, 2, None);
    request.abono_inicial = dec!(20.00);

    let venta = app.state.services.sales.create_sale(request).await.unwrap();
    assert_eq!(venta.saldo_pendiente, Decimal::ZERO);
    assert_eq!(venta.estado, SaleStatus::Paid);
}

#[tokio::test]
async fn excessive_initial_payment_rolls_back_everything() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Lucia").await;
    let product = create_product(&app, "Queso", "7501000113", dec!(2.00), dec!(10.00), 10).await;

    let mut request = credit_sale(customer.id, product.id, 2, None);
    request.abono_inicial = dec!(25.00); // total is 20.00

    let result = app.state.services.sales.create_sale(request).await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    // The whole transaction rolled back: no sale, no stock movement.
    assert_eq!(product_stock(&app, product.id).await, 10);
    let sales = sale::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(sales.is_empty());
}

#[tokio::test]
async fn multi_line_sale_aggregates_lines() {
    let app = spawn_app().await;
    let first = create_product(&app, "Galletas", "7501000114", dec!(1.10), dec!(2.25), 10).await;
    let second = create_product(&app, "Jugo", "7501000115", dec!(0.80), dec!(1.75), 10).await;

    let mut request = cash_sale(first.id, 2, None);
    request.items.push(SaleItemInput {
        producto_id: second.id,
        cantidad: 4,
        precio_unitario: None,
    });
    request.impuesto = dec!(1.38);

    let venta = app.state.services.sales.create_sale(request).await.unwrap();

    // 2×2.25 = 4.50, 4×1.75 = 7.00; subtotal 11.50; total 12.88 with tax.
    assert_eq!(venta.subtotal, dec!(11.50));
    assert_eq!(venta.total, dec!(12.88));
    assert_eq!(venta.tipo_pago, PaymentType::Cash);
    assert_eq!(venta.detalles.len(), 2);
    assert_eq!(product_stock(&app, first.id).await, 8);
    assert_eq!(product_stock(&app, second.id).await, 6);
}

#[tokio::test]
async fn listing_filters_by_status_and_totals_per_status() {
    let app = spawn_app().await;
    let customer = create_customer(&app, "Marta").await;
    let product = create_product(&app, "Velas", "7501000116", dec!(0.50), dec!(2.00), 50).await;

    app.state
        .services
        .sales
        .create_sale(cash_sale(product.id, 2, None))
        .await
        .unwrap();
    app.state
        .services
        .sales
        .create_sale(credit_sale(customer.id, product.id, 3, None))
        .await
        .unwrap();

    let all = app
        .state
        .services
        .sales
        .list_sales(Default::default())
        .await
        .unwrap();
    assert_eq!(all.ventas.len(), 2);
    assert_eq!(all.totales_estado.get("pagado"), Some(&dec!(4.00)));
    assert_eq!(all.totales_estado.get("pendiente"), Some(&dec!(6.00)));

    let pending_only = app
        .state
        .services
        .sales
        .list_sales(punto_venta_api::services::sales::SaleListQuery {
            estado: Some(SaleStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending_only.ventas.len(), 1);
    assert_eq!(pending_only.ventas[0].estado, SaleStatus::Pending);
}
