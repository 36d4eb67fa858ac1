use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    common::{round2, today_start, DateRangeParams},
    db::DbPool,
    entities::{payment, product, sale, sale_line, PaymentType, SaleStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryService,
};

/// One requested line of a sale. When `precio_unitario` is absent the
/// product's current sale price applies.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Option<Decimal>,
}

/// Request body for creating a sale (cash or credit).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleRequest {
    pub cliente_id: Option<Uuid>,
    #[serde(default)]
    pub tipo_pago: PaymentType,
    pub items: Vec<SaleItemInput>,
    #[serde(default)]
    pub impuesto: Decimal,
    pub usuario_id: Option<Uuid>,
    #[serde(default)]
    pub abono_inicial: Decimal,
    pub plazo_dias: Option<i32>,
    pub numero_abonos: Option<i32>,
}

/// Request body for registering an installment against a credit sale.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPaymentRequest {
    pub monto: Decimal,
    pub usuario_id: Option<Uuid>,
}

/// Filters for the sales listing. The default window is today.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleListQuery {
    pub cliente_id: Option<Uuid>,
    pub estado: Option<SaleStatus>,
    pub tipo_pago: Option<PaymentType>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleLineResponse {
    pub producto_id: Uuid,
    pub nombre_producto: String,
    pub codigo_barras: String,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub costo_unitario: Decimal,
    pub subtotal: Decimal,
    pub utilidad_real: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub monto: Decimal,
    pub usuario_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
}

impl From<&payment::Model> for PaymentResponse {
    fn from(model: &payment::Model) -> Self {
        Self {
            id: model.id,
            monto: model.amount,
            usuario_id: model.created_by,
            fecha: model.payment_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleResponse {
    pub id: Uuid,
    pub cliente_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub impuesto: Decimal,
    pub total: Decimal,
    pub tipo_pago: PaymentType,
    pub estado: SaleStatus,
    pub saldo_pendiente: Decimal,
    pub utilidad_total: Decimal,
    pub fecha: DateTime<Utc>,
    pub plazo_dias: Option<i32>,
    pub numero_abonos: Option<i32>,
    pub detalles: Vec<SaleLineResponse>,
    pub abonos: Vec<PaymentResponse>,
}

impl SaleResponse {
    fn from_model(
        model: sale::Model,
        detalles: Vec<SaleLineResponse>,
        abonos: Vec<PaymentResponse>,
    ) -> Self {
        Self {
            id: model.id,
            cliente_id: model.customer_id,
            subtotal: model.subtotal,
            impuesto: model.tax,
            total: model.total,
            tipo_pago: model.payment_type,
            estado: model.status,
            saldo_pendiente: model.balance,
            utilidad_total: model.total_profit,
            fecha: model.sale_date,
            plazo_dias: model.credit_term_days,
            numero_abonos: model.installment_count,
            detalles,
            abonos,
        }
    }
}

/// Sales listing plus per-status totals over the returned set.
#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub ventas: Vec<SaleResponse>,
    #[serde(rename = "totalesEstado")]
    pub totales_estado: HashMap<String, Decimal>,
}

/// Result of registering an installment: the new payment and the updated sale.
#[derive(Debug, Serialize)]
pub struct PaymentRegistered {
    pub abono: PaymentResponse,
    pub venta: SaleResponse,
}

/// Amounts derived from one sale line. Rounding happens here, per line;
/// aggregates are rounded again when the total is formed.
fn compute_line(unit_price: Decimal, unit_cost: Decimal, quantity: i32) -> (Decimal, Decimal, Decimal) {
    let qty = Decimal::from(quantity);
    let subtotal = round2(unit_price * qty);
    let cost = round2(unit_cost * qty);
    let profit = subtotal - cost;
    (subtotal, cost, profit)
}

struct PreparedLine {
    product: product::Model,
    quantity: i32,
    unit_price: Decimal,
    subtotal: Decimal,
    profit: Decimal,
}

/// The sale engine: creates sales, voids them, and applies installments.
///
/// Each public operation is one database transaction; any failure after
/// `begin` rolls the whole unit back, including stock adjustments made
/// through the inventory ledger.
#[derive(Clone)]
pub struct SaleService {
    db: Arc<DbPool>,
    inventory: InventoryService,
    event_sender: Option<Arc<EventSender>>,
}

impl SaleService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db,
            inventory: InventoryService::new(),
            event_sender,
        }
    }

    /// Creates a sale with its lines, decrements stock, and optionally applies
    /// an initial installment on credit sales.
    #[instrument(skip(self, request), fields(tipo_pago = ?request.tipo_pago, items = request.items.len()))]
    pub async fn create_sale(&self, request: CreateSaleRequest) -> Result<SaleResponse, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Sale has no items".to_string(),
            ));
        }

        if request.tipo_pago == PaymentType::Credit {
            if request.cliente_id.is_none() {
                return Err(ServiceError::ValidationError(
                    "A customer is required for credit sales".to_string(),
                ));
            }
            if !matches!(request.plazo_dias, Some(days) if days > 0) {
                return Err(ServiceError::ValidationError(
                    "The credit term in days must be specified".to_string(),
                ));
            }
            if !matches!(request.numero_abonos, Some(count) if count > 0) {
                return Err(ServiceError::ValidationError(
                    "The number of installments must be specified".to_string(),
                ));
            }
        }

        let db = &*self.db;
        let now = Utc::now();
        let sale_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for sale creation");
            ServiceError::DatabaseError(e)
        })?;

        // Validate every line before any write.
        let mut subtotal = Decimal::ZERO;
        let mut total_profit = Decimal::ZERO;
        let mut prepared = Vec::with_capacity(request.items.len());

        for item in &request.items {
            if item.cantidad <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity must be positive for product {}",
                    item.producto_id
                )));
            }

            let product = self
                .inventory
                .reserve(&txn, item.producto_id, item.cantidad)
                .await?;

            let unit_price = item.precio_unitario.unwrap_or(product.sale_price);
            let (line_subtotal, _line_cost, line_profit) =
                compute_line(unit_price, product.purchase_price, item.cantidad);

            subtotal += line_subtotal;
            total_profit += line_profit;

            prepared.push(PreparedLine {
                product,
                quantity: item.cantidad,
                unit_price,
                subtotal: line_subtotal,
                profit: line_profit,
            });
        }

        let total = round2(subtotal + request.impuesto);
        let (status, balance) = match request.tipo_pago {
            PaymentType::Cash => (SaleStatus::Paid, Decimal::ZERO),
            PaymentType::Credit => (SaleStatus::Pending, total),
        };

        let mut sale = sale::ActiveModel {
            id: Set(sale_id),
            customer_id: Set(request.cliente_id),
            subtotal: Set(subtotal),
            tax: Set(request.impuesto),
            total: Set(total),
            payment_type: Set(request.tipo_pago),
            status: Set(status),
            balance: Set(balance),
            total_profit: Set(total_profit),
            sale_date: Set(now),
            created_by: Set(request.usuario_id),
            credit_term_days: Set(request.plazo_dias),
            installment_count: Set(request.numero_abonos),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to insert sale");
            ServiceError::DatabaseError(e)
        })?;

        // Persist lines with the captured unit cost and move the stock.
        let mut detalles = Vec::with_capacity(prepared.len());
        for line in prepared {
            sale_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(line.product.id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                unit_cost: Set(line.product.purchase_price),
                subtotal: Set(line.subtotal),
                profit: Set(line.profit),
                created_at: Set(now),
                deleted_at: Set(None),
            }
            .insert(&txn)
            .await?;

            detalles.push(SaleLineResponse {
                producto_id: line.product.id,
                nombre_producto: line.product.name.clone(),
                codigo_barras: line.product.barcode.clone(),
                cantidad: line.quantity,
                precio_unitario: line.unit_price,
                costo_unitario: line.product.purchase_price,
                subtotal: line.subtotal,
                utilidad_real: line.profit,
            });

            self.inventory
                .commit_decrement(&txn, line.product, line.quantity)
                .await?;
        }

        // Optional initial installment on credit sales.
        let mut abonos = Vec::new();
        if request.tipo_pago == PaymentType::Credit && request.abono_inicial > Decimal::ZERO {
            if request.abono_inicial > sale.balance {
                return Err(ServiceError::Conflict(
                    "The initial payment exceeds the outstanding balance".to_string(),
                ));
            }

            let installment = payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                amount: Set(request.abono_inicial),
                created_by: Set(request.usuario_id),
                payment_date: Set(now),
                created_at: Set(now),
                deleted_at: Set(None),
            }
            .insert(&txn)
            .await?;

            let new_balance = round2(sale.balance - request.abono_inicial);
            let mut active: sale::ActiveModel = sale.into();
            active.balance = Set(new_balance);
            if new_balance == Decimal::ZERO {
                active.status = Set(SaleStatus::Paid);
            }
            active.updated_at = Set(Some(now));
            sale = active.update(&txn).await?;

            abonos.push(PaymentResponse::from(&installment));
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to commit sale creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, total = %sale.total, status = ?sale.status, "sale created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::SaleCreated(sale_id)).await {
                warn!(error = %e, sale_id = %sale_id, "failed to send sale created event");
            }
        }

        Ok(SaleResponse::from_model(sale, detalles, abonos))
    }

    /// Voids a sale: restores stock for every active line, soft-deletes the
    /// sale's lines and payments, and zeroes the balance. Terminal; a second
    /// void is rejected without touching stock again.
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn void_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to start transaction for void");
            ServiceError::DatabaseError(e)
        })?;

        let sale = sale::Entity::find_by_id(sale_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Sale not found".to_string()))?;

        if sale.status == SaleStatus::Voided {
            return Err(ServiceError::Conflict(
                "Sale is already voided".to_string(),
            ));
        }

        let lines = sale_line::Entity::find()
            .filter(sale_line::Column::SaleId.eq(sale_id))
            .filter(sale_line::Column::DeletedAt.is_null())
            .all(&txn)
            .await?;

        for line in &lines {
            self.inventory
                .commit_increment(&txn, line.product_id, line.quantity)
                .await?;
        }

        payment::Entity::update_many()
            .col_expr(payment::Column::DeletedAt, Expr::value(now))
            .filter(payment::Column::SaleId.eq(sale_id))
            .filter(payment::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        sale_line::Entity::update_many()
            .col_expr(sale_line::Column::DeletedAt, Expr::value(now))
            .filter(sale_line::Column::SaleId.eq(sale_id))
            .filter(sale_line::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(SaleStatus::Voided);
        active.balance = Set(Decimal::ZERO);
        active.updated_at = Set(Some(now));
        let sale = active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to commit void");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, restored_lines = lines.len(), "sale voided");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::SaleVoided(sale_id)).await {
                warn!(error = %e, sale_id = %sale_id, "failed to send sale voided event");
            }
        }

        Ok(SaleResponse::from_model(sale, Vec::new(), Vec::new()))
    }

    /// Registers an installment against a credit sale, reducing its balance
    /// and flipping it to paid when the balance reaches exactly zero.
    #[instrument(skip(self, request), fields(sale_id = %sale_id, monto = %request.monto))]
    pub async fn register_payment(
        &self,
        sale_id: Uuid,
        request: RegisterPaymentRequest,
    ) -> Result<PaymentRegistered, ServiceError> {
        if request.monto <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Invalid payment amount".to_string(),
            ));
        }

        let db = &*self.db;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to start transaction for payment");
            ServiceError::DatabaseError(e)
        })?;

        let sale = sale::Entity::find_by_id(sale_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Sale not found".to_string()))?;

        if sale.status == SaleStatus::Voided {
            return Err(ServiceError::Conflict("Sale is voided".to_string()));
        }
        if sale.payment_type != PaymentType::Credit {
            return Err(ServiceError::Conflict(
                "Sale is not on credit".to_string(),
            ));
        }

        if let Some(limit) = sale.installment_count {
            let registered = payment::Entity::find()
                .filter(payment::Column::SaleId.eq(sale_id))
                .filter(payment::Column::DeletedAt.is_null())
                .count(&txn)
                .await?;
            if registered >= limit as u64 {
                return Err(ServiceError::Conflict(
                    "The maximum number of installments has been reached".to_string(),
                ));
            }
        }

        let new_balance = round2(sale.balance - request.monto);
        if new_balance < Decimal::ZERO {
            return Err(ServiceError::Conflict(
                "The payment exceeds the outstanding balance".to_string(),
            ));
        }

        let installment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale_id),
            amount: Set(request.monto),
            created_by: Set(request.usuario_id),
            payment_date: Set(now),
            created_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut active: sale::ActiveModel = sale.into();
        active.balance = Set(new_balance);
        if new_balance == Decimal::ZERO {
            active.status = Set(SaleStatus::Paid);
        }
        active.updated_at = Set(Some(now));
        active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "failed to commit payment");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, payment_id = %installment.id, new_balance = %new_balance, "installment registered");

        if let Some(event_sender) = &self.event_sender {
            let event = Event::PaymentRegistered {
                sale_id,
                payment_id: installment.id,
                amount: installment.amount,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, sale_id = %sale_id, "failed to send payment registered event");
            }
        }

        let venta = self.get_sale(sale_id).await?;
        Ok(PaymentRegistered {
            abono: PaymentResponse::from(&installment),
            venta,
        })
    }

    /// Fetches one sale with its active lines and payments.
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db;

        let sale = sale::Entity::find_by_id(sale_id)
            .filter(sale::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Sale not found".to_string()))?;

        let mut sales = attach_sale_details(db, vec![sale]).await?;
        Ok(sales.remove(0))
    }

    /// Lists sales matching the filters, newest first, with per-status totals.
    #[instrument(skip(self, query))]
    pub async fn list_sales(&self, query: SaleListQuery) -> Result<SaleListResponse, ServiceError> {
        let db = &*self.db;

        let range = DateRangeParams {
            desde: query.desde.clone(),
            hasta: query.hasta.clone(),
        };
        let (desde, hasta) = range.parse()?;
        let desde = desde.unwrap_or_else(today_start);
        let hasta = hasta.unwrap_or_else(Utc::now);

        let mut finder = sale::Entity::find()
            .filter(sale::Column::DeletedAt.is_null())
            .filter(sale::Column::SaleDate.gte(desde))
            .filter(sale::Column::SaleDate.lte(hasta));

        if let Some(cliente_id) = query.cliente_id {
            finder = finder.filter(sale::Column::CustomerId.eq(cliente_id));
        }
        if let Some(estado) = query.estado {
            finder = finder.filter(sale::Column::Status.eq(estado));
        }
        if let Some(tipo_pago) = query.tipo_pago {
            finder = finder.filter(sale::Column::PaymentType.eq(tipo_pago));
        }

        let sales = finder
            .order_by_desc(sale::Column::SaleDate)
            .all(db)
            .await?;

        let mut totales_estado: HashMap<String, Decimal> = HashMap::new();
        for sale in &sales {
            *totales_estado
                .entry(sale.status.wire_value().to_string())
                .or_insert(Decimal::ZERO) += sale.total;
        }

        let ventas = attach_sale_details(db, sales).await?;
        Ok(SaleListResponse {
            ventas,
            totales_estado,
        })
    }
}

/// Loads active lines (with product name/barcode) and active payments for a
/// batch of sales, in three queries instead of one per sale. Shared with the
/// credit-customer grouping.
pub(crate) async fn attach_sale_details(
    db: &DbPool,
    sales: Vec<sale::Model>,
) -> Result<Vec<SaleResponse>, ServiceError> {
    let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();

    let lines = sale_line::Entity::find()
        .filter(sale_line::Column::SaleId.is_in(sale_ids.clone()))
        .filter(sale_line::Column::DeletedAt.is_null())
        .all(db)
        .await?;

    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let products: HashMap<Uuid, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let payments = payment::Entity::find()
        .filter(payment::Column::SaleId.is_in(sale_ids))
        .filter(payment::Column::DeletedAt.is_null())
        .order_by_asc(payment::Column::PaymentDate)
        .all(db)
        .await?;

    let mut lines_by_sale: HashMap<Uuid, Vec<SaleLineResponse>> = HashMap::new();
    for line in lines {
        let (nombre, codigo) = products
            .get(&line.product_id)
            .map(|p| (p.name.clone(), p.barcode.clone()))
            .unwrap_or_default();
        lines_by_sale
            .entry(line.sale_id)
            .or_default()
            .push(SaleLineResponse {
                producto_id: line.product_id,
                nombre_producto: nombre,
                codigo_barras: codigo,
                cantidad: line.quantity,
                precio_unitario: line.unit_price,
                costo_unitario: line.unit_cost,
                subtotal: line.subtotal,
                utilidad_real: line.profit,
            });
    }

    let mut payments_by_sale: HashMap<Uuid, Vec<PaymentResponse>> = HashMap::new();
    for p in &payments {
        payments_by_sale
            .entry(p.sale_id)
            .or_default()
            .push(PaymentResponse::from(p));
    }

    Ok(sales
        .into_iter()
        .map(|sale| {
            let detalles = lines_by_sale.remove(&sale.id).unwrap_or_default();
            let abonos = payments_by_sale.remove(&sale.id).unwrap_or_default();
            SaleResponse::from_model(sale, detalles, abonos)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amounts_round_per_line() {
        // 19.99 × 3 = 59.97 exactly; cost 12.50 × 3 = 37.50
        let (subtotal, cost, profit) = compute_line(dec!(19.99), dec!(12.50), 3);
        assert_eq!(subtotal, dec!(59.97));
        assert_eq!(cost, dec!(37.50));
        assert_eq!(profit, dec!(22.47));
    }

    #[test]
    fn line_amounts_round_half_away_from_zero() {
        // 0.335 × 1 rounds up to 0.34, not banker's 0.33
        let (subtotal, _, _) = compute_line(dec!(0.335), Decimal::ZERO, 1);
        assert_eq!(subtotal, dec!(0.34));
    }

    #[test]
    fn profit_is_difference_of_rounded_amounts() {
        let (subtotal, cost, profit) = compute_line(dec!(10.005), dec!(5.005), 1);
        assert_eq!(subtotal, dec!(10.01));
        assert_eq!(cost, dec!(5.01));
        assert_eq!(profit, dec!(5.00));
    }
}
