use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{today_start, DateRangeParams},
    db::DbPool,
    entities::{customer, sale, PaymentType, SaleStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::sales::{attach_sale_details, SaleResponse},
};

/// Page size for the credit-customer listing.
const CREDIT_PAGE_SIZE: u64 = 500;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 150, message = "Customer name is required"))]
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub nit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub nit: Option<String>,
}

impl From<customer::Model> for CustomerResponse {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            nombre: model.name,
            telefono: model.phone,
            direccion: model.address,
            nit: model.tax_id,
        }
    }
}

/// Filters for the credit-customer grouping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditCustomersQuery {
    pub estado: Option<SaleStatus>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub page: Option<u64>,
}

/// One customer with their credit sales in the requested window.
#[derive(Debug, Serialize)]
pub struct CreditCustomerGroup {
    pub cliente_id: Option<Uuid>,
    pub nombre: String,
    pub total_credito: Decimal,
    pub ventas: Vec<SaleResponse>,
}

#[derive(Debug, Serialize)]
pub struct CreditCustomersResponse {
    pub clientes: Vec<CreditCustomerGroup>,
    #[serde(rename = "totalClientes")]
    pub total_clientes: usize,
    #[serde(rename = "totalSaldoPendiente")]
    pub total_saldo_pendiente: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DebtorResponse {
    pub id: Uuid,
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
}

/// Customer CRUD plus the credit-side groupings the collections screen needs.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.nombre),
            phone: Set(request.telefono),
            address: Set(request.direccion),
            tax_id: Set(request.nit),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(customer_id = %model.id, "customer created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerCreated(model.id)).await {
                warn!(error = %e, "failed to send customer created event");
            }
        }

        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<CustomerResponse>, ServiceError> {
        let customers = customer::Entity::find()
            .filter(customer::Column::DeletedAt.is_null())
            .order_by_asc(customer::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(customers.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<CustomerResponse, ServiceError> {
        self.find_active(customer_id).await.map(Into::into)
    }

    /// Soft-deletes a customer. Rejected while the customer has any recorded
    /// sales, voided or not; sale history must keep its owner.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<Uuid, ServiceError> {
        let customer = self.find_active(customer_id).await?;

        let sales = sale::Entity::find()
            .filter(sale::Column::CustomerId.eq(customer_id))
            .count(&*self.db)
            .await?;
        if sales > 0 {
            return Err(ServiceError::Conflict(
                "Customer has recorded sales and cannot be deleted".to_string(),
            ));
        }

        let mut active: customer::ActiveModel = customer.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(customer_id = %customer_id, "customer soft-deleted");
        Ok(customer_id)
    }

    /// Credit sales in a date window, grouped per customer with their summed
    /// outstanding balance. Groups keep the order sales were returned in
    /// (newest first).
    #[instrument(skip(self, query))]
    pub async fn credit_customers(
        &self,
        query: CreditCustomersQuery,
    ) -> Result<CreditCustomersResponse, ServiceError> {
        let db = &*self.db;

        let range = DateRangeParams {
            desde: query.desde.clone(),
            hasta: query.hasta.clone(),
        };
        let (desde, hasta) = range.parse()?;
        let desde = desde.unwrap_or_else(today_start);
        let hasta = hasta.unwrap_or_else(Utc::now);
        let page = query.page.unwrap_or(1).max(1);

        let mut finder = sale::Entity::find()
            .filter(sale::Column::DeletedAt.is_null())
            .filter(sale::Column::PaymentType.eq(PaymentType::Credit))
            .filter(sale::Column::SaleDate.gte(desde))
            .filter(sale::Column::SaleDate.lte(hasta));
        if let Some(estado) = query.estado {
            finder = finder.filter(sale::Column::Status.eq(estado));
        }

        let sales = finder
            .order_by_desc(sale::Column::SaleDate)
            .limit(CREDIT_PAGE_SIZE)
            .offset((page - 1) * CREDIT_PAGE_SIZE)
            .all(db)
            .await?;

        let customer_ids: Vec<Uuid> = sales.iter().filter_map(|s| s.customer_id).collect();
        let names: HashMap<Uuid, String> = customer::Entity::find()
            .filter(customer::Column::Id.is_in(customer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let ventas = attach_sale_details(db, sales).await?;

        let mut order: Vec<Option<Uuid>> = Vec::new();
        let mut groups: HashMap<Option<Uuid>, CreditCustomerGroup> = HashMap::new();
        let mut total_saldo_pendiente = Decimal::ZERO;

        for venta in ventas {
            let key = venta.cliente_id;
            let group = groups.entry(key).or_insert_with(|| {
                order.push(key);
                CreditCustomerGroup {
                    cliente_id: key,
                    nombre: key
                        .and_then(|id| names.get(&id).cloned())
                        .unwrap_or_else(|| "Sin nombre".to_string()),
                    total_credito: Decimal::ZERO,
                    ventas: Vec::new(),
                }
            });

            group.total_credito += venta.saldo_pendiente;
            total_saldo_pendiente += venta.saldo_pendiente;
            group.ventas.push(venta);
        }

        let clientes: Vec<CreditCustomerGroup> = order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect();
        let total_clientes = clientes.len();

        Ok(CreditCustomersResponse {
            clientes,
            total_clientes,
            total_saldo_pendiente,
        })
    }

    /// Customers that still owe something: at least one non-voided credit
    /// sale with a positive balance.
    #[instrument(skip(self))]
    pub async fn debtors(&self) -> Result<Vec<DebtorResponse>, ServiceError> {
        let db = &*self.db;

        let owing: Vec<Option<Uuid>> = sale::Entity::find()
            .select_only()
            .column(sale::Column::CustomerId)
            .filter(sale::Column::DeletedAt.is_null())
            .filter(sale::Column::PaymentType.eq(PaymentType::Credit))
            .filter(sale::Column::Status.ne(SaleStatus::Voided))
            .filter(sale::Column::Balance.gt(Decimal::ZERO))
            .into_tuple()
            .all(db)
            .await?;

        let ids: Vec<Uuid> = owing.into_iter().flatten().collect();

        let customers = customer::Entity::find()
            .filter(customer::Column::Id.is_in(ids))
            .filter(customer::Column::DeletedAt.is_null())
            .order_by_asc(customer::Column::Name)
            .all(db)
            .await?;

        Ok(customers
            .into_iter()
            .map(|c| DebtorResponse {
                id: c.id,
                nombre: c.name,
                telefono: c.phone,
                direccion: c.address,
            })
            .collect())
    }

    async fn find_active(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .filter(customer::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }
}
