use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::product,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Barcode is required"))]
    pub codigo_barras: String,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub nombre: String,
    pub marca: Option<String>,
    #[serde(default)]
    pub precio_compra: Decimal,
    #[serde(default)]
    pub precio_venta: Decimal,
    #[serde(default)]
    pub stock: i32,
}

/// Partial update; only supplied fields change. Price edits never rewrite
/// the unit cost already captured on sale lines.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub codigo_barras: Option<String>,
    pub nombre: Option<String>,
    pub marca: Option<String>,
    pub precio_compra: Option<Decimal>,
    pub precio_venta: Option<Decimal>,
    pub stock: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub codigo_barras: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub codigo_barras: String,
    pub nombre: String,
    pub marca: Option<String>,
    pub precio_compra: Decimal,
    pub precio_venta: Decimal,
    pub stock: i32,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            codigo_barras: model.barcode,
            nombre: model.name,
            marca: model.brand,
            precio_compra: model.purchase_price,
            precio_venta: model.sale_price,
            stock: model.stock,
        }
    }
}

/// Product CRUD. Stock changes that come from sales go through the inventory
/// ledger instead; the update here is for manual corrections and restocking.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request), fields(barcode = %request.codigo_barras))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let existing = product::Entity::find()
            .filter(product::Column::Barcode.eq(request.codigo_barras.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "A product with that barcode already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.nombre),
            barcode: Set(request.codigo_barras),
            brand: Set(request.marca),
            purchase_price: Set(request.precio_compra),
            sale_price: Set(request.precio_venta),
            stock: Set(request.stock),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %model.id, barcode = %model.barcode, "product created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ProductCreated(model.id)).await {
                warn!(error = %e, "failed to send product created event");
            }
        }

        Ok(model.into())
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(barcode) = &request.codigo_barras {
            let clash = product::Entity::find()
                .filter(product::Column::Barcode.eq(barcode.clone()))
                .filter(product::Column::Id.ne(product_id))
                .one(&*self.db)
                .await?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(
                    "A product with that barcode already exists".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(barcode) = request.codigo_barras {
            active.barcode = Set(barcode);
        }
        if let Some(nombre) = request.nombre {
            active.name = Set(nombre);
        }
        if let Some(marca) = request.marca {
            active.brand = Set(Some(marca));
        }
        if let Some(precio_compra) = request.precio_compra {
            active.purchase_price = Set(precio_compra);
        }
        if let Some(precio_venta) = request.precio_venta {
            active.sale_price = Set(precio_venta);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        active.updated_at = Set(Some(Utc::now()));

        let model = active.update(&*self.db).await?;
        info!(product_id = %product_id, "product updated");
        Ok(model.into())
    }

    #[instrument(skip(self, query))]
    pub async fn list_products(
        &self,
        query: ProductQuery,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let mut finder = product::Entity::find();
        if let Some(barcode) = query.codigo_barras {
            finder = finder.filter(product::Column::Barcode.eq(barcode));
        }

        let products = finder
            .order_by_asc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(products.into_iter().map(Into::into).collect())
    }
}
