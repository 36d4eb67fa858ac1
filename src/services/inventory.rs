use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tracing::debug;
use uuid::Uuid;

use crate::{entities::product, errors::ServiceError};

/// Inventory ledger: the only code that moves product stock.
///
/// Every method takes the caller's connection, so adjustments always happen
/// inside the same transaction as the sale or void that caused them. A failed
/// reservation performs no mutation at all.
#[derive(Debug, Clone, Default)]
pub struct InventoryService;

impl InventoryService {
    pub fn new() -> Self {
        Self
    }

    /// Checks that the product exists and has at least `quantity` units.
    /// Returns the product row for the caller to snapshot prices from.
    pub async fn reserve<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if product.stock < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for {}: available {}, requested {}",
                product.name, product.stock, quantity
            )));
        }

        Ok(product)
    }

    /// Applies the stock decrement for a reserved line.
    /// Callers must have passed the same product through [`Self::reserve`]
    /// within the current transaction.
    pub async fn commit_decrement<C: ConnectionTrait>(
        &self,
        conn: &C,
        product: product::Model,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        let new_stock = product.stock - quantity;
        debug!(product_id = %product.id, new_stock, "decrementing stock");

        let mut active: product::ActiveModel = product.into();
        active.stock = Set(new_stock);
        active.updated_at = Set(Some(Utc::now()));
        active.update(conn).await.map_err(Into::into)
    }

    /// Reverses a line's decrement when its sale is voided. A product that no
    /// longer exists is skipped; there is nothing left to restore onto.
    pub async fn commit_increment<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let Some(product) = product::Entity::find_by_id(product_id).one(conn).await? else {
            return Ok(());
        };

        let new_stock = product.stock + quantity;
        debug!(product_id = %product.id, new_stock, "restoring stock");

        let mut active: product::ActiveModel = product.into();
        active.stock = Set(new_stock);
        active.updated_at = Set(Some(Utc::now()));
        active.update(conn).await?;
        Ok(())
    }
}
