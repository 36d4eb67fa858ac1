use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Product entity.
///
/// `stock` is only mutated through the inventory ledger, inside the same
/// transaction as the sale that moves it; it never goes negative.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Barcode, unique across products
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Barcode must be between 1 and 100 characters"
    ))]
    pub barcode: String,

    pub brand: Option<String>,

    /// Unit cost when restocking; captured onto sale lines at sale time
    pub purchase_price: Decimal,

    /// Current selling price; used when a sale line carries no explicit price
    pub sale_price: Decimal,

    /// Units on hand
    pub stock: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_line::Entity")]
    SaleLines,
}

impl Related<super::sale_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
