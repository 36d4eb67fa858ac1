use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sale entity.
///
/// Lifecycle: cash sales are born `paid` with a zero balance; credit sales
/// are born `pending` with balance = total and become `paid` exactly when the
/// balance reaches zero. `voided` is terminal and only reachable through an
/// explicit void, which also zeroes the balance.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Required for credit sales, optional for cash
    pub customer_id: Option<Uuid>,

    pub subtotal: Decimal,
    pub tax: Decimal,
    /// total = round2(subtotal + tax)
    pub total: Decimal,

    pub payment_type: PaymentType,
    pub status: SaleStatus,

    /// Outstanding balance; always zero for cash and voided sales
    pub balance: Decimal,

    /// Sum of line profits, captured at sale time
    pub total_profit: Decimal,

    pub sale_date: DateTime<Utc>,

    /// User who recorded the sale
    pub created_by: Option<Uuid>,

    /// Credit term in days (credit sales only)
    pub credit_term_days: Option<i32>,

    /// Planned number of installments (credit sales only)
    pub installment_count: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::sale_line::Entity")]
    SaleLines,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::sale_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLines.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// How a sale is paid. Serialized with the Spanish wire values the frontend
/// sends (`contado` / `credito`); stored in English.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentType {
    #[sea_orm(string_value = "cash")]
    #[serde(rename = "contado")]
    Cash,
    #[sea_orm(string_value = "credit")]
    #[serde(rename = "credito")]
    Credit,
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Cash
    }
}

/// Sale status. Wire values are Spanish (`pagado` / `pendiente` / `anulado`).
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SaleStatus {
    #[sea_orm(string_value = "paid")]
    #[serde(rename = "pagado")]
    Paid,
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sea_orm(string_value = "voided")]
    #[serde(rename = "anulado")]
    Voided,
}

impl SaleStatus {
    /// Spanish wire value, used for keys in per-status aggregations.
    pub fn wire_value(&self) -> &'static str {
        match self {
            SaleStatus::Paid => "pagado",
            SaleStatus::Pending => "pendiente",
            SaleStatus::Voided => "anulado",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_spanish_wire_values() {
        assert_eq!(
            serde_json::to_string(&PaymentType::Credit).unwrap(),
            "\"credito\""
        );
        assert_eq!(
            serde_json::to_string(&SaleStatus::Voided).unwrap(),
            "\"anulado\""
        );
        let parsed: SaleStatus = serde_json::from_str("\"pendiente\"").unwrap();
        assert_eq!(parsed, SaleStatus::Pending);
    }
}
