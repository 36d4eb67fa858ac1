use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    common::round2,
    db::DbPool,
    entities::{expense, sale, sale_line, SaleStatus},
    errors::ServiceError,
};

/// Which sales enter the profit computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleFilter {
    #[serde(rename = "todos")]
    Todos,
    #[serde(rename = "pagadas")]
    Pagadas,
    #[serde(rename = "pendientes")]
    Pendientes,
}

impl Default for SaleFilter {
    fn default() -> Self {
        SaleFilter::Pagadas
    }
}

/// Profit figures for a period, all rounded to 2 decimals.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitReport {
    pub ingresos: Decimal,
    pub costo_ventas: Decimal,
    pub total_gastos: Decimal,
    pub utilidad_bruta: Decimal,
    pub utilidad_neta: Decimal,
}

/// Read-only profit aggregation over persisted sales, lines, and expenses.
/// Never looks at in-flight sale state.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Revenue, cost of goods, and expenses over a date range.
    ///
    /// Revenue sums `sale.total` over sales matching the filter; cost of
    /// goods sums captured unit cost × quantity over those sales' active
    /// lines; expenses are summed over the range regardless of the filter.
    #[instrument(skip(self), fields(filter = ?filter))]
    pub async fn profit_for_period(
        &self,
        desde: Option<DateTime<Utc>>,
        hasta: Option<DateTime<Utc>>,
        filter: SaleFilter,
    ) -> Result<ProfitReport, ServiceError> {
        let db = &*self.db;

        let mut finder = sale::Entity::find().filter(sale::Column::DeletedAt.is_null());
        if let Some(desde) = desde {
            finder = finder.filter(sale::Column::SaleDate.gte(desde));
        }
        if let Some(hasta) = hasta {
            finder = finder.filter(sale::Column::SaleDate.lte(hasta));
        }
        match filter {
            SaleFilter::Pagadas => {
                finder = finder.filter(sale::Column::Status.eq(SaleStatus::Paid));
            }
            SaleFilter::Pendientes => {
                finder = finder.filter(sale::Column::Status.eq(SaleStatus::Pending));
            }
            SaleFilter::Todos => {}
        }

        let sales = finder.all(db).await?;
        let ingresos: Decimal = sales.iter().map(|s| s.total).sum();

        let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let lines = sale_line::Entity::find()
            .filter(sale_line::Column::SaleId.is_in(sale_ids))
            .filter(sale_line::Column::DeletedAt.is_null())
            .all(db)
            .await?;
        let costo_ventas: Decimal = lines
            .iter()
            .map(|l| l.unit_cost * Decimal::from(l.quantity))
            .sum();

        let mut expense_finder = expense::Entity::find()
            .filter(expense::Column::ExpenseDate.lte(hasta.unwrap_or_else(Utc::now)));
        if let Some(desde) = desde {
            expense_finder = expense_finder.filter(expense::Column::ExpenseDate.gte(desde));
        }
        let expenses = expense_finder.all(db).await?;
        let total_gastos: Decimal = expenses.iter().map(|e| e.amount).sum();

        let utilidad_bruta = round2(ingresos - costo_ventas);
        let utilidad_neta = round2(utilidad_bruta - total_gastos);

        info!(
            sales = sales.len(),
            ingresos = %ingresos,
            costo_ventas = %costo_ventas,
            total_gastos = %total_gastos,
            "profit report computed"
        );

        Ok(ProfitReport {
            ingresos: round2(ingresos),
            costo_ventas: round2(costo_ventas),
            total_gastos: round2(total_gastos),
            utilidad_bruta,
            utilidad_neta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_deserializes_spanish_values() {
        let f: SaleFilter = serde_json::from_str("\"pendientes\"").unwrap();
        assert_eq!(f, SaleFilter::Pendientes);
        assert_eq!(SaleFilter::default(), SaleFilter::Pagadas);
    }
}
