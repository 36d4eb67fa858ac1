use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::expense,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 255, message = "Description is required"))]
    pub descripcion: String,
    pub monto: Decimal,
    pub categoria: Option<String>,
    pub usuario_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub descripcion: String,
    pub monto: Decimal,
    pub categoria: Option<String>,
    pub usuario_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            descripcion: model.description,
            monto: model.amount,
            categoria: model.category,
            usuario_id: model.created_by,
            fecha: model.expense_date,
        }
    }
}

/// Expense log. Independent of the sale engine; only profit reporting
/// consumes it.
#[derive(Clone)]
pub struct ExpenseService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ExpenseService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request))]
    pub async fn create_expense(
        &self,
        request: CreateExpenseRequest,
    ) -> Result<ExpenseResponse, ServiceError> {
        request.validate()?;
        if request.monto <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Expense amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let model = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            description: Set(request.descripcion),
            amount: Set(request.monto),
            category: Set(request.categoria),
            created_by: Set(request.usuario_id),
            expense_date: Set(now),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(expense_id = %model.id, amount = %model.amount, "expense recorded");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ExpenseRecorded(model.id)).await {
                warn!(error = %e, "failed to send expense recorded event");
            }
        }

        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list_expenses(&self) -> Result<Vec<ExpenseResponse>, ServiceError> {
        let expenses = expense::Entity::find()
            .order_by_desc(expense::Column::ExpenseDate)
            .all(&*self.db)
            .await?;

        Ok(expenses.into_iter().map(Into::into).collect())
    }
}
