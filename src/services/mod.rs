pub mod customers;
pub mod expenses;
pub mod inventory;
pub mod products;
pub mod reports;
pub mod sales;
pub mod users;

use std::sync::Arc;

use crate::{auth::AuthService, db::DbPool, events::EventSender};

/// Container wiring every service to the shared pool and event channel.
#[derive(Clone)]
pub struct AppServices {
    pub sales: Arc<sales::SaleService>,
    pub customers: Arc<customers::CustomerService>,
    pub products: Arc<products::ProductService>,
    pub expenses: Arc<expenses::ExpenseService>,
    pub reports: Arc<reports::ReportService>,
    pub users: Arc<users::UserService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, auth: Arc<AuthService>) -> Self {
        Self {
            sales: Arc::new(sales::SaleService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            customers: Arc::new(customers::CustomerService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            products: Arc::new(products::ProductService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            expenses: Arc::new(expenses::ExpenseService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            reports: Arc::new(reports::ReportService::new(db.clone())),
            users: Arc::new(users::UserService::new(db, auth, Some(event_sender))),
        }
    }
}
