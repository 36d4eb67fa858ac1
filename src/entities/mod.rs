pub mod customer;
pub mod expense;
pub mod payment;
pub mod product;
pub mod sale;
pub mod sale_line;
pub mod user;

pub use sale::{PaymentType, SaleStatus};
pub use user::UserRole;
