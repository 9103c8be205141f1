//! Service layer: persistence, billing math, numbering, currency, email,
//! PDF rendering, metrics, and the background scheduler.

pub mod billing;
pub mod currency;
pub mod database;
pub mod email;
pub mod metrics;
pub mod numbering;
pub mod pdf;
pub mod scheduler;

pub use currency::CurrencyConverter;
pub use database::Database;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use scheduler::Scheduler;
