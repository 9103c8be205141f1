//! HTTP handlers.

pub mod ads;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod profile;
