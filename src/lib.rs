//! invoice-maker: invoicing backend for small businesses.
//!
//! Owner-scoped clients and invoices, derived money totals, sequential
//! invoice numbering, overdue reconciliation, PDF rendering, and invoice
//! email dispatch.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod startup;
