//! Persisted entities for invoice-maker.

mod ad_click;
mod business_profile;
mod client;
mod invoice;
mod invoice_item;

pub use ad_click::{AdClick, AdPlacement, CreateAdClick};
pub use business_profile::{BusinessProfile, UpsertBusinessProfile};
pub use client::{Client, ClientSummary, UpsertClient};
pub use invoice::{
    should_send_email, CreateInvoice, CreateInvoiceItem, Invoice, InvoiceStatus, UpdateInvoice,
};
pub use invoice_item::InvoiceItem;
