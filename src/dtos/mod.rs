//! Request and response payloads for the HTTP API.

pub mod ads;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod profile;

pub use ads::{AdClickRequest, AdClickResponse};
pub use clients::{ClientDetailResponse, ClientRequest};
pub use dashboard::DashboardResponse;
pub use invoices::{
    InvoiceItemRequest, InvoiceListResponse, InvoiceRequest, InvoiceResponse, StatusCounts,
};
pub use profile::ProfileRequest;
