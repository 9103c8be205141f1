use crate::dtos::invoices::InvoiceResponse;
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregated owner dashboard.
///
/// The money totals are converted into the owner's preferred currency;
/// `rate_source` reports the least-authoritative source used for any of the
/// conversions (`live`, `fallback`, or `identity`).
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub preferred_currency: String,
    pub currency_symbol: String,
    pub total_clients: i64,
    pub total_invoices: i64,
    pub overdue_count: i64,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub total_overdue: Decimal,
    pub rate_source: String,
    pub recent_invoices: Vec<InvoiceResponse>,
}
