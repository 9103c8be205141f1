use crate::dtos::{DashboardResponse, InvoiceResponse};
use crate::error::AppError;
use crate::middleware::OwnerId;
use crate::models::{Invoice, InvoiceStatus};
use crate::services::currency::{currency_symbol, RateSource};
use crate::services::metrics::{CONVERSIONS_TOTAL, RECONCILED_TOTAL};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use rust_decimal::Decimal;
use std::collections::HashMap;

const RECENT_INVOICES: usize = 5;

fn source_label(source: RateSource) -> &'static str {
    match source {
        RateSource::Live => "live",
        RateSource::Fallback => "fallback",
        RateSource::Identity => "identity",
    }
}

/// Bucket invoice totals by currency for one status class.
fn bucket_totals<'a>(
    invoices: impl Iterator<Item = &'a Invoice>,
) -> HashMap<String, Decimal> {
    let mut buckets: HashMap<String, Decimal> = HashMap::new();
    for invoice in invoices {
        *buckets.entry(invoice.currency.clone()).or_default() += invoice.total_amount;
    }
    buckets
}

/// Convert each per-currency bucket into the preferred currency and sum.
/// Tracks the weakest rate source used across the buckets.
async fn convert_buckets(
    state: &AppState,
    buckets: HashMap<String, Decimal>,
    preferred: &str,
    weakest: &mut RateSource,
) -> Decimal {
    let mut total = Decimal::ZERO;
    for (currency, amount) in buckets {
        let (converted, source) = state
            .converter
            .convert_with_source(amount, &currency, preferred)
            .await;
        CONVERSIONS_TOTAL
            .with_label_values(&[source_label(source)])
            .inc();
        if currency != preferred && rank(source) < rank(*weakest) {
            *weakest = source;
        }
        total += converted;
    }
    total
}

fn rank(source: RateSource) -> u8 {
    match source {
        RateSource::Identity => 0,
        RateSource::Fallback => 1,
        RateSource::Live => 2,
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Business profile not found")))?;

    // Dashboard reads reconcile first so the counts reflect reality.
    let reconciled = state.db.reconcile_overdue(Some(user_id)).await?;
    RECONCILED_TOTAL
        .with_label_values(&["on_demand"])
        .inc_by(reconciled.len() as u64);

    let clients = state.db.list_clients(user_id).await?;
    let invoices = state.db.list_invoices(user_id).await?;

    let overdue_count = invoices
        .iter()
        .filter(|i| i.status() == InvoiceStatus::Overdue)
        .count() as i64;

    let paid = bucket_totals(
        invoices
            .iter()
            .filter(|i| i.status() == InvoiceStatus::Paid),
    );
    let overdue = bucket_totals(
        invoices
            .iter()
            .filter(|i| i.status() == InvoiceStatus::Overdue),
    );
    // Everything neither paid nor overdue counts as pending revenue.
    let pending = bucket_totals(invoices.iter().filter(|i| {
        !matches!(i.status(), InvoiceStatus::Paid | InvoiceStatus::Overdue)
    }));

    let preferred = profile.preferred_currency.clone();
    let mut weakest = RateSource::Live;
    let total_paid = convert_buckets(&state, paid, &preferred, &mut weakest).await;
    let total_pending = convert_buckets(&state, pending, &preferred, &mut weakest).await;
    let total_overdue = convert_buckets(&state, overdue, &preferred, &mut weakest).await;

    let mut recent_invoices = Vec::with_capacity(RECENT_INVOICES);
    for invoice in invoices.iter().take(RECENT_INVOICES) {
        let items = state.db.get_invoice_items(invoice.invoice_id).await?;
        recent_invoices.push(InvoiceResponse::from_parts(invoice.clone(), items));
    }

    Ok(Json(DashboardResponse {
        currency_symbol: currency_symbol(&preferred).to_string(),
        preferred_currency: preferred,
        total_clients: clients.len() as i64,
        total_invoices: invoices.len() as i64,
        overdue_count,
        total_paid,
        total_pending,
        total_overdue,
        rate_source: source_label(weakest).to_string(),
        recent_invoices,
    }))
}
