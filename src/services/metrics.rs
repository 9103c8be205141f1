//! Prometheus metrics for invoice-maker.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicemaker_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Invoice counter by status at save time.
pub static INVOICES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicemaker_invoices_total",
        "Total number of invoice saves by status",
        &["status"] // draft, sent, paid, overdue
    )
    .expect("Failed to register invoices_total")
});

/// Invoices flipped to overdue by the reconciliation, by invocation path.
pub static RECONCILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicemaker_reconciled_invoices_total",
        "Invoices transitioned to overdue by reconciliation",
        &["path"] // scheduled, on_demand, cli
    )
    .expect("Failed to register reconciled_total")
});

/// Invoice email dispatch attempts by outcome.
pub static EMAIL_DISPATCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicemaker_email_dispatch_total",
        "Invoice email dispatch attempts by outcome",
        &["outcome"] // sent, failed
    )
    .expect("Failed to register email_dispatch_total")
});

/// Currency conversions by rate source.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicemaker_currency_conversions_total",
        "Currency conversions by rate source",
        &["source"] // live, fallback, identity
    )
    .expect("Failed to register conversions_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicemaker_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&RECONCILED_TOTAL);
    Lazy::force(&EMAIL_DISPATCH_TOTAL);
    Lazy::force(&CONVERSIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciled_counter_tallies_whole_counts() {
        init_metrics();
        let counter = RECONCILED_TOTAL.with_label_values(&["batch"]);
        let before = counter.get();
        counter.inc_by(3);
        assert_eq!(counter.get(), before + 3);
    }

    #[test]
    fn metrics_render_as_text() {
        init_metrics();
        INVOICES_TOTAL.with_label_values(&["draft"]).inc();
        assert!(get_metrics().contains("invoicemaker_invoices_total"));
    }
}
