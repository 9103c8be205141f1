//! One-shot maintenance command: flip every `sent` invoice past its due date
//! to `overdue`, across all owners, then exit. Same write path as the
//! scheduled job, useful under cron or for manual runs.

use chrono::Utc;
use invoice_maker::config::AppConfig;
use invoice_maker::observability::init_tracing;
use invoice_maker::services::metrics::{init_metrics, RECONCILED_TOTAL};
use invoice_maker::services::scheduler::JOB_UPDATE_OVERDUE;
use invoice_maker::services::Database;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(&config.log_level);
    init_metrics();

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .map_err(|e| std::io::Error::other(format!("Database error: {}", e)))?;

    let started = Utc::now();
    let outcome = db.reconcile_overdue(None).await;
    let finished = Utc::now();

    let (exit, detail) = match &outcome {
        Ok(updated) => {
            RECONCILED_TOTAL
                .with_label_values(&["cli"])
                .inc_by(updated.len() as u64);
            for number in updated {
                println!("Updated invoice {} to overdue status", number);
            }
            println!("Successfully updated {} invoice(s)", updated.len());
            (Ok(()), format!("updated {} invoice(s)", updated.len()))
        }
        Err(e) => {
            eprintln!("Reconciliation failed: {}", e);
            (
                Err(std::io::Error::other(format!("Reconciliation failed: {}", e))),
                e.to_string(),
            )
        }
    };

    if let Err(e) = db
        .record_job_execution(
            JOB_UPDATE_OVERDUE,
            started,
            finished,
            outcome.is_ok(),
            &detail,
        )
        .await
    {
        eprintln!("Failed to record job execution: {}", e);
    }

    exit
}
