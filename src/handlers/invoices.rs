use crate::dtos::{InvoiceListResponse, InvoiceRequest, InvoiceResponse};
use crate::error::AppError;
use crate::middleware::OwnerId;
use crate::models::{should_send_email, Invoice, InvoiceStatus};
use crate::services::metrics::{INVOICES_TOTAL, RECONCILED_TOTAL};
use crate::services::pdf;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

/// Owner-scoped overdue sweep run before any read that surfaces status, so a
/// freshly loaded view never shows a stale `sent` past its due date.
async fn reconcile_for_owner(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let updated = state.db.reconcile_overdue(Some(user_id)).await?;
    RECONCILED_TOTAL
        .with_label_values(&["on_demand"])
        .inc_by(updated.len() as u64);
    Ok(())
}

/// Dispatch the invoice email, degrading delivery failure to a response
/// warning. The status write must never be rolled back by a mail outage.
async fn dispatch_invoice_email(state: &AppState, invoice: &Invoice) -> Option<String> {
    let client = match state.db.get_client(invoice.user_id, invoice.client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return Some("Invoice saved but client is missing; email not sent".to_string()),
        Err(e) => {
            warn!(error = %e, "Client lookup for invoice email failed");
            return Some("Invoice saved but email could not be sent".to_string());
        }
    };

    let profile = match state.db.get_profile(invoice.user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return Some(
                "Invoice saved but no business profile exists; email not sent".to_string(),
            )
        }
        Err(e) => {
            warn!(error = %e, "Profile lookup for invoice email failed");
            return Some("Invoice saved but email could not be sent".to_string());
        }
    };

    match state.email.send_invoice_email(invoice, &client, &profile).await {
        Ok(()) => None,
        Err(e) => {
            warn!(invoice_number = %invoice.invoice_number, error = %e, "Invoice email failed");
            Some("Invoice saved but the email to the client failed".to_string())
        }
    }
}

pub async fn list_invoices(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    reconcile_for_owner(&state, user_id).await?;

    let invoices = state.db.list_invoices(user_id).await?;
    let mut responses = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        let items = state.db.get_invoice_items(invoice.invoice_id).await?;
        responses.push(InvoiceResponse::from_parts(invoice, items));
    }

    Ok(Json(InvoiceListResponse::new(responses)))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Json(payload): Json<InvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = payload.into_create(user_id);
    let (invoice, items) = state.db.create_invoice(&input).await?;

    INVOICES_TOTAL
        .with_label_values(&[invoice.status.as_str()])
        .inc();

    // An invoice born `sent` counts as a transition into `sent`.
    let warning = if invoice.status() == InvoiceStatus::Sent {
        dispatch_invoice_email(&state, &invoice).await
    } else {
        None
    };

    let mut response = InvoiceResponse::from_parts(invoice, items);
    if let Some(warning) = warning {
        response = response.with_warning(warning);
    }

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    reconcile_for_owner(&state, user_id).await?;

    let invoice = state
        .db
        .get_invoice(user_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let items = state.db.get_invoice_items(invoice.invoice_id).await?;

    Ok(Json(InvoiceResponse::from_parts(invoice, items)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<InvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = payload.into_update();
    let (invoice, items, old_status) = state
        .db
        .update_invoice(user_id, invoice_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    INVOICES_TOTAL
        .with_label_values(&[invoice.status.as_str()])
        .inc();

    let warning = if should_send_email(old_status, invoice.status()) {
        dispatch_invoice_email(&state, &invoice).await
    } else {
        None
    };

    let mut response = InvoiceResponse::from_parts(invoice, items);
    if let Some(warning) = warning {
        response = response.with_warning(warning);
    }

    Ok(Json(response))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_invoice(user_id, invoice_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_invoice_pdf(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .db
        .get_invoice(user_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let items = state.db.get_invoice_items(invoice.invoice_id).await?;
    let client = state
        .db
        .get_client(user_id, invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    let profile = state
        .db
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Business profile not found")))?;

    let filename = pdf::pdf_filename(&invoice);

    // PDF rendering is CPU-bound; keep it off the async workers.
    let render_invoice = invoice.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        pdf::render_invoice(&render_invoice, &items, &client, &profile)
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF task failed: {}", e)))??;

    state.db.mark_pdf_generated(user_id, invoice_id).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, bytes))
}
