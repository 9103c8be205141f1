use crate::dtos::{ClientDetailResponse, ClientRequest, InvoiceResponse};
use crate::error::AppError;
use crate::middleware::OwnerId;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

pub async fn list_clients(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let clients = state.db.list_clients(user_id).await?;
    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Json(payload): Json<ClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = state.db.create_client(user_id, &payload.into_input()).await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = state
        .db
        .get_client(user_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    let mut invoices = Vec::new();
    for invoice in state.db.list_invoices_for_client(user_id, client_id).await? {
        let items = state.db.get_invoice_items(invoice.invoice_id).await?;
        invoices.push(InvoiceResponse::from_parts(invoice, items));
    }

    Ok(Json(ClientDetailResponse { client, invoices }))
}

pub async fn update_client(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<ClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = state
        .db
        .update_client(user_id, client_id, &payload.into_input())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_client(user_id, client_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
