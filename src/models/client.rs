//! Client model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A billable client owned by one user. Deleting a client cascades to its
/// invoices and their line items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_postal_code: String,
    pub country: String,
    pub created_utc: DateTime<Utc>,
}

/// A client row joined with its invoice count, for list views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_postal_code: String,
    pub country: String,
    pub created_utc: DateTime<Utc>,
    pub invoice_count: i64,
}

/// Input for creating or updating a client.
#[derive(Debug, Clone)]
pub struct UpsertClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_postal_code: String,
    pub country: String,
}
