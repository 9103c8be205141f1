//! Business profile model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing identity, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessProfile {
    pub user_id: Uuid,
    pub business_name: String,
    pub business_email: String,
    pub phone_country_code: String,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_postal_code: String,
    pub country: String,
    pub preferred_currency: String,
    pub logo_path: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating or editing the profile.
#[derive(Debug, Clone)]
pub struct UpsertBusinessProfile {
    pub business_name: String,
    pub business_email: String,
    pub phone_country_code: String,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_postal_code: String,
    pub country: String,
    pub preferred_currency: String,
    pub logo_path: Option<String>,
}
