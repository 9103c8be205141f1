//! Ad click event record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Where an ad was shown when it was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdPlacement {
    PdfDownload,
    InvoiceSidebar,
    PdfFooter,
    DashboardWidget,
    InvoiceConfirmation,
}

impl AdPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdPlacement::PdfDownload => "pdf_download",
            AdPlacement::InvoiceSidebar => "invoice_sidebar",
            AdPlacement::PdfFooter => "pdf_footer",
            AdPlacement::DashboardWidget => "dashboard_widget",
            AdPlacement::InvoiceConfirmation => "invoice_confirmation",
        }
    }
}

/// Fire-and-forget ad impression event. No invariants beyond the optional
/// foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdClick {
    pub click_id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub ad_identifier: String,
    pub ad_placement: String,
    pub target_url: String,
    pub user_context: String,
    pub invoice_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording an ad click.
#[derive(Debug, Clone)]
pub struct CreateAdClick {
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub ad_identifier: String,
    pub ad_placement: AdPlacement,
    pub target_url: String,
    pub user_context: String,
    pub invoice_id: Option<Uuid>,
}
