use crate::models::{AdPlacement, CreateAdClick};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AdClickRequest {
    #[validate(length(min = 1, message = "Session id is required"))]
    pub session_id: String,

    #[validate(length(min = 1, message = "Ad identifier is required"))]
    pub ad_identifier: String,

    pub ad_placement: AdPlacement,

    #[validate(url(message = "Invalid target URL"))]
    pub target_url: String,

    #[serde(default)]
    pub user_context: String,

    pub invoice_id: Option<Uuid>,
}

impl AdClickRequest {
    pub fn into_input(self, user_id: Option<Uuid>) -> CreateAdClick {
        CreateAdClick {
            user_id,
            session_id: self.session_id,
            ad_identifier: self.ad_identifier,
            ad_placement: self.ad_placement,
            target_url: self.target_url,
            user_context: self.user_context,
            invoice_id: self.invoice_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdClickResponse {
    pub success: bool,
    pub click_id: Uuid,
}
