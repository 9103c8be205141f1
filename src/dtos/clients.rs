use crate::dtos::invoices::InvoiceResponse;
use crate::models::{Client, UpsertClient};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ClientRequest {
    #[validate(length(min = 1, message = "Client name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub street_address: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub state_province: String,

    #[serde(default)]
    pub zip_postal_code: String,

    #[serde(default)]
    pub country: String,
}

/// Client detail with the client's invoices, newest first.
#[derive(Debug, Serialize)]
pub struct ClientDetailResponse {
    #[serde(flatten)]
    pub client: Client,
    pub invoices: Vec<InvoiceResponse>,
}

impl ClientRequest {
    pub fn into_input(self) -> UpsertClient {
        UpsertClient {
            name: self.name,
            email: self.email,
            phone: self.phone,
            street_address: self.street_address,
            city: self.city,
            state_province: self.state_province,
            zip_postal_code: self.zip_postal_code,
            country: self.country,
        }
    }
}
