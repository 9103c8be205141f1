use crate::models::UpsertBusinessProfile;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, message = "Business name is required"))]
    pub business_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub business_email: String,

    #[serde(default)]
    pub phone_country_code: String,

    #[serde(default)]
    pub phone_number: String,

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

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub preferred_currency: String,

    pub logo_path: Option<String>,
}

impl ProfileRequest {
    pub fn into_input(self) -> UpsertBusinessProfile {
        UpsertBusinessProfile {
            business_name: self.business_name,
            business_email: self.business_email,
            phone_country_code: self.phone_country_code,
            phone_number: self.phone_number,
            street_address: self.street_address,
            city: self.city,
            state_province: self.state_province,
            zip_postal_code: self.zip_postal_code,
            country: self.country,
            preferred_currency: self.preferred_currency.to_uppercase(),
            logo_path: self.logo_path,
        }
    }
}
