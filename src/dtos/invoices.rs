use crate::models::{
    CreateInvoice, CreateInvoiceItem, Invoice, InvoiceItem, InvoiceStatus, UpdateInvoice,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Value must not be negative".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1, message = "Item description is required"))]
    pub description: String,

    #[validate(custom(function = non_negative))]
    pub quantity: Decimal,

    #[validate(custom(function = non_negative))]
    pub unit_price: Decimal,
}

/// Create/update payload. The item list replaces any stored one; totals and
/// the invoice number are never accepted from the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceRequest {
    pub client_id: Uuid,

    #[serde(default = "default_status")]
    pub status: InvoiceStatus,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,

    pub due_date: DateTime<Utc>,

    #[serde(default)]
    #[validate(custom(function = non_negative))]
    pub tax_rate: Decimal,

    #[serde(default)]
    #[validate(custom(function = non_negative))]
    pub discount_amount: Decimal,

    #[serde(default)]
    pub notes: String,

    #[validate(nested, length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<InvoiceItemRequest>,
}

fn default_status() -> InvoiceStatus {
    InvoiceStatus::Draft
}

impl InvoiceRequest {
    pub fn into_create(self, user_id: Uuid) -> CreateInvoice {
        CreateInvoice {
            user_id,
            client_id: self.client_id,
            status: self.status,
            currency: self.currency.to_uppercase(),
            due_date: self.due_date,
            tax_rate: self.tax_rate,
            discount_amount: self.discount_amount,
            notes: self.notes,
            items: items_input(self.items),
        }
    }

    pub fn into_update(self) -> UpdateInvoice {
        UpdateInvoice {
            client_id: self.client_id,
            status: self.status,
            currency: self.currency.to_uppercase(),
            due_date: self.due_date,
            tax_rate: self.tax_rate,
            discount_amount: self.discount_amount,
            notes: self.notes,
            items: items_input(self.items),
        }
    }
}

fn items_input(items: Vec<InvoiceItemRequest>) -> Vec<CreateInvoiceItem> {
    items
        .into_iter()
        .map(|item| CreateInvoiceItem {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect()
}

/// Per-status tallies for the invoice list. `expired` is the display-only
/// classification of drafts past their due date, a subset of `draft`.
#[derive(Debug, Default, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub sent: usize,
    pub paid: usize,
    pub overdue: usize,
    pub expired: usize,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub status_counts: StatusCounts,
}

impl InvoiceListResponse {
    pub fn new(invoices: Vec<InvoiceResponse>) -> Self {
        let mut counts = StatusCounts::default();
        for invoice in &invoices {
            match invoice.status.as_str() {
                "sent" => counts.sent += 1,
                "paid" => counts.paid += 1,
                "overdue" => counts.overdue += 1,
                _ => {
                    counts.draft += 1;
                    if invoice.is_expired {
                        counts.expired += 1;
                    }
                }
            }
        }
        Self {
            invoices,
            status_counts: counts,
        }
    }
}

/// Invoice as served to clients, with the derived display classifications.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub status: String,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: String,
    pub pdf_generated: bool,
    pub is_overdue: bool,
    pub is_expired: bool,
    pub days_until_due: i64,
    pub created_timestamp: DateTime<Utc>,
    pub last_modified_timestamp: DateTime<Utc>,
    pub items: Vec<InvoiceItem>,
    /// Set when a side effect (the invoice email) failed but the write itself
    /// succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl InvoiceResponse {
    pub fn from_parts(invoice: Invoice, items: Vec<InvoiceItem>) -> Self {
        let is_overdue = invoice.is_overdue();
        let is_expired = invoice.is_expired();
        let days_until_due = invoice.days_until_due();
        Self {
            invoice_id: invoice.invoice_id,
            client_id: invoice.client_id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            currency: invoice.currency,
            due_date: invoice.due_date,
            subtotal: invoice.subtotal,
            tax_rate: invoice.tax_rate,
            tax_amount: invoice.tax_amount,
            discount_amount: invoice.discount_amount,
            total_amount: invoice.total_amount,
            notes: invoice.notes,
            pdf_generated: invoice.pdf_generated,
            is_overdue,
            is_expired,
            days_until_due,
            created_timestamp: invoice.created_timestamp,
            last_modified_timestamp: invoice.last_modified_timestamp,
            items,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request_with(items: Vec<InvoiceItemRequest>) -> InvoiceRequest {
        InvoiceRequest {
            client_id: Uuid::new_v4(),
            status: InvoiceStatus::Draft,
            currency: "USD".to_string(),
            due_date: Utc::now(),
            tax_rate: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            notes: String::new(),
            items,
        }
    }

    #[test]
    fn empty_item_list_fails_validation() {
        let errors = request_with(Vec::new()).validate().unwrap_err();
        assert!(errors.to_string().contains("At least one line item"));
    }

    #[test]
    fn negative_item_values_fail_validation() {
        let request = request_with(vec![InvoiceItemRequest {
            description: "Consulting".to_string(),
            quantity: dec!(-1),
            unit_price: dec!(10.00),
        }]);
        let errors = request.validate().unwrap_err();
        assert!(errors.to_string().contains("must not be negative"));
    }

    #[test]
    fn valid_items_pass_validation() {
        let request = request_with(vec![InvoiceItemRequest {
            description: "Consulting".to_string(),
            quantity: dec!(10),
            unit_price: dec!(10.00),
        }]);
        assert!(request.validate().is_ok());
    }
}
