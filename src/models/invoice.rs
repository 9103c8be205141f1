//! Invoice model and status rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
///
/// `draft` and `sent` are user-assigned; `overdue` is only ever assigned by
/// the reconciliation logic; `paid` is terminal for automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Draft,
        }
    }
}

/// The invoice email fires exactly when the status *changes* to `sent`,
/// never on a re-save of an already-sent invoice.
pub fn should_send_email(old: InvoiceStatus, new: InvoiceStatus) -> bool {
    new == InvoiceStatus::Sent && old != InvoiceStatus::Sent
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub user_id: Uuid,
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
    pub created_timestamp: DateTime<Utc>,
    pub last_modified_timestamp: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    /// Only `sent` invoices past their due date are overdue.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status() == InvoiceStatus::Sent && self.due_date < now
    }

    /// A `draft` past its due date is expired, a display-only classification.
    /// Drafts never transition to `overdue`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status() == InvoiceStatus::Draft && self.due_date < now
    }

    /// Signed whole-day difference to the due date; negative means past due,
    /// regardless of status. Floors, so an invoice past due by any amount
    /// reads at least -1.
    pub fn days_until_due(&self) -> i64 {
        self.days_until_due_at(Utc::now())
    }

    pub fn days_until_due_at(&self, now: DateTime<Utc>) -> i64 {
        (self.due_date - now).num_seconds().div_euclid(86_400)
    }
}

/// Input for creating an invoice. Totals and the invoice number are derived
/// at write time, never accepted from the caller.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub status: InvoiceStatus,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub tax_rate: Decimal,
    pub discount_amount: Decimal,
    pub notes: String,
    pub items: Vec<CreateInvoiceItem>,
}

/// Input for updating an invoice. The item list replaces the stored one.
#[derive(Debug, Clone)]
pub struct UpdateInvoice {
    pub client_id: Uuid,
    pub status: InvoiceStatus,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub tax_rate: Decimal,
    pub discount_amount: Decimal,
    pub notes: String,
    pub items: Vec<CreateInvoiceItem>,
}

/// One line item in a create/update payload; `order_position` is the index
/// in the submitted list.
#[derive(Debug, Clone)]
pub struct CreateInvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invoice_with(status: InvoiceStatus, due_date: DateTime<Utc>) -> Invoice {
        Invoice {
            invoice_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            invoice_number: "INV-00001".to_string(),
            status: status.as_str().to_string(),
            currency: "USD".to_string(),
            due_date,
            subtotal: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: String::new(),
            pdf_generated: false,
            created_timestamp: Utc::now(),
            last_modified_timestamp: Utc::now(),
        }
    }

    #[test]
    fn sent_invoice_past_due_is_overdue() {
        let now = Utc::now();
        let invoice = invoice_with(InvoiceStatus::Sent, now - Duration::days(1));
        assert!(invoice.is_overdue_at(now));
        assert!(!invoice.is_expired_at(now));
    }

    #[test]
    fn draft_invoice_past_due_is_expired_not_overdue() {
        let now = Utc::now();
        let invoice = invoice_with(InvoiceStatus::Draft, now - Duration::days(1));
        assert!(invoice.is_expired_at(now));
        assert!(!invoice.is_overdue_at(now));
    }

    #[test]
    fn paid_invoice_is_never_overdue_or_expired() {
        let now = Utc::now();
        let invoice = invoice_with(InvoiceStatus::Paid, now - Duration::days(30));
        assert!(!invoice.is_overdue_at(now));
        assert!(!invoice.is_expired_at(now));
    }

    #[test]
    fn predicates_are_mutually_exclusive_for_every_status() {
        let now = Utc::now();
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
        ] {
            for due in [now - Duration::days(3), now + Duration::days(3)] {
                let invoice = invoice_with(status, due);
                assert!(
                    !(invoice.is_overdue_at(now) && invoice.is_expired_at(now)),
                    "overdue and expired both true for {:?}",
                    status
                );
            }
        }
    }

    #[test]
    fn days_until_due_is_signed() {
        let now = Utc::now();
        let future = invoice_with(InvoiceStatus::Sent, now + Duration::days(5));
        assert_eq!(future.days_until_due_at(now), 5);

        let past = invoice_with(InvoiceStatus::Overdue, now - Duration::days(5));
        assert_eq!(past.days_until_due_at(now), -5);
    }

    #[test]
    fn days_until_due_floors_sub_day_offsets() {
        let now = Utc::now();

        let past = invoice_with(InvoiceStatus::Sent, now - Duration::hours(12));
        assert_eq!(past.days_until_due_at(now), -1);

        let future = invoice_with(InvoiceStatus::Sent, now + Duration::hours(12));
        assert_eq!(future.days_until_due_at(now), 0);
    }

    #[test]
    fn email_fires_only_on_transition_into_sent() {
        use InvoiceStatus::*;
        assert!(should_send_email(Draft, Sent));
        assert!(should_send_email(Overdue, Sent));
        assert!(!should_send_email(Sent, Sent));
        assert!(!should_send_email(Draft, Draft));
        assert!(!should_send_email(Sent, Paid));
        assert!(!should_send_email(Draft, Paid));
    }

    #[test]
    fn unknown_status_string_reads_as_draft() {
        assert_eq!(InvoiceStatus::from_string("bogus"), InvoiceStatus::Draft);
    }
}
