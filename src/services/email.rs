//! Invoice email delivery over SMTP.

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::models::{BusinessProfile, Client, Invoice};
use crate::services::currency::currency_symbol;
use crate::services::metrics::EMAIL_DISPATCH_TOTAL;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

/// Sends the invoice notification to the client.
///
/// Implementations must be safe to call from the request path; delivery
/// failures are reported, not retried.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_invoice_email(
        &self,
        invoice: &Invoice,
        client: &Client,
        profile: &BusinessProfile,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(plain_body.to_string())
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send email in blocking thread pool to avoid blocking async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                EMAIL_DISPATCH_TOTAL.with_label_values(&["sent"]).inc();
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to_email,
                    "Failed to send email"
                );
                EMAIL_DISPATCH_TOTAL.with_label_values(&["failed"]).inc();
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_invoice_email(
        &self,
        invoice: &Invoice,
        client: &Client,
        profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        let subject = format!(
            "Invoice {} from {}",
            invoice.invoice_number, profile.business_name
        );

        let plain_body = format!(
            "Dear {},\n\n\
             Please find attached your invoice {}.\n\n\
             Invoice Details:\n\
             - Invoice Number: {}\n\
             - Date: {}\n\
             - Due Date: {}\n\
             - Total Amount: {}{}\n\n\
             Thank you for your business!\n\n\
             Best regards,\n\
             {}",
            client.name,
            invoice.invoice_number,
            invoice.invoice_number,
            invoice.created_timestamp.format("%B %d, %Y"),
            invoice.due_date.format("%B %d, %Y"),
            currency_symbol(&invoice.currency),
            invoice.total_amount,
            profile.business_name,
        );

        self.send_email(&client.email, &subject, &plain_body).await
    }
}

/// No-op provider for local runs without SMTP credentials and for tests.
/// Counts dispatches so tests can assert exactly-once delivery.
#[derive(Clone, Default)]
pub struct MockEmailService {
    sent: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_invoice_email(
        &self,
        invoice: &Invoice,
        client: &Client,
        _profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        self.sent.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tracing::info!(
            invoice_number = %invoice.invoice_number,
            to = %client.email,
            "Mock email dispatch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fixtures() -> (Invoice, Client, BusinessProfile) {
        let user_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            user_id,
            client_id,
            invoice_number: "INV-00007".to_string(),
            status: InvoiceStatus::Sent.as_str().to_string(),
            currency: "USD".to_string(),
            due_date: Utc::now(),
            subtotal: dec!(100.00),
            tax_rate: dec!(0),
            tax_amount: dec!(0.00),
            discount_amount: dec!(0),
            total_amount: dec!(100.00),
            notes: String::new(),
            pdf_generated: false,
            created_timestamp: Utc::now(),
            last_modified_timestamp: Utc::now(),
        };
        let client = Client {
            client_id,
            user_id,
            name: "Acme Corp".to_string(),
            email: "billing@acme.test".to_string(),
            phone: String::new(),
            street_address: String::new(),
            city: String::new(),
            state_province: String::new(),
            zip_postal_code: String::new(),
            country: String::new(),
            created_utc: Utc::now(),
        };
        let profile = BusinessProfile {
            user_id,
            business_name: "Studio North".to_string(),
            business_email: "owner@studionorth.test".to_string(),
            phone_country_code: "+1".to_string(),
            phone_number: "5550100".to_string(),
            street_address: String::new(),
            city: String::new(),
            state_province: String::new(),
            zip_postal_code: String::new(),
            country: String::new(),
            preferred_currency: "USD".to_string(),
            logo_path: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        };
        (invoice, client, profile)
    }

    #[tokio::test]
    async fn mock_service_counts_dispatches() {
        let (invoice, client, profile) = fixtures();
        let mock = MockEmailService::new();
        assert_eq!(mock.sent_count(), 0);

        mock.send_invoice_email(&invoice, &client, &profile)
            .await
            .unwrap();
        mock.send_invoice_email(&invoice, &client, &profile)
            .await
            .unwrap();

        assert_eq!(mock.sent_count(), 2);
    }

    #[test]
    fn email_service_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.test".to_string(),
            user: "mailer".to_string(),
            password: "secret".to_string(),
            from_email: "billing@example.test".to_string(),
        };

        assert!(EmailService::new(&config).is_ok());
    }
}
