//! Database service for invoice-maker.
//!
//! Every query that touches user data is owner-scoped; a row owned by
//! another user reads the same as a missing row.

use crate::error::AppError;
use crate::models::{
    AdClick, BusinessProfile, Client, ClientSummary, CreateAdClick, CreateInvoice, Invoice,
    InvoiceItem, InvoiceStatus, UpdateInvoice, UpsertBusinessProfile, UpsertClient,
};
use crate::services::billing;
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::numbering;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, user_id, client_id, invoice_number, status, currency, \
     due_date, subtotal, tax_rate, tax_amount, discount_amount, total_amount, notes, \
     pdf_generated, created_timestamp, last_modified_timestamp";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-maker"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Business Profile Operations
    // -------------------------------------------------------------------------

    /// Create or edit the owner's business profile.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        input: &UpsertBusinessProfile,
    ) -> Result<BusinessProfile, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_profile"])
            .start_timer();

        let profile = sqlx::query_as::<_, BusinessProfile>(
            r#"
            INSERT INTO business_profiles (
                user_id, business_name, business_email, phone_country_code, phone_number,
                street_address, city, state_province, zip_postal_code, country,
                preferred_currency, logo_path
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id) DO UPDATE
            SET business_name = EXCLUDED.business_name,
                business_email = EXCLUDED.business_email,
                phone_country_code = EXCLUDED.phone_country_code,
                phone_number = EXCLUDED.phone_number,
                street_address = EXCLUDED.street_address,
                city = EXCLUDED.city,
                state_province = EXCLUDED.state_province,
                zip_postal_code = EXCLUDED.zip_postal_code,
                country = EXCLUDED.country,
                preferred_currency = EXCLUDED.preferred_currency,
                logo_path = EXCLUDED.logo_path,
                updated_utc = NOW()
            RETURNING user_id, business_name, business_email, phone_country_code, phone_number,
                street_address, city, state_province, zip_postal_code, country,
                preferred_currency, logo_path, created_utc, updated_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.business_name)
        .bind(&input.business_email)
        .bind(&input.phone_country_code)
        .bind(&input.phone_number)
        .bind(&input.street_address)
        .bind(&input.city)
        .bind(&input.state_province)
        .bind(&input.zip_postal_code)
        .bind(&input.country)
        .bind(&input.preferred_currency)
        .bind(&input.logo_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to save profile: {}", e)))?;

        timer.observe_duration();

        info!(business_name = %profile.business_name, "Business profile saved");

        Ok(profile)
    }

    /// Get the owner's business profile.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_profile"])
            .start_timer();

        let profile = sqlx::query_as::<_, BusinessProfile>(
            r#"
            SELECT user_id, business_name, business_email, phone_country_code, phone_number,
                street_address, city, state_province, zip_postal_code, country,
                preferred_currency, logo_path, created_utc, updated_utc
            FROM business_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get profile: {}", e)))?;

        timer.observe_duration();

        Ok(profile)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a new client for the owner.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_client(
        &self,
        user_id: Uuid,
        input: &UpsertClient,
    ) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client_id = Uuid::new_v4();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                client_id, user_id, name, email, phone,
                street_address, city, state_province, zip_postal_code, country
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING client_id, user_id, name, email, phone,
                street_address, city, state_province, zip_postal_code, country, created_utc
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.street_address)
        .bind(&input.city)
        .bind(&input.state_province)
        .bind(&input.zip_postal_code)
        .bind(&input.country)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, name = %client.name, "Client created");

        Ok(client)
    }

    /// List the owner's clients with their invoice counts, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_clients(&self, user_id: Uuid) -> Result<Vec<ClientSummary>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, ClientSummary>(
            r#"
            SELECT c.client_id, c.user_id, c.name, c.email, c.phone,
                c.street_address, c.city, c.state_province, c.zip_postal_code, c.country,
                c.created_utc, COUNT(i.invoice_id) AS invoice_count
            FROM clients c
            LEFT JOIN invoices i ON i.client_id = c.client_id
            WHERE c.user_id = $1
            GROUP BY c.client_id
            ORDER BY c.created_utc DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Get one of the owner's clients.
    #[instrument(skip(self), fields(user_id = %user_id, client_id = %client_id))]
    pub async fn get_client(
        &self,
        user_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, user_id, name, email, phone,
                street_address, city, state_province, zip_postal_code, country, created_utc
            FROM clients
            WHERE user_id = $1 AND client_id = $2
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Update one of the owner's clients.
    #[instrument(skip(self, input), fields(user_id = %user_id, client_id = %client_id))]
    pub async fn update_client(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        input: &UpsertClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $3, email = $4, phone = $5, street_address = $6,
                city = $7, state_province = $8, zip_postal_code = $9, country = $10
            WHERE user_id = $1 AND client_id = $2
            RETURNING client_id, user_id, name, email, phone,
                street_address, city, state_province, zip_postal_code, country, created_utc
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.street_address)
        .bind(&input.city)
        .bind(&input.state_province)
        .bind(&input.zip_postal_code)
        .bind(&input.country)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Delete one of the owner's clients. Cascades to the client's invoices
    /// and their line items.
    #[instrument(skip(self), fields(user_id = %user_id, client_id = %client_id))]
    pub async fn delete_client(&self, user_id: Uuid, client_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clients WHERE user_id = $1 AND client_id = $2")
            .bind(user_id)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(client_id = %client_id, "Client deleted (invoices cascade)");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create an invoice with its line items in one transaction.
    ///
    /// The invoice number is derived from the owner's most recently created
    /// invoice inside the transaction. A unique-constraint collision (two
    /// raced creates picking the same candidate) is retried once with a
    /// regenerated number, then surfaced as a retryable conflict.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, client_id = %input.client_id))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<(Invoice, Vec<InvoiceItem>), AppError> {
        if input.status == InvoiceStatus::Overdue {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoices cannot be created as overdue"
            )));
        }

        // Foreign-owner clients read as missing.
        if self.get_client(input.user_id, input.client_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut last_error: Option<AppError> = None;
        for attempt in 0..2 {
            match self.try_insert_invoice(input).await {
                Ok(created) => {
                    timer.observe_duration();
                    info!(
                        invoice_id = %created.0.invoice_id,
                        invoice_number = %created.0.invoice_number,
                        status = %created.0.status,
                        "Invoice created"
                    );
                    return Ok(created);
                }
                Err(AppError::Conflict(e)) => {
                    warn!(attempt = attempt, error = %e, "Invoice number collision, retrying");
                    last_error = Some(AppError::Conflict(e));
                }
                Err(e) => {
                    timer.observe_duration();
                    return Err(e);
                }
            }
        }

        timer.observe_duration();
        Err(last_error.unwrap_or_else(|| {
            AppError::Conflict(anyhow::anyhow!("Invoice number collision"))
        }))
    }

    async fn try_insert_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<(Invoice, Vec<InvoiceItem>), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let last_number: Option<String> = sqlx::query_scalar(
            r#"
            SELECT invoice_number FROM invoices
            WHERE user_id = $1
            ORDER BY created_timestamp DESC, invoice_id DESC
            LIMIT 1
            "#,
        )
        .bind(input.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to read last invoice number: {}", e))
        })?;

        let invoice_number = numbering::next_invoice_number(last_number.as_deref());

        let line_totals: Vec<Decimal> = input
            .items
            .iter()
            .map(|item| billing::line_total(item.quantity, item.unit_price))
            .collect();
        let subtotal = billing::subtotal_of(line_totals.iter().copied());
        let (tax_amount, total_amount) =
            billing::invoice_totals(subtotal, input.tax_rate, input.discount_amount);

        let invoice_id = Uuid::new_v4();
        let insert = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, user_id, client_id, invoice_number, status, currency, due_date,
                subtotal, tax_rate, tax_amount, discount_amount, total_amount, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(input.user_id)
        .bind(input.client_id)
        .bind(&invoice_number)
        .bind(input.status.as_str())
        .bind(&input.currency)
        .bind(input.due_date)
        .bind(subtotal)
        .bind(input.tax_rate)
        .bind(tax_amount)
        .bind(input.discount_amount)
        .bind(total_amount)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await;

        let invoice = match insert {
            Ok(invoice) => invoice,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice_number
                )));
            }
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create invoice: {}",
                    e
                )));
            }
        };

        let items = insert_items(&mut tx, invoice.invoice_id, &input.items, &line_totals).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        Ok((invoice, items))
    }

    /// Get one of the owner's invoices.
    #[instrument(skip(self), fields(user_id = %user_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = $1 AND invoice_id = $2"
        ))
        .bind(user_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List the owner's invoices, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_invoices(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = $1 \
             ORDER BY created_timestamp DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// List the owner's invoices for one client, newest first.
    #[instrument(skip(self), fields(user_id = %user_id, client_id = %client_id))]
    pub async fn list_invoices_for_client(
        &self,
        user_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = $1 AND client_id = $2 \
             ORDER BY created_timestamp DESC"
        ))
        .bind(user_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list client invoices: {}", e))
        })?;

        Ok(invoices)
    }

    /// Line items for an invoice, in user-specified order.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT item_id, invoice_id, description, quantity, unit_price, line_total, order_position
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY order_position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Update an invoice, replacing its line items and recomputing totals.
    ///
    /// Returns the updated invoice together with the *previous* status, so
    /// the caller can fire the invoice email exactly on a transition into
    /// `sent`. The invoice number is never touched.
    #[instrument(skip(self, input), fields(user_id = %user_id, invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<(Invoice, Vec<InvoiceItem>, InvoiceStatus)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let existing = match self.get_invoice(user_id, invoice_id).await? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        let old_status = existing.status();

        // Only the reconciliation logic may assign `overdue`.
        if input.status == InvoiceStatus::Overdue && old_status != InvoiceStatus::Overdue {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Status cannot be set to overdue directly"
            )));
        }

        if input.client_id != existing.client_id
            && self.get_client(user_id, input.client_id).await?.is_none()
        {
            return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
        }

        let line_totals: Vec<Decimal> = input
            .items
            .iter()
            .map(|item| billing::line_total(item.quantity, item.unit_price))
            .collect();
        let subtotal = billing::subtotal_of(line_totals.iter().copied());
        let (tax_amount, total_amount) =
            billing::invoice_totals(subtotal, input.tax_rate, input.discount_amount);

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET client_id = $3, status = $4, currency = $5, due_date = $6,
                subtotal = $7, tax_rate = $8, tax_amount = $9,
                discount_amount = $10, total_amount = $11, notes = $12,
                last_modified_timestamp = NOW()
            WHERE user_id = $1 AND invoice_id = $2
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.status.as_str())
        .bind(&input.currency)
        .bind(input.due_date)
        .bind(subtotal)
        .bind(input.tax_rate)
        .bind(tax_amount)
        .bind(input.discount_amount)
        .bind(total_amount)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to clear line items: {}", e))
            })?;

        let items = insert_items(&mut tx, invoice_id, &input.items, &line_totals).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice update: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_number = %invoice.invoice_number,
            old_status = old_status.as_str(),
            new_status = %invoice.status,
            "Invoice updated"
        );

        Ok(Some((invoice, items, old_status)))
    }

    /// Delete one of the owner's invoices (line items cascade).
    #[instrument(skip(self), fields(user_id = %user_id, invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, user_id: Uuid, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE user_id = $1 AND invoice_id = $2")
            .bind(user_id)
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice deleted");
        }

        Ok(deleted)
    }

    /// Record that a PDF has been generated for this invoice at least once.
    #[instrument(skip(self), fields(user_id = %user_id, invoice_id = %invoice_id))]
    pub async fn mark_pdf_generated(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE invoices SET pdf_generated = TRUE WHERE user_id = $1 AND invoice_id = $2",
        )
        .bind(user_id)
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark pdf generated: {}", e))
        })?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Overdue Reconciliation
    // -------------------------------------------------------------------------

    /// Flip `sent` invoices past their due date to `overdue`, optionally
    /// scoped to one owner. Idempotent: a second run with no intervening time
    /// passage updates nothing. Returns the updated invoice numbers.
    #[instrument(skip(self))]
    pub async fn reconcile_overdue(&self, owner: Option<Uuid>) -> Result<Vec<String>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reconcile_overdue"])
            .start_timer();

        let updated: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE invoices
            SET status = 'overdue', last_modified_timestamp = NOW()
            WHERE status = 'sent'
              AND due_date < NOW()
              AND ($1::uuid IS NULL OR user_id = $1)
            RETURNING invoice_number
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to reconcile overdue: {}", e))
        })?;

        timer.observe_duration();

        for number in &updated {
            info!(invoice_number = %number, "Invoice transitioned to overdue");
        }

        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Ad Clicks
    // -------------------------------------------------------------------------

    /// Record an ad click. Fire-and-forget semantics; the referenced invoice
    /// is nulled out if it ever goes away.
    #[instrument(skip(self, input))]
    pub async fn record_ad_click(&self, input: &CreateAdClick) -> Result<AdClick, AppError> {
        let click_id = Uuid::new_v4();
        let click = sqlx::query_as::<_, AdClick>(
            r#"
            INSERT INTO ad_clicks (
                click_id, user_id, session_id, ad_identifier, ad_placement,
                target_url, user_context, invoice_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING click_id, user_id, session_id, ad_identifier, ad_placement,
                target_url, user_context, invoice_id, created_utc
            "#,
        )
        .bind(click_id)
        .bind(input.user_id)
        .bind(&input.session_id)
        .bind(&input.ad_identifier)
        .bind(input.ad_placement.as_str())
        .bind(&input.target_url)
        .bind(&input.user_context)
        .bind(input.invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record ad click: {}", e)))?;

        Ok(click)
    }

    // -------------------------------------------------------------------------
    // Job Execution History
    // -------------------------------------------------------------------------

    /// Record one scheduler job run.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn record_job_execution(
        &self,
        job_id: &str,
        started_utc: DateTime<Utc>,
        finished_utc: DateTime<Utc>,
        succeeded: bool,
        detail: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO job_executions (execution_id, job_id, started_utc, finished_utc, status, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(started_utc)
        .bind(finished_utc)
        .bind(if succeeded { "succeeded" } else { "failed" })
        .bind(detail)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record job execution: {}", e))
        })?;

        Ok(())
    }

    /// Delete job execution records that finished before the cutoff.
    #[instrument(skip(self))]
    pub async fn delete_old_job_executions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM job_executions WHERE finished_utc < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to delete old job executions: {}",
                    e
                ))
            })?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(deleted = deleted, "Pruned old job execution records");
        }

        Ok(deleted)
    }
}

/// Insert line items with `order_position` taken from list order.
async fn insert_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    invoice_id: Uuid,
    items: &[crate::models::CreateInvoiceItem],
    line_totals: &[Decimal],
) -> Result<Vec<InvoiceItem>, AppError> {
    let mut inserted = Vec::with_capacity(items.len());

    for (position, (item, line_total)) in items.iter().zip(line_totals).enumerate() {
        let row = sqlx::query_as::<_, InvoiceItem>(
            r#"
            INSERT INTO invoice_items (
                item_id, invoice_id, description, quantity, unit_price, line_total, order_position
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING item_id, invoice_id, description, quantity, unit_price, line_total, order_position
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(line_total)
        .bind(position as i32)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e)))?;

        inserted.push(row);
    }

    Ok(inserted)
}
