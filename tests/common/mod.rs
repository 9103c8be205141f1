//! Common test utilities for invoice-maker integration tests.
//!
//! Tests require a PostgreSQL instance reachable via `TEST_DATABASE_URL`;
//! when the variable is unset every test returns early. Invoice numbers are
//! globally unique, so tests truncate state and run serially.

use invoice_maker::config::{
    AppConfig, CurrencyApiConfig, DatabaseConfig, SchedulerConfig, SmtpConfig,
};
use invoice_maker::services::{Database, MockEmailService};
use invoice_maker::startup::Application;
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoice_maker=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        service_name: "invoice-maker-test".to_string(),
        log_level: "debug".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 2,
            min_connections: 1,
        },
        smtp: SmtpConfig {
            host: "smtp.example.test".to_string(),
            user: String::new(),
            password: String::new(),
            from_email: "test@invoicemaker.local".to_string(),
        },
        currency_api: CurrencyApiConfig {
            // Unroutable, so conversions exercise the fallback table.
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 200,
        },
        scheduler: SchedulerConfig { enabled: false },
    }
}

/// Test application wrapper.
#[allow(dead_code)]
pub struct TestApp {
    pub base_url: String,
    pub http: reqwest::Client,
    pub user_id: Uuid,
    pub email: Arc<MockEmailService>,
    pub db: Database,
}

/// Spawn a test application, or `None` when `TEST_DATABASE_URL` is unset.
pub async fn spawn_app() -> Option<TestApp> {
    init_tracing();

    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping integration test");
            return None;
        }
    };

    let config = test_config(database_url.clone());
    let email = Arc::new(MockEmailService::new());

    let app = Application::build_with_email(config, email.clone())
        .await
        .expect("Failed to build application");
    let http_port = app.http_port();
    let db = app.db().clone();

    sqlx::query(
        "TRUNCATE invoice_items, invoices, clients, business_profiles, ad_clicks, job_executions",
    )
    .execute(db.pool())
    .await
    .expect("Failed to truncate test tables");

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    Some(TestApp {
        base_url: format!("http://127.0.0.1:{}", http_port),
        http: reqwest::Client::new(),
        user_id: Uuid::new_v4(),
        email,
        db,
    })
}

#[allow(dead_code)]
impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_as(self.user_id, path).await
    }

    pub async fn get_as(&self, user_id: Uuid, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header("X-User-ID", user_id.to_string())
            .send()
            .await
            .expect("request failed")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.post_as(self.user_id, path, body).await
    }

    pub async fn post_as(&self, user_id: Uuid, path: &str, body: &Value) -> reqwest::Response {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header("X-User-ID", user_id.to_string())
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.put_as(self.user_id, path, body).await
    }

    pub async fn put_as(&self, user_id: Uuid, path: &str, body: &Value) -> reqwest::Response {
        self.http
            .put(format!("{}{}", self.base_url, path))
            .header("X-User-ID", user_id.to_string())
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}{}", self.base_url, path))
            .header("X-User-ID", self.user_id.to_string())
            .send()
            .await
            .expect("request failed")
    }

    /// Create a business profile for the default test user.
    pub async fn create_profile(&self) -> Value {
        self.create_profile_as(self.user_id, "USD").await
    }

    pub async fn create_profile_as(&self, user_id: Uuid, preferred_currency: &str) -> Value {
        let response = self
            .put_as(
                user_id,
                "/profile",
                &json!({
                    "business_name": "Studio North",
                    "business_email": "owner@studionorth.test",
                    "phone_country_code": "+1",
                    "phone_number": "5550101",
                    "street_address": "9 Oak Ave",
                    "city": "Portland",
                    "state_province": "OR",
                    "zip_postal_code": "97201",
                    "country": "USA",
                    "preferred_currency": preferred_currency
                }),
            )
            .await;
        assert_eq!(response.status(), 200, "profile upsert failed");
        response.json().await.expect("invalid profile json")
    }

    /// Create a client for the default test user, returning its id.
    pub async fn create_client(&self) -> Uuid {
        self.create_client_as(self.user_id).await
    }

    pub async fn create_client_as(&self, user_id: Uuid) -> Uuid {
        let response = self
            .post_as(
                user_id,
                "/clients",
                &json!({
                    "name": "Acme Corp",
                    "email": "billing@acme.test",
                    "phone": "5550100",
                    "street_address": "1 Main St",
                    "city": "Springfield",
                    "state_province": "IL",
                    "zip_postal_code": "62701",
                    "country": "USA"
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "client create failed");
        let body: Value = response.json().await.expect("invalid client json");
        Uuid::parse_str(body["client_id"].as_str().unwrap()).unwrap()
    }

    /// Create an invoice and return the response body.
    pub async fn create_invoice(
        &self,
        client_id: Uuid,
        status: &str,
        due_date: chrono::DateTime<chrono::Utc>,
    ) -> Value {
        let response = self
            .post(
                "/invoices",
                &json!({
                    "client_id": client_id,
                    "status": status,
                    "currency": "USD",
                    "due_date": due_date.to_rfc3339(),
                    "tax_rate": "10",
                    "discount_amount": "5.00",
                    "notes": "",
                    "items": [
                        { "description": "Design work", "quantity": "10", "unit_price": "10.00" }
                    ]
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "invoice create failed");
        response.json().await.expect("invalid invoice json")
    }
}
