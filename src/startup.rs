//! Application startup and lifecycle management.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers;
use crate::services::metrics::init_metrics;
use crate::services::{
    CurrencyConverter, Database, EmailProvider, EmailService, MockEmailService, Scheduler,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub converter: CurrencyConverter,
    pub email: Arc<dyn EmailProvider>,
    pub scheduler: Scheduler,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true, None).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: AppConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false, None).await
    }

    /// Build with an injected email provider. Used by tests to observe
    /// dispatches without an SMTP server.
    pub async fn build_with_email(
        config: AppConfig,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        Self::build_internal(config, true, Some(email)).await
    }

    async fn build_internal(
        config: AppConfig,
        run_migrations: bool,
        email_override: Option<Arc<dyn EmailProvider>>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let converter = CurrencyConverter::new(&config.currency_api)?;

        // Without SMTP credentials the mailer logs dispatches instead of
        // attempting delivery.
        let email: Arc<dyn EmailProvider> = match email_override {
            Some(email) => email,
            None if config.smtp.user.is_empty() => {
                tracing::warn!("SMTP_USER not set, using mock email provider");
                Arc::new(MockEmailService::new())
            }
            None => Arc::new(EmailService::new(&config.smtp)?),
        };

        let scheduler = Scheduler::new(db.clone());

        let state = AppState {
            config: config.clone(),
            db,
            converter,
            email,
            scheduler,
        };

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "HTTP listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Build the HTTP router.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health))
            .route("/ready", get(handlers::health::ready))
            .route("/metrics", get(handlers::health::metrics))
            .route(
                "/profile",
                get(handlers::profile::get_profile)
                    .put(handlers::profile::put_profile)
                    .post(handlers::profile::put_profile),
            )
            .route(
                "/clients",
                get(handlers::clients::list_clients).post(handlers::clients::create_client),
            )
            .route(
                "/clients/:client_id",
                get(handlers::clients::get_client)
                    .put(handlers::clients::update_client)
                    .delete(handlers::clients::delete_client),
            )
            .route(
                "/invoices",
                get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
            )
            .route(
                "/invoices/:invoice_id",
                get(handlers::invoices::get_invoice)
                    .put(handlers::invoices::update_invoice)
                    .delete(handlers::invoices::delete_invoice),
            )
            .route(
                "/invoices/:invoice_id/pdf",
                get(handlers::invoices::download_invoice_pdf),
            )
            .route("/dashboard", get(handlers::dashboard::dashboard))
            .route("/ads/click", post(handlers::ads::record_ad_click))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.state.scheduler.spawn(&self.state.config.scheduler);

        let router = Self::router(self.state.clone());

        tracing::info!(
            service = %self.state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
