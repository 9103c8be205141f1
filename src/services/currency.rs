//! Currency conversion with a live-rate lookup and a static fallback table.
//!
//! `convert` never fails: a dead or slow rate service degrades to the
//! fallback table, and an unknown currency pair degrades to returning the
//! amount unchanged. Availability over accuracy, for dashboard aggregation.

use crate::config::CurrencyApiConfig;
use crate::error::AppError;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Which path produced a converted amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Same currency on both sides, or last-resort identity fallback.
    Identity,
    /// Live rate from the external service.
    Live,
    /// Static fallback table cross rate.
    Fallback,
}

pub const SUPPORTED_CURRENCIES: [&str; 10] = [
    "USD", "EUR", "GBP", "JPY", "AUD", "CAD", "CHF", "CNY", "INR", "PHP",
];

/// Static rates relative to USD, used when the live lookup fails.
static FALLBACK_RATES: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    HashMap::from([
        ("USD", Decimal::new(100, 2)),
        ("EUR", Decimal::new(92, 2)),
        ("GBP", Decimal::new(79, 2)),
        ("JPY", Decimal::new(14950, 2)),
        ("AUD", Decimal::new(153, 2)),
        ("CAD", Decimal::new(136, 2)),
        ("CHF", Decimal::new(88, 2)),
        ("CNY", Decimal::new(724, 2)),
        ("INR", Decimal::new(8312, 2)),
        ("PHP", Decimal::new(5650, 2)),
    ])
});

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "AUD" => "A$",
        "CAD" => "C$",
        "CHF" => "Fr",
        "CNY" => "¥",
        "INR" => "₹",
        "PHP" => "₱",
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Converts amounts between currencies via `GET {base}/v4/latest/{from}`
/// with a short timeout.
#[derive(Clone)]
pub struct CurrencyConverter {
    http: reqwest::Client,
    base_url: String,
}

impl CurrencyConverter {
    pub fn new(config: &CurrencyApiConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert `amount` from one currency to another. Infallible by contract.
    pub async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Decimal {
        self.convert_with_source(amount, from, to).await.0
    }

    /// As [`convert`](Self::convert), also reporting which path produced the
    /// result so fallback behavior stays observable.
    pub async fn convert_with_source(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> (Decimal, RateSource) {
        if from == to {
            return (amount, RateSource::Identity);
        }

        match self.live_rate(from, to).await {
            Ok(rate) => {
                debug!(from = from, to = to, rate = %rate, "Live rate lookup succeeded");
                ((amount * rate).round_dp(2), RateSource::Live)
            }
            Err(e) => {
                warn!(from = from, to = to, error = %e, "Live rate lookup failed, using fallback table");
                match fallback_convert(amount, from, to) {
                    Some(converted) => (converted, RateSource::Fallback),
                    None => (amount, RateSource::Identity),
                }
            }
        }
    }

    async fn live_rate(&self, from: &str, to: &str) -> Result<Decimal, anyhow::Error> {
        let url = format!("{}/v4/latest/{}", self.base_url, from);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("rate service returned {}", response.status());
        }

        let body: RatesResponse = response.json().await?;
        let rate = body
            .rates
            .get(to)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("currency {} missing from rate response", to))?;

        Decimal::try_from(rate).map_err(|e| anyhow::anyhow!("rate {} not representable: {}", rate, e))
    }
}

/// Cross rate through the USD-based fallback table. `None` when either
/// currency is unknown.
fn fallback_convert(amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
    let from_rate = FALLBACK_RATES.get(from)?;
    let to_rate = FALLBACK_RATES.get(to)?;
    Some((amount / from_rate * to_rate).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn converter(base_url: &str) -> CurrencyConverter {
        CurrencyConverter::new(&CurrencyApiConfig {
            base_url: base_url.to_string(),
            timeout_ms: 500,
        })
        .unwrap()
    }

    /// Unroutable endpoint, so the live lookup always fails fast.
    fn dead_converter() -> CurrencyConverter {
        converter("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn same_currency_is_identity_without_lookup() {
        let (amount, source) = dead_converter()
            .convert_with_source(dec!(100), "USD", "USD")
            .await;
        assert_eq!(amount, dec!(100));
        assert_eq!(source, RateSource::Identity);
    }

    #[tokio::test]
    async fn dead_service_falls_back_to_static_table() {
        let (amount, source) = dead_converter()
            .convert_with_source(dec!(100), "EUR", "GBP")
            .await;
        // 100 / 0.92 * 0.79
        assert_eq!(amount, dec!(85.87));
        assert_eq!(source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn usd_base_fallback_uses_table_rate_directly() {
        let (amount, source) = dead_converter()
            .convert_with_source(dec!(10), "USD", "JPY")
            .await;
        assert_eq!(amount, dec!(1495.00));
        assert_eq!(source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn unknown_pair_degrades_to_identity() {
        let (amount, source) = dead_converter()
            .convert_with_source(dec!(42.42), "XXX", "YYY")
            .await;
        assert_eq!(amount, dec!(42.42));
        assert_eq!(source, RateSource::Identity);
    }

    #[tokio::test]
    async fn live_rate_is_used_when_the_service_responds() {
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/v4/latest/:code",
            get(|| async {
                Json(serde_json::json!({
                    "rates": { "EUR": 0.5, "GBP": 0.25 }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let (amount, source) = converter(&format!("http://{}", addr))
            .convert_with_source(dec!(100), "USD", "EUR")
            .await;
        assert_eq!(amount, dec!(50.00));
        assert_eq!(source, RateSource::Live);
    }

    #[tokio::test]
    async fn missing_currency_in_live_response_falls_back() {
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/v4/latest/:code",
            get(|| async { Json(serde_json::json!({ "rates": {} })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let (_, source) = converter(&format!("http://{}", addr))
            .convert_with_source(dec!(100), "EUR", "GBP")
            .await;
        assert_eq!(source, RateSource::Fallback);
    }
}
