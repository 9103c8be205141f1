//! Owner scoping: another owner's rows read as missing, and deleting a
//! client cascades to its invoices.

mod common;

use chrono::{Duration, Utc};
use serde_json::Value;
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn foreign_owner_rows_read_as_missing() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    app.create_profile().await;
    let client_id = app.create_client().await;
    let invoice = app
        .create_invoice(client_id, "draft", Utc::now() + Duration::days(30))
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let stranger = Uuid::new_v4();

    let response = app
        .get_as(stranger, &format!("/clients/{}", client_id))
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .get_as(stranger, &format!("/invoices/{}", invoice_id))
        .await;
    assert_eq!(response.status(), 404);

    let response = app.get_as(stranger, "/invoices").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["invoices"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn missing_owner_header_is_rejected() {
    let Some(app) = common::spawn_app().await else {
        return;
    };

    let response = app
        .http
        .get(format!("{}/invoices", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
async fn deleting_a_client_cascades_to_its_invoices() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    app.create_profile().await;
    let client_id = app.create_client().await;
    let invoice = app
        .create_invoice(client_id, "draft", Utc::now() + Duration::days(30))
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app.delete(&format!("/clients/{}", client_id)).await;
    assert_eq!(response.status(), 204);

    let response = app.get(&format!("/invoices/{}", invoice_id)).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[serial]
async fn client_list_reports_invoice_counts() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    app.create_profile().await;
    let client_id = app.create_client().await;
    app.create_invoice(client_id, "draft", Utc::now() + Duration::days(30))
        .await;
    app.create_invoice(client_id, "sent", Utc::now() + Duration::days(30))
        .await;

    let response = app.get("/clients").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let clients = body.as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["invoice_count"], 2);
}
