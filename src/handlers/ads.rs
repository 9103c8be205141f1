use crate::dtos::{AdClickRequest, AdClickResponse};
use crate::error::AppError;
use crate::startup::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// Record an ad click. The owner header is optional here; clicks can arrive
/// from sessions that are not signed in.
pub async fn record_ad_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdClickRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = headers
        .get("X-User-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok());

    let click = state.db.record_ad_click(&payload.into_input(user_id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(AdClickResponse {
            success: true,
            click_id: click.click_id,
        }),
    ))
}
