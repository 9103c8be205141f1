use crate::dtos::ProfileRequest;
use crate::error::AppError;
use crate::middleware::OwnerId;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

pub async fn get_profile(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Business profile not found")))?;

    Ok(Json(profile))
}

pub async fn put_profile(
    State(state): State<AppState>,
    OwnerId(user_id): OwnerId,
    Json(payload): Json<ProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = state.db.upsert_profile(user_id, &payload.into_input()).await?;

    Ok(Json(profile))
}
