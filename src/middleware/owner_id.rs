use crate::error::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

/// Owner extractor.
///
/// Extracts the authenticated user id from the X-User-ID header set by the
/// fronting gateway. Every data-touching handler takes this extractor, and
/// every query it feeds is scoped to the extracted owner; rows owned by
/// someone else behave as if they do not exist.
#[derive(Debug, Clone, Copy)]
pub struct OwnerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Missing X-User-ID header"))
            })?;

        let user_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid X-User-ID header")))?;

        // Add to tracing span for observability
        tracing::Span::current().record("user_id", raw);

        Ok(OwnerId(user_id))
    }
}
