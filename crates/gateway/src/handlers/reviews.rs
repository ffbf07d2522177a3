//! Review handlers

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::extract::{AppJson, AppPath};
use crate::handlers::MessageResponse;
use crate::AppState;
use cinelog_common::{
    auth::AuthContext,
    catalog::{ReviewListing, ReviewSubmission},
    errors::{AppError, Result},
};

/// Body of a review moderation request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewRequest {
    #[validate(required)]
    pub movie_id: Option<Uuid>,

    #[validate(required)]
    pub review_id: Option<Uuid>,
}

/// Submit the caller's review of a movie
pub async fn submit_review(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(movie_id): AppPath<Uuid>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let reviewer = auth.reviewer();
    // Admins are turned away before the body is even looked at
    reviewer.ensure_may_review()?;

    let Json(submission) =
        Json::<ReviewSubmission>::from_bytes(&body).map_err(|rejection| AppError::Validation {
            message: rejection.body_text(),
            field: None,
        })?;

    let review = state.reviews.submit(movie_id, &reviewer, submission).await?;

    tracing::debug!(
        review_id = %review.id,
        request_id = %auth.request_id,
        "Review stored"
    );

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Review added"))))
}

/// Remove a review (moderation)
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(request): AppJson<DeleteReviewRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_admin()?;
    request.validate()?;

    let (Some(movie_id), Some(review_id)) = (request.movie_id, request.review_id) else {
        return Err(AppError::MissingField {
            field: "movieId".to_string(),
        });
    };

    state.reviews.delete(movie_id, review_id).await?;
    Ok(Json(MessageResponse::new("Review deleted")))
}

/// Every review across the catalogue, newest first
pub async fn list_reviews(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ReviewListing>>> {
    auth.require_admin()?;
    Ok(Json(state.reviews.list_all().await?))
}
