//! Wishlist handlers for the authenticated user

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::extract::{AppJson, AppPath};
use crate::handlers::movies::{movie_list, MovieResponse};
use crate::handlers::MessageResponse;
use crate::AppState;
use cinelog_common::{
    auth::AuthContext,
    catalog::WishlistChange,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    #[validate(required)]
    pub movie_id: Option<Uuid>,
}

/// Add a movie; 201 when new, 200 when it was already there
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(request): AppJson<WishlistRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    request.validate()?;
    let movie_id = request.movie_id.ok_or_else(|| AppError::MissingField {
        field: "movieId".to_string(),
    })?;

    let response = match state.wishlist.add(auth.user_id, movie_id).await? {
        WishlistChange::Added => (StatusCode::CREATED, "Movie added to wishlist"),
        _ => (StatusCode::OK, "Movie already in wishlist"),
    };

    Ok((response.0, Json(MessageResponse::new(response.1))))
}

/// Remove a movie; succeeds whether or not it was listed
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(movie_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    let message = match state.wishlist.remove(auth.user_id, movie_id).await? {
        WishlistChange::Removed => "Movie removed from wishlist",
        _ => "Movie was not in wishlist",
    };

    Ok(Json(MessageResponse::new(message)))
}

pub async fn list_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<MovieResponse>>> {
    let movies = state.wishlist.list(auth.user_id).await?;
    Ok(movie_list(movies))
}
