//! Genre handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::extract::{AppJson, AppPath};
use crate::handlers::MessageResponse;
use crate::AppState;
use cinelog_common::{
    auth::AuthContext,
    catalog::{Genre, NewGenre},
    errors::Result,
};

pub async fn list_genres(State(state): State<AppState>) -> Result<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.list_genres().await?))
}

pub async fn create_genre(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(input): AppJson<NewGenre>,
) -> Result<(StatusCode, Json<Genre>)> {
    auth.require_admin()?;
    let genre = state.catalog.create_genre(input).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(genre_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_admin()?;
    state.catalog.delete_genre(genre_id).await?;
    Ok(Json(MessageResponse::new("Genre deleted")))
}
