//! Movie catalogue handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::MessageResponse;
use crate::AppState;
use cinelog_common::{
    auth::AuthContext,
    catalog::{
        Genre, ListingQuery, Movie, MovieFilter, MovieUpdate, MovieWithGenre, NewMovie,
        ReleaseMonthGroup, Review,
    },
    errors::Result,
};

/// Genre as embedded in a single-movie response
#[derive(Debug, Serialize)]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
}

impl From<Genre> for GenreRef {
    fn from(genre: Genre) -> Self {
        Self {
            id: genre.id,
            name: genre.name,
        }
    }
}

/// Bare id in listings, `{id, name}` when resolved
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenreField {
    Id(Uuid),
    Populated(GenreRef),
}

/// Movie as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub year: i32,
    pub release_date: NaiveDate,
    pub genre: GenreField,
    pub detail: String,
    pub cast: Vec<String>,
    pub streaming_link: Option<String>,
    pub reviews: Vec<Review>,
    pub num_reviews: u32,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovieResponse {
    fn build(movie: Movie, genre: GenreField) -> Self {
        Self {
            id: movie.id,
            reviews: movie.reviews().to_vec(),
            num_reviews: movie.num_reviews(),
            rating: movie.rating(),
            created_at: movie.created_at,
            updated_at: movie.updated_at,
            name: movie.details.name,
            image: movie.details.image,
            year: movie.details.year,
            release_date: movie.details.release_date,
            genre,
            detail: movie.details.detail,
            cast: movie.details.cast,
            streaming_link: movie.details.streaming_link,
        }
    }
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        let genre = GenreField::Id(movie.details.genre);
        Self::build(movie, genre)
    }
}

impl From<MovieWithGenre> for MovieResponse {
    fn from(found: MovieWithGenre) -> Self {
        let genre = match found.genre {
            Some(genre) => GenreField::Populated(genre.into()),
            None => GenreField::Id(found.movie.details.genre),
        };
        Self::build(found.movie, genre)
    }
}

pub(crate) fn movie_list(movies: Vec<Movie>) -> Json<Vec<MovieResponse>> {
    Json(movies.into_iter().map(MovieResponse::from).collect())
}

/// List every movie, optionally filtered
pub async fn list_movies(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<MovieFilter>,
) -> Result<Json<Vec<MovieResponse>>> {
    let movies = state.queries.list_all(&filter).await?;
    Ok(movie_list(movies))
}

/// Get a movie with its genre resolved
pub async fn get_movie(
    State(state): State<AppState>,
    AppPath(movie_id): AppPath<Uuid>,
) -> Result<Json<MovieResponse>> {
    let found = state.queries.get_by_id(movie_id).await?;
    Ok(Json(found.into()))
}

pub async fn newest_movies(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListingQuery>,
) -> Result<Json<Vec<MovieResponse>>> {
    Ok(movie_list(state.queries.newest(query.limit).await?))
}

pub async fn top_movies(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListingQuery>,
) -> Result<Json<Vec<MovieResponse>>> {
    Ok(movie_list(state.queries.top_rated(query.limit).await?))
}

pub async fn random_movies(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListingQuery>,
) -> Result<Json<Vec<MovieResponse>>> {
    Ok(movie_list(state.queries.random(query.limit).await?))
}

/// Release report, admin only
pub async fn release_report(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ReleaseMonthGroup>>> {
    auth.require_admin()?;
    Ok(Json(state.queries.report().await?))
}

/// Create a movie
pub async fn create_movie(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(input): AppJson<NewMovie>,
) -> Result<(StatusCode, Json<MovieResponse>)> {
    auth.require_admin()?;

    let movie = state.catalog.create_movie(input).await?;

    tracing::info!(
        movie_id = %movie.id,
        admin_id = %auth.user_id,
        request_id = %auth.request_id,
        "Movie created via API"
    );

    Ok((StatusCode::CREATED, Json(movie.into())))
}

/// Update a movie's descriptive fields
pub async fn update_movie(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(movie_id): AppPath<Uuid>,
    AppJson(update): AppJson<MovieUpdate>,
) -> Result<Json<MovieResponse>> {
    auth.require_admin()?;

    let movie = state.catalog.update_movie(movie_id, update).await?;
    Ok(Json(movie.into()))
}

/// Delete a movie
pub async fn delete_movie(
    State(state): State<AppState>,
    auth: AuthContext,
    AppPath(movie_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_admin()?;

    state.catalog.delete_movie(movie_id).await?;

    tracing::info!(
        movie_id = %movie_id,
        admin_id = %auth.user_id,
        "Movie deleted via API"
    );

    Ok(Json(MessageResponse::new("Movie deleted")))
}
