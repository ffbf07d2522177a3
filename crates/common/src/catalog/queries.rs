//! Read-only catalogue queries

use crate::catalog::genre::Genre;
use crate::catalog::input::MovieFilter;
use crate::catalog::movie::Movie;
use crate::catalog::store::{CatalogStore, ReleaseMonthGroup};
use crate::config::CatalogConfig;
use crate::errors::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A movie with its genre reference resolved
#[derive(Debug, Clone)]
pub struct MovieWithGenre {
    pub movie: Movie,
    /// `None` if the genre was deleted out from under the movie
    pub genre: Option<Genre>,
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn CatalogStore>,
    default_limit: u64,
    max_limit: u64,
}

impl QueryService {
    pub fn new(store: Arc<dyn CatalogStore>, config: &CatalogConfig) -> Self {
        Self {
            store,
            default_limit: config.default_page_size,
            max_limit: config.max_page_size,
        }
    }

    /// Apply the default and the upper bound to a requested listing size
    pub fn resolve_limit(&self, requested: Option<u64>) -> Result<u64> {
        match requested {
            Some(0) => Err(AppError::Validation {
                message: "limit must be at least 1".to_string(),
                field: Some("limit".to_string()),
            }),
            Some(n) => Ok(n.min(self.max_limit)),
            None => Ok(self.default_limit.min(self.max_limit)),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        let movies = self.store.list_movies(filter).await?;
        debug!(count = movies.len(), "Listed movies");
        Ok(movies)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<MovieWithGenre> {
        let movie = self
            .store
            .find_movie(id)
            .await?
            .ok_or(AppError::MovieNotFound { id })?;
        let genre = self.store.find_genre(movie.details.genre).await?;
        Ok(MovieWithGenre { movie, genre })
    }

    #[instrument(skip(self))]
    pub async fn newest(&self, limit: Option<u64>) -> Result<Vec<Movie>> {
        let limit = self.resolve_limit(limit)?;
        self.store.newest_movies(limit).await
    }

    #[instrument(skip(self))]
    pub async fn top_rated(&self, limit: Option<u64>) -> Result<Vec<Movie>> {
        let limit = self.resolve_limit(limit)?;
        self.store.top_rated_movies(limit).await
    }

    #[instrument(skip(self))]
    pub async fn random(&self, limit: Option<u64>) -> Result<Vec<Movie>> {
        let limit = self.resolve_limit(limit)?;
        self.store.random_movies(limit).await
    }

    /// Movies grouped by release month, oldest month first
    #[instrument(skip(self))]
    pub async fn report(&self) -> Result<Vec<ReleaseMonthGroup>> {
        self.store.release_report().await
    }
}
