//! Admin management of movies and genres

use crate::catalog::genre::Genre;
use crate::catalog::input::{MovieUpdate, NewGenre, NewMovie};
use crate::catalog::movie::Movie;
use crate::catalog::store::CatalogStore;
use crate::catalog::versioned::retry_versioned;
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    retry_budget: Duration,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, retry_budget: Duration) -> Self {
        Self { store, retry_budget }
    }

    async fn ensure_genre(&self, genre: Uuid) -> Result<()> {
        match self.store.find_genre(genre).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Validation {
                message: format!("genre {} does not exist", genre),
                field: Some("genre".to_string()),
            }),
        }
    }

    // ========================================================================
    // Movies
    // ========================================================================

    #[instrument(skip(self, input))]
    pub async fn create_movie(&self, input: NewMovie) -> Result<Movie> {
        let details = input.into_details()?;
        self.ensure_genre(details.genre).await?;

        let movie = Movie::new(details, Utc::now());
        self.store.insert_movie(&movie).await?;

        metrics::record_movie_change("created");
        info!(movie_id = %movie.id, name = %movie.details.name, "Movie created");
        Ok(movie)
    }

    /// Merge `update` into a movie's descriptive fields. Reviews and
    /// their derived values are carried over untouched.
    #[instrument(skip(self, update))]
    pub async fn update_movie(&self, id: Uuid, update: MovieUpdate) -> Result<Movie> {
        if let Some(genre) = update.genre {
            self.ensure_genre(genre).await?;
        }

        let movie = retry_versioned("update_movie", self.retry_budget, || {
            let update = update.clone();
            async move {
                let mut movie = self
                    .store
                    .find_movie(id)
                    .await?
                    .ok_or(AppError::MovieNotFound { id })?;

                update.apply(&mut movie.details)?;
                movie.updated_at = Utc::now();
                self.store.replace_movie(movie).await
            }
        })
        .await?;

        metrics::record_movie_change("updated");
        info!(movie_id = %id, version = movie.version(), "Movie updated");
        Ok(movie)
    }

    /// Delete a movie together with its reviews and wishlist entries
    #[instrument(skip(self))]
    pub async fn delete_movie(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_movie(id).await? {
            return Err(AppError::MovieNotFound { id });
        }

        metrics::record_movie_change("deleted");
        info!(movie_id = %id, "Movie deleted");
        Ok(())
    }

    // ========================================================================
    // Genres
    // ========================================================================

    #[instrument(skip(self, input))]
    pub async fn create_genre(&self, input: NewGenre) -> Result<Genre> {
        let name = input.into_name()?;
        if self.store.find_genre_by_name(&name).await?.is_some() {
            return Err(AppError::Duplicate {
                message: format!("genre '{}' already exists", name),
            });
        }

        let genre = Genre::new(name, Utc::now());
        self.store.insert_genre(&genre).await?;
        info!(genre_id = %genre.id, name = %genre.name, "Genre created");
        Ok(genre)
    }

    pub async fn list_genres(&self) -> Result<Vec<Genre>> {
        self.store.list_genres().await
    }

    /// Delete a genre no movie refers to
    #[instrument(skip(self))]
    pub async fn delete_genre(&self, id: Uuid) -> Result<()> {
        if self.store.find_genre(id).await?.is_none() {
            return Err(AppError::GenreNotFound { id });
        }

        let movies = self.store.count_movies_in_genre(id).await?;
        if movies > 0 {
            return Err(AppError::GenreInUse { id, movies });
        }

        if !self.store.delete_genre(id).await? {
            return Err(AppError::GenreNotFound { id });
        }
        info!(genre_id = %id, "Genre deleted");
        Ok(())
    }
}
