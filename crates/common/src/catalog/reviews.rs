//! Review submission and moderation

use crate::catalog::input::ReviewSubmission;
use crate::catalog::movie::{Review, Reviewer};
use crate::catalog::store::CatalogStore;
use crate::catalog::versioned::retry_versioned;
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// A review together with the movie it belongs to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListing {
    pub movie_id: Uuid,
    pub movie_name: String,
    #[serde(flatten)]
    pub review: Review,
}

/// Adds and removes reviews on movies
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn CatalogStore>,
    retry_budget: Duration,
}

impl ReviewService {
    pub fn new(store: Arc<dyn CatalogStore>, retry_budget: Duration) -> Self {
        Self { store, retry_budget }
    }

    /// Add `reviewer`'s review to a movie.
    ///
    /// Checks run in a fixed order: admin, input, movie existence,
    /// duplicate. Nothing is written unless all of them pass.
    #[instrument(skip(self, reviewer, submission), fields(user_id = %reviewer.user_id))]
    pub async fn submit(
        &self,
        movie_id: Uuid,
        reviewer: &Reviewer,
        submission: ReviewSubmission,
    ) -> Result<Review> {
        reviewer.ensure_may_review()?;
        let (rating, comment) = submission.into_parts()?;

        let review = retry_versioned("submit_review", self.retry_budget, || {
            let comment = comment.clone();
            async move {
                let mut movie = self
                    .store
                    .find_movie(movie_id)
                    .await?
                    .ok_or(AppError::MovieNotFound { id: movie_id })?;

                let review = movie.add_review(reviewer, rating, comment, Utc::now())?.clone();
                self.store.replace_movie(movie).await?;
                Ok(review)
            }
        })
        .await?;

        metrics::record_review("submitted", rating.value());
        info!(
            movie_id = %movie_id,
            review_id = %review.id,
            user_id = %reviewer.user_id,
            rating = rating.value(),
            "Review added"
        );
        Ok(review)
    }

    /// Remove a review from a movie (moderation)
    #[instrument(skip(self))]
    pub async fn delete(&self, movie_id: Uuid, review_id: Uuid) -> Result<Review> {
        let removed = retry_versioned("delete_review", self.retry_budget, || async move {
            let mut movie = self
                .store
                .find_movie(movie_id)
                .await?
                .ok_or(AppError::MovieNotFound { id: movie_id })?;

            let removed = movie.remove_review(review_id, Utc::now())?;
            self.store.replace_movie(movie).await?;
            Ok(removed)
        })
        .await?;

        metrics::record_review("deleted", removed.rating.value());
        info!(
            movie_id = %movie_id,
            review_id = %review_id,
            "Review deleted"
        );
        Ok(removed)
    }

    /// Every review in the catalogue, newest first
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<ReviewListing>> {
        let movies = self.store.list_movies(&Default::default()).await?;

        let mut listings: Vec<ReviewListing> = movies
            .iter()
            .flat_map(|movie| {
                movie.reviews().iter().map(|review| ReviewListing {
                    movie_id: movie.id,
                    movie_name: movie.details.name.clone(),
                    review: review.clone(),
                })
            })
            .collect();

        listings.sort_by(|a, b| newest_first(a.review.created_at, b.review.created_at));
        Ok(listings)
    }
}

fn newest_first(a: DateTime<Utc>, b: DateTime<Utc>) -> std::cmp::Ordering {
    b.cmp(&a)
}
