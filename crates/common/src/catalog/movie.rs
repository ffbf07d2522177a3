//! Movie aggregate root and its embedded reviews
//!
//! A `Movie` owns its reviews. The review list and the two values derived
//! from it (`num_reviews`, `rating`) are private: the only way to change
//! them is `add_review` / `remove_review`, and both recompute the derived
//! values before returning.

use crate::errors::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A star rating in `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a raw rating. Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AppError::InvalidRating { value })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

/// One user's review, embedded in a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,

    /// Username at the time the review was written
    pub name: String,

    pub rating: Rating,

    pub comment: String,

    /// Author
    pub user: Uuid,

    pub created_at: DateTime<Utc>,
}

/// The authenticated user acting on a movie's reviews
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl Reviewer {
    /// Admins moderate reviews but may not author them
    pub fn ensure_may_review(&self) -> Result<()> {
        if self.is_admin {
            Err(AppError::AdminReview)
        } else {
            Ok(())
        }
    }
}

/// Descriptive, client-editable movie fields
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub name: String,
    pub detail: String,
    pub release_date: NaiveDate,
    pub year: i32,
    pub genre: Uuid,
    pub cast: Vec<String>,
    pub image: Option<String>,
    pub streaming_link: Option<String>,
}

/// Catalogue aggregate root
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: Uuid,
    pub details: MovieDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    reviews: Vec<Review>,
    num_reviews: u32,
    rating: f64,
    version: i32,
}

impl Movie {
    /// A freshly created movie with no reviews
    pub fn new(details: MovieDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            details,
            created_at: now,
            updated_at: now,
            reviews: Vec::new(),
            num_reviews: 0,
            rating: 0.0,
            version: 0,
        }
    }

    /// Rebuild a movie read back from a store.
    ///
    /// Derived values are recomputed from `reviews` rather than trusted.
    pub fn restore(
        id: Uuid,
        details: MovieDetails,
        reviews: Vec<Review>,
        version: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut movie = Self {
            id,
            details,
            created_at,
            updated_at,
            reviews,
            num_reviews: 0,
            rating: 0.0,
            version,
        };
        movie.recompute();
        movie
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }

    /// Mean review rating, 0 when there are no reviews
    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Store revision this copy was read at
    pub fn version(&self) -> i32 {
        self.version
    }

    pub(crate) fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn review_by(&self, user: Uuid) -> Option<&Review> {
        self.reviews.iter().find(|r| r.user == user)
    }

    /// Append a review and refresh the derived values
    pub fn add_review(
        &mut self,
        reviewer: &Reviewer,
        rating: Rating,
        comment: String,
        now: DateTime<Utc>,
    ) -> Result<&Review> {
        reviewer.ensure_may_review()?;

        if self.review_by(reviewer.user_id).is_some() {
            return Err(AppError::AlreadyReviewed { movie_id: self.id });
        }

        self.reviews.push(Review {
            id: Uuid::new_v4(),
            name: reviewer.username.clone(),
            rating,
            comment,
            user: reviewer.user_id,
            created_at: now,
        });
        self.updated_at = now;
        self.recompute();

        let last = self.reviews.len() - 1;
        Ok(&self.reviews[last])
    }

    /// Remove a review and refresh the derived values
    pub fn remove_review(&mut self, review_id: Uuid, now: DateTime<Utc>) -> Result<Review> {
        let index = self
            .reviews
            .iter()
            .position(|r| r.id == review_id)
            .ok_or(AppError::ReviewNotFound {
                movie_id: self.id,
                review_id,
            })?;

        let removed = self.reviews.remove(index);
        self.updated_at = now;
        self.recompute();
        Ok(removed)
    }

    fn recompute(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating.value())).sum();
            f64::from(total) / f64::from(self.num_reviews)
        };
    }
}
