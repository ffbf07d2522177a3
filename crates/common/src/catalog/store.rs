//! Record store abstraction for the catalogue
//!
//! Implemented by the PostgreSQL `Repository` and by
//! `InMemoryCatalogStore`. Every movie, reviews included, is written as a
//! single record so readers never observe a half-applied review.

use crate::catalog::{Genre, Movie, MovieFilter};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Movie summary inside a report bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub genre: Uuid,
}

/// Movies released in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMonthGroup {
    pub year: i32,
    pub month: u32,
    pub count: u64,
    pub movies: Vec<ReportEntry>,
}

/// Group movies by release (year, month), ascending by year then month.
/// Movies keep their input order inside a bucket.
pub fn group_by_release_month<'a, I>(movies: I) -> Vec<ReleaseMonthGroup>
where
    I: IntoIterator<Item = &'a Movie>,
{
    group_releases(movies.into_iter().map(|movie| {
        (
            movie.details.release_date,
            ReportEntry {
                name: movie.details.name.clone(),
                genre: movie.details.genre,
            },
        )
    }))
}

/// Bucket pre-projected `(release_date, entry)` pairs
pub(crate) fn group_releases<I>(releases: I) -> Vec<ReleaseMonthGroup>
where
    I: IntoIterator<Item = (NaiveDate, ReportEntry)>,
{
    let mut buckets: BTreeMap<(i32, u32), Vec<ReportEntry>> = BTreeMap::new();

    for (date, entry) in releases {
        buckets
            .entry((date.year(), date.month()))
            .or_default()
            .push(entry);
    }

    buckets
        .into_iter()
        .map(|((year, month), movies)| ReleaseMonthGroup {
            year,
            month,
            count: movies.len() as u64,
            movies,
        })
        .collect()
}

/// Persistence port used by the catalogue services
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;

    // ------------------------------------------------------------------
    // Movies
    // ------------------------------------------------------------------

    async fn insert_movie(&self, movie: &Movie) -> Result<()>;

    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>>;

    /// Movies matching `filter`, oldest first
    async fn list_movies(&self, filter: &MovieFilter) -> Result<Vec<Movie>>;

    async fn newest_movies(&self, limit: u64) -> Result<Vec<Movie>>;

    async fn top_rated_movies(&self, limit: u64) -> Result<Vec<Movie>>;

    /// Uniform random sample of at most `limit` movies, in no particular order
    async fn random_movies(&self, limit: u64) -> Result<Vec<Movie>>;

    /// Versioned write of the whole movie.
    ///
    /// Succeeds only if the stored version still equals `movie.version()`,
    /// returning the movie at its new version. A stale version yields
    /// `WriteConflict`; a vanished movie yields `MovieNotFound`.
    async fn replace_movie(&self, movie: Movie) -> Result<Movie>;

    /// Delete a movie along with its wishlist entries. `false` if absent.
    async fn delete_movie(&self, id: Uuid) -> Result<bool>;

    async fn count_movies_in_genre(&self, genre: Uuid) -> Result<u64>;

    /// Movies bucketed by release month
    async fn release_report(&self) -> Result<Vec<ReleaseMonthGroup>>;

    // ------------------------------------------------------------------
    // Genres
    // ------------------------------------------------------------------

    async fn insert_genre(&self, genre: &Genre) -> Result<()>;

    async fn find_genre(&self, id: Uuid) -> Result<Option<Genre>>;

    /// Case-insensitive lookup
    async fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>>;

    /// All genres ordered by name
    async fn list_genres(&self) -> Result<Vec<Genre>>;

    async fn delete_genre(&self, id: Uuid) -> Result<bool>;

    // ------------------------------------------------------------------
    // Wishlists
    // ------------------------------------------------------------------

    /// `true` if the entry was new
    async fn add_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool>;

    /// `true` if an entry was removed
    async fn remove_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool>;

    /// Wishlisted movies in the order they were added
    async fn wishlist_movies(&self, user: Uuid) -> Result<Vec<Movie>>;
}
