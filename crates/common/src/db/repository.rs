//! PostgreSQL catalogue store
//!
//! One row per movie with its reviews embedded as JSONB, so a review
//! change is a single-row write. Writes are compare-and-swap on the
//! `version` column.

use crate::catalog::store::{group_releases, CatalogStore, ReleaseMonthGroup, ReportEntry};
use crate::catalog::{Genre, Movie, MovieDetails, MovieFilter, Review};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr,
};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

// ============================================================================
// Row conversions
// ============================================================================

impl TryFrom<MovieRow> for Movie {
    type Error = AppError;

    fn try_from(row: MovieRow) -> Result<Self> {
        let cast: Vec<String> = serde_json::from_value(row.cast)?;
        let reviews: Vec<Review> = serde_json::from_value(row.reviews)?;

        let details = MovieDetails {
            name: row.name,
            detail: row.detail,
            release_date: row.release_date,
            year: row.year,
            genre: row.genre_id,
            cast,
            image: row.image,
            streaming_link: row.streaming_link,
        };

        Ok(Movie::restore(
            row.id,
            details,
            reviews,
            row.version,
            row.created_at.with_timezone(&Utc),
            row.updated_at.with_timezone(&Utc),
        ))
    }
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Genre {
            id: row.id,
            name: row.name,
            created_at: row.created_at.with_timezone(&Utc),
        }
    }
}

fn movie_active_model(movie: &Movie) -> Result<MovieActiveModel> {
    let details = &movie.details;

    Ok(MovieActiveModel {
        id: Set(movie.id),
        name: Set(details.name.clone()),
        detail: Set(details.detail.clone()),
        release_date: Set(details.release_date),
        year: Set(details.year),
        genre_id: Set(details.genre),
        cast: Set(serde_json::to_value(&details.cast)?),
        image: Set(details.image.clone()),
        streaming_link: Set(details.streaming_link.clone()),
        reviews: Set(serde_json::to_value(movie.reviews())?),
        num_reviews: Set(movie.num_reviews() as i32),
        rating: Set(movie.rating()),
        version: Set(movie.version()),
        created_at: Set(movie.created_at.into()),
        updated_at: Set(movie.updated_at.into()),
    })
}

fn into_movies(rows: Vec<MovieRow>) -> Result<Vec<Movie>> {
    rows.into_iter().map(Movie::try_from).collect()
}

/// Escape LIKE metacharacters so the term matches literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on the movie name
fn name_contains(term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(MovieColumn::Name)))
        .like(LikeExpr::new(like_pattern(term)).escape('\\'))
}

/// Map a constraint violation to a domain error, anything else stays a database error
fn violation_error(
    violation: Option<SqlErr>,
    err: DbErr,
    on_unique: impl FnOnce() -> AppError,
    on_foreign_key: impl FnOnce() -> AppError,
) -> AppError {
    match violation {
        Some(SqlErr::UniqueConstraintViolation(_)) => on_unique(),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => on_foreign_key(),
        _ => err.into(),
    }
}

fn write_error(
    err: DbErr,
    on_unique: impl FnOnce() -> AppError,
    on_foreign_key: impl FnOnce() -> AppError,
) -> AppError {
    violation_error(err.sql_err(), err, on_unique, on_foreign_key)
}

/// The movie's genre vanished between validation and the write
fn missing_genre(genre: Uuid) -> AppError {
    AppError::Validation {
        message: format!("genre {} does not exist", genre),
        field: Some("genre".to_string()),
    }
}

#[async_trait]
impl CatalogStore for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Movie Operations
    // ========================================================================

    async fn insert_movie(&self, movie: &Movie) -> Result<()> {
        MovieEntity::insert(movie_active_model(movie)?)
            .exec(self.write_conn())
            .await
            .map_err(|err| {
                write_error(
                    err,
                    || AppError::Duplicate {
                        message: format!("movie {} already exists", movie.id),
                    },
                    || missing_genre(movie.details.genre),
                )
            })?;
        Ok(())
    }

    /// Reads the primary: the result usually feeds a versioned write
    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>> {
        MovieEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn list_movies(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        let mut query = MovieEntity::find();

        if let Some(term) = filter.search_term() {
            query = query.filter(name_contains(&term));
        }
        if let Some(genre) = filter.genre {
            query = query.filter(MovieColumn::GenreId.eq(genre));
        }
        if let Some(year) = filter.year {
            query = query.filter(MovieColumn::Year.eq(year));
        }

        let rows = query
            .order_by_asc(MovieColumn::CreatedAt)
            .all(self.read_conn())
            .await?;
        into_movies(rows)
    }

    async fn newest_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = MovieEntity::find()
            .order_by_desc(MovieColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await?;
        into_movies(rows)
    }

    async fn top_rated_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = MovieEntity::find()
            .order_by_desc(MovieColumn::Rating)
            .order_by_asc(MovieColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await?;
        into_movies(rows)
    }

    async fn random_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = MovieEntity::find()
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(limit)
            .all(self.read_conn())
            .await?;
        into_movies(rows)
    }

    async fn replace_movie(&self, movie: Movie) -> Result<Movie> {
        let read_version = movie.version();
        let next = read_version + 1;

        let mut active = movie_active_model(&movie)?;
        active.id = NotSet;
        active.created_at = NotSet;
        active.version = Set(next);

        let result = MovieEntity::update_many()
            .set(active)
            .filter(MovieColumn::Id.eq(movie.id))
            .filter(MovieColumn::Version.eq(read_version))
            .exec(self.write_conn())
            .await
            .map_err(|err| {
                write_error(
                    err,
                    || AppError::Duplicate {
                        message: format!("movie {} already exists", movie.id),
                    },
                    || missing_genre(movie.details.genre),
                )
            })?;

        if result.rows_affected == 0 {
            let exists = MovieEntity::find_by_id(movie.id)
                .one(self.write_conn())
                .await?
                .is_some();

            debug!(movie_id = %movie.id, read = read_version, exists, "Versioned write matched no row");
            return Err(if exists {
                AppError::WriteConflict { id: movie.id }
            } else {
                AppError::MovieNotFound { id: movie.id }
            });
        }

        Ok(movie.with_version(next))
    }

    /// Wishlist rows go with the movie through `ON DELETE CASCADE`
    async fn delete_movie(&self, id: Uuid) -> Result<bool> {
        let result = MovieEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn count_movies_in_genre(&self, genre: Uuid) -> Result<u64> {
        MovieEntity::find()
            .filter(MovieColumn::GenreId.eq(genre))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn release_report(&self) -> Result<Vec<ReleaseMonthGroup>> {
        let rows: Vec<(NaiveDate, String, Uuid)> = MovieEntity::find()
            .select_only()
            .column(MovieColumn::ReleaseDate)
            .column(MovieColumn::Name)
            .column(MovieColumn::GenreId)
            .order_by_asc(MovieColumn::CreatedAt)
            .into_tuple()
            .all(self.read_conn())
            .await?;

        Ok(group_releases(
            rows.into_iter()
                .map(|(date, name, genre)| (date, ReportEntry { name, genre })),
        ))
    }

    // ========================================================================
    // Genre Operations
    // ========================================================================

    async fn insert_genre(&self, genre: &Genre) -> Result<()> {
        let active = GenreActiveModel {
            id: Set(genre.id),
            name: Set(genre.name.clone()),
            created_at: Set(genre.created_at.into()),
        };

        GenreEntity::insert(active)
            .exec(self.write_conn())
            .await
            .map_err(|err| {
                write_error(
                    err,
                    || AppError::Duplicate {
                        message: format!("genre '{}' already exists", genre.name),
                    },
                    || AppError::Internal {
                        message: format!("genre {} insert hit a foreign key", genre.id),
                    },
                )
            })?;
        Ok(())
    }

    async fn find_genre(&self, id: Uuid) -> Result<Option<Genre>> {
        let row = GenreEntity::find_by_id(id).one(self.read_conn()).await?;
        Ok(row.map(Genre::from))
    }

    async fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let row = GenreEntity::find()
            .filter(Expr::expr(Func::lower(Expr::col(GenreColumn::Name))).eq(name.trim().to_lowercase()))
            .one(self.read_conn())
            .await?;
        Ok(row.map(Genre::from))
    }

    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let rows = GenreEntity::find()
            .order_by_asc(GenreColumn::Name)
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }

    /// `ON DELETE RESTRICT` guards movies created after the caller counted
    async fn delete_genre(&self, id: Uuid) -> Result<bool> {
        let result = GenreEntity::delete_by_id(id).exec(self.write_conn()).await;

        match result {
            Ok(result) => Ok(result.rows_affected > 0),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                let movies = self.count_movies_in_genre(id).await?;
                debug!(genre_id = %id, movies, "Genre delete blocked by referencing movies");
                Err(AppError::GenreInUse { id, movies })
            }
            Err(err) => Err(err.into()),
        }
    }

    // ========================================================================
    // Wishlist Operations
    // ========================================================================

    async fn add_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool> {
        let entry = WishlistEntryActiveModel {
            id: NotSet,
            user_id: Set(user),
            movie_id: Set(movie),
            created_at: Set(Utc::now().into()),
        };

        let inserted = WishlistEntryEntity::insert(entry)
            .on_conflict(
                OnConflict::columns([WishlistEntryColumn::UserId, WishlistEntryColumn::MovieId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.write_conn())
            .await?;

        Ok(inserted > 0)
    }

    async fn remove_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool> {
        let result = WishlistEntryEntity::delete_many()
            .filter(WishlistEntryColumn::UserId.eq(user))
            .filter(WishlistEntryColumn::MovieId.eq(movie))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn wishlist_movies(&self, user: Uuid) -> Result<Vec<Movie>> {
        let entries = WishlistEntryEntity::find()
            .filter(WishlistEntryColumn::UserId.eq(user))
            .order_by_asc(WishlistEntryColumn::Id)
            .all(self.read_conn())
            .await?;

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = entries.iter().map(|e| e.movie_id).collect();
        let mut by_id: HashMap<Uuid, MovieRow> = MovieEntity::find()
            .filter(MovieColumn::Id.is_in(ids.clone()))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        ids.into_iter()
            .filter_map(|id| by_id.remove(&id))
            .map(Movie::try_from)
            .collect()
    }
}
