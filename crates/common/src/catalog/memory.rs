//! In-process catalogue store
//!
//! Backs `memory://` deployments and the test suites. One `RwLock` guards
//! all state, so each call is atomic with respect to every other call.

use crate::catalog::store::{group_by_release_month, CatalogStore, ReleaseMonthGroup};
use crate::catalog::{Genre, Movie, MovieFilter};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct State {
    /// Kept in creation order
    movies: Vec<Movie>,
    genres: Vec<Genre>,
    /// Per-user movie ids in the order they were added
    wishlists: HashMap<Uuid, Vec<Uuid>>,
}

impl State {
    fn movie(&self, id: Uuid) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }
}

/// Catalogue store held entirely in memory
#[derive(Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<State>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn take(movies: Vec<Movie>, limit: u64) -> Vec<Movie> {
    movies.into_iter().take(limit as usize).collect()
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_movie(&self, movie: &Movie) -> Result<()> {
        let mut state = self.state.write().await;
        if state.movie(movie.id).is_some() {
            return Err(AppError::Duplicate {
                message: format!("movie {} already exists", movie.id),
            });
        }
        state.movies.push(movie.clone());
        Ok(())
    }

    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>> {
        Ok(self.state.read().await.movie(id).cloned())
    }

    async fn list_movies(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        let state = self.state.read().await;
        Ok(state
            .movies
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn newest_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let state = self.state.read().await;
        let mut movies: Vec<Movie> = state.movies.iter().rev().cloned().collect();
        movies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(take(movies, limit))
    }

    async fn top_rated_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let state = self.state.read().await;
        let mut movies = state.movies.clone();
        movies.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
        Ok(take(movies, limit))
    }

    async fn random_movies(&self, limit: u64) -> Result<Vec<Movie>> {
        let state = self.state.read().await;
        let sample = {
            let mut rng = rand::thread_rng();
            state
                .movies
                .choose_multiple(&mut rng, limit as usize)
                .cloned()
                .collect()
        };
        Ok(sample)
    }

    async fn replace_movie(&self, movie: Movie) -> Result<Movie> {
        let mut state = self.state.write().await;
        let slot = state
            .movies
            .iter_mut()
            .find(|m| m.id == movie.id)
            .ok_or(AppError::MovieNotFound { id: movie.id })?;

        if slot.version() != movie.version() {
            debug!(
                movie_id = %movie.id,
                stored = slot.version(),
                read = movie.version(),
                "Stale movie write rejected"
            );
            return Err(AppError::WriteConflict { id: movie.id });
        }

        let next = movie.version() + 1;
        *slot = movie.with_version(next);
        Ok(slot.clone())
    }

    async fn delete_movie(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.movies.len();
        state.movies.retain(|m| m.id != id);
        let removed = state.movies.len() != before;

        if removed {
            for entries in state.wishlists.values_mut() {
                entries.retain(|movie| *movie != id);
            }
        }
        Ok(removed)
    }

    async fn count_movies_in_genre(&self, genre: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.movies.iter().filter(|m| m.details.genre == genre).count() as u64)
    }

    async fn release_report(&self) -> Result<Vec<ReleaseMonthGroup>> {
        let state = self.state.read().await;
        Ok(group_by_release_month(&state.movies))
    }

    async fn insert_genre(&self, genre: &Genre) -> Result<()> {
        let mut state = self.state.write().await;
        if state.genres.iter().any(|g| g.same_name(&genre.name)) {
            return Err(AppError::Duplicate {
                message: format!("genre '{}' already exists", genre.name),
            });
        }
        state.genres.push(genre.clone());
        Ok(())
    }

    async fn find_genre(&self, id: Uuid) -> Result<Option<Genre>> {
        let state = self.state.read().await;
        Ok(state.genres.iter().find(|g| g.id == id).cloned())
    }

    async fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let state = self.state.read().await;
        Ok(state.genres.iter().find(|g| g.same_name(name)).cloned())
    }

    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let state = self.state.read().await;
        let mut genres = state.genres.clone();
        genres.sort_by_key(|g| g.name.to_lowercase());
        Ok(genres)
    }

    /// Refuses while any movie still points at the genre
    async fn delete_genre(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let movies = state.movies.iter().filter(|m| m.details.genre == id).count() as u64;
        if movies > 0 {
            return Err(AppError::GenreInUse { id, movies });
        }
        let before = state.genres.len();
        state.genres.retain(|g| g.id != id);
        Ok(state.genres.len() != before)
    }

    async fn add_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let entries = state.wishlists.entry(user).or_default();
        if entries.contains(&movie) {
            return Ok(false);
        }
        entries.push(movie);
        Ok(true)
    }

    async fn remove_wishlist_entry(&self, user: Uuid, movie: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(entries) = state.wishlists.get_mut(&user) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|m| *m != movie);
        Ok(entries.len() != before)
    }

    async fn wishlist_movies(&self, user: Uuid) -> Result<Vec<Movie>> {
        let state = self.state.read().await;
        let ids = state.wishlists.get(&user).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| state.movie(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::movie::tests::{details, viewer};
    use crate::catalog::Rating;
    use chrono::{Duration, NaiveDate, Utc};

    fn movie(name: &str) -> Movie {
        Movie::new(
            details(name, NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()),
            Utc::now(),
        )
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let store = InMemoryCatalogStore::new();
        tokio_test::block_on(async {
            store.ping().await.unwrap();
            assert!(store.list_genres().await.unwrap().is_empty());
            assert!(store.release_report().await.unwrap().is_empty());
            assert!(store.wishlist_movies(Uuid::new_v4()).await.unwrap().is_empty());
        });
    }

    #[tokio::test]
    async fn test_versioned_write_rejects_stale_copy() {
        let store = InMemoryCatalogStore::new();
        let original = movie("Alien");
        store.insert_movie(&original).await.unwrap();

        let first = store.find_movie(original.id).await.unwrap().unwrap();
        let stale = first.clone();

        let saved = store.replace_movie(first).await.unwrap();
        assert_eq!(saved.version(), 1);

        let result = store.replace_movie(stale).await;
        assert!(matches!(result, Err(AppError::WriteConflict { .. })));
    }

    #[tokio::test]
    async fn test_replace_missing_movie() {
        let store = InMemoryCatalogStore::new();
        let result = store.replace_movie(movie("Ghost")).await;
        assert!(matches!(result, Err(AppError::MovieNotFound { .. })));
    }

    #[tokio::test]
    async fn test_newest_and_top_rated_ordering() {
        let store = InMemoryCatalogStore::new();
        let now = Utc::now();

        let mut old = movie("Old");
        old.created_at = now - Duration::days(3);
        let mut mid = movie("Mid");
        mid.created_at = now - Duration::days(2);
        let mut new = movie("New");
        new.created_at = now - Duration::days(1);

        old.add_review(&viewer("a"), Rating::new(5).unwrap(), "x".into(), now).unwrap();
        mid.add_review(&viewer("b"), Rating::new(2).unwrap(), "x".into(), now).unwrap();

        for m in [&old, &mid, &new] {
            store.insert_movie(m).await.unwrap();
        }

        let newest: Vec<_> = store
            .newest_movies(2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.details.name)
            .collect();
        assert_eq!(newest, vec!["New", "Mid"]);

        let top: Vec<_> = store
            .top_rated_movies(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.details.name)
            .collect();
        assert_eq!(top, vec!["Old", "Mid", "New"]);
    }

    #[tokio::test]
    async fn test_random_sample_is_bounded() {
        let store = InMemoryCatalogStore::new();
        for i in 0..4 {
            store.insert_movie(&movie(&format!("M{i}"))).await.unwrap();
        }
        assert_eq!(store.random_movies(10).await.unwrap().len(), 4);
        assert_eq!(store.random_movies(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_movie_clears_wishlists() {
        let store = InMemoryCatalogStore::new();
        let m = movie("Dune");
        store.insert_movie(&m).await.unwrap();

        let user = Uuid::new_v4();
        assert!(store.add_wishlist_entry(user, m.id).await.unwrap());
        assert!(store.delete_movie(m.id).await.unwrap());
        assert!(store.wishlist_movies(user).await.unwrap().is_empty());
        assert!(!store.remove_wishlist_entry(user, m.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_genre_names_unique_case_insensitive() {
        let store = InMemoryCatalogStore::new();
        store.insert_genre(&Genre::new("Drama".into(), Utc::now())).await.unwrap();
        let dup = store.insert_genre(&Genre::new("drama".into(), Utc::now())).await;
        assert!(matches!(dup, Err(AppError::Duplicate { .. })));
        assert!(store.find_genre_by_name("DRAMA").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_genre_refuses_referenced_genre() {
        let store = InMemoryCatalogStore::new();
        let genre = Genre::new("Horror".into(), Utc::now());
        store.insert_genre(&genre).await.unwrap();

        let mut film = movie("The Thing");
        film.details.genre = genre.id;
        store.insert_movie(&film).await.unwrap();

        let refused = store.delete_genre(genre.id).await;
        assert!(matches!(refused, Err(AppError::GenreInUse { movies: 1, .. })));
        assert!(store.find_genre(genre.id).await.unwrap().is_some());

        store.delete_movie(film.id).await.unwrap();
        assert!(store.delete_genre(genre.id).await.unwrap());
    }
}
