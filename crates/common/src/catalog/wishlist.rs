//! Per-user wishlists

use crate::catalog::movie::Movie;
use crate::catalog::store::CatalogStore;
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Outcome of an idempotent wishlist change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

impl WishlistChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::AlreadyPresent => "already_present",
            Self::Removed => "removed",
            Self::NotPresent => "not_present",
        }
    }
}

#[derive(Clone)]
pub struct WishlistService {
    store: Arc<dyn CatalogStore>,
}

impl WishlistService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Add a movie to `user`'s wishlist. The movie must exist.
    #[instrument(skip(self))]
    pub async fn add(&self, user: Uuid, movie_id: Uuid) -> Result<WishlistChange> {
        if self.store.find_movie(movie_id).await?.is_none() {
            return Err(AppError::MovieNotFound { id: movie_id });
        }

        let change = if self.store.add_wishlist_entry(user, movie_id).await? {
            WishlistChange::Added
        } else {
            WishlistChange::AlreadyPresent
        };

        metrics::record_wishlist(change.as_str());
        info!(user_id = %user, movie_id = %movie_id, change = change.as_str(), "Wishlist updated");
        Ok(change)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user: Uuid, movie_id: Uuid) -> Result<WishlistChange> {
        let change = if self.store.remove_wishlist_entry(user, movie_id).await? {
            WishlistChange::Removed
        } else {
            WishlistChange::NotPresent
        };

        metrics::record_wishlist(change.as_str());
        info!(user_id = %user, movie_id = %movie_id, change = change.as_str(), "Wishlist updated");
        Ok(change)
    }

    /// Wishlisted movies, in the order they were added
    #[instrument(skip(self))]
    pub async fn list(&self, user: Uuid) -> Result<Vec<Movie>> {
        self.store.wishlist_movies(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::InMemoryCatalogStore;
    use crate::catalog::movie::tests::details;
    use chrono::{NaiveDate, Utc};

    async fn setup(names: &[&str]) -> (WishlistService, Vec<Uuid>) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let mut ids = Vec::new();
        for name in names {
            let movie = Movie::new(
                details(name, NaiveDate::from_ymd_opt(2021, 2, 3).unwrap()),
                Utc::now(),
            );
            store.insert_movie(&movie).await.unwrap();
            ids.push(movie.id);
        }
        (WishlistService::new(store), ids)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (service, ids) = setup(&["Memento"]).await;
        let user = Uuid::new_v4();

        assert_eq!(service.add(user, ids[0]).await.unwrap(), WishlistChange::Added);
        assert_eq!(
            service.add(user, ids[0]).await.unwrap(),
            WishlistChange::AlreadyPresent
        );
        assert_eq!(service.list(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (service, ids) = setup(&["Memento"]).await;
        let user = Uuid::new_v4();

        assert_eq!(
            service.remove(user, ids[0]).await.unwrap(),
            WishlistChange::NotPresent
        );
        service.add(user, ids[0]).await.unwrap();
        assert_eq!(service.remove(user, ids[0]).await.unwrap(), WishlistChange::Removed);
        assert_eq!(
            service.remove(user, ids[0]).await.unwrap(),
            WishlistChange::NotPresent
        );
        assert!(service.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_movie() {
        let (service, _) = setup(&[]).await;
        let user = Uuid::new_v4();
        let result = service.add(user, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::MovieNotFound { .. })));
        assert!(service.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order_per_user() {
        let (service, ids) = setup(&["First", "Second", "Third"]).await;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        service.add(alice, ids[2]).await.unwrap();
        service.add(alice, ids[0]).await.unwrap();
        service.add(bob, ids[1]).await.unwrap();

        let names: Vec<_> = service
            .list(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.details.name)
            .collect();
        assert_eq!(names, vec!["Third", "First"]);
        assert_eq!(service.list(bob).await.unwrap().len(), 1);
    }
}
