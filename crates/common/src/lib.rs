//! Cinelog Common Library
//!
//! Shared code for the Cinelog catalogue service including:
//! - Movie, review, genre and wishlist domain logic
//! - Catalogue store abstraction with PostgreSQL and in-memory backends
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use catalog::{CatalogStore, InMemoryCatalogStore};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
