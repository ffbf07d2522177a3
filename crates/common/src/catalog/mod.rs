//! Movie catalogue domain
//!
//! Movies own their reviews. Every change to a movie is a versioned
//! whole-record write through a [`CatalogStore`], retried when another
//! writer got there first.

pub mod genre;
pub mod input;
pub mod lifecycle;
pub mod memory;
pub mod movie;
pub mod queries;
pub mod reviews;
pub mod store;
mod versioned;
pub mod wishlist;

pub use genre::Genre;
pub use input::{ListingQuery, MovieFilter, MovieUpdate, NewGenre, NewMovie, ReviewSubmission};
pub use lifecycle::CatalogService;
pub use memory::InMemoryCatalogStore;
pub use movie::{Movie, MovieDetails, Rating, Review, Reviewer};
pub use queries::{MovieWithGenre, QueryService};
pub use reviews::{ReviewListing, ReviewService};
pub use store::{group_by_release_month, CatalogStore, ReleaseMonthGroup, ReportEntry};
pub use wishlist::{WishlistChange, WishlistService};
