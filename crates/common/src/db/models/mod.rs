//! SeaORM entity models
//!
//! Database entities for the Cinelog catalogue

mod genre;
mod movie;
mod wishlist_entry;

pub use movie::{
    Entity as MovieEntity,
    Model as MovieRow,
    ActiveModel as MovieActiveModel,
    Column as MovieColumn,
};

pub use genre::{
    Entity as GenreEntity,
    Model as GenreRow,
    ActiveModel as GenreActiveModel,
    Column as GenreColumn,
};

pub use wishlist_entry::{
    Entity as WishlistEntryEntity,
    Model as WishlistEntryRow,
    ActiveModel as WishlistEntryActiveModel,
    Column as WishlistEntryColumn,
};
