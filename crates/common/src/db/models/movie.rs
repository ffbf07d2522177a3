//! Movie entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub detail: String,

    pub release_date: Date,

    pub year: i32,

    pub genre_id: Uuid,

    /// Cast member names as a JSONB array
    #[sea_orm(column_type = "JsonBinary")]
    pub cast: serde_json::Value,

    #[sea_orm(column_type = "Text", nullable)]
    pub image: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub streaming_link: Option<String>,

    /// Embedded reviews as a JSONB array
    #[sea_orm(column_type = "JsonBinary")]
    pub reviews: serde_json::Value,

    pub num_reviews: i32,

    #[sea_orm(column_type = "Double")]
    pub rating: f64,

    /// Bumped on every write
    pub version: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::genre::Entity",
        from = "Column::GenreId",
        to = "super::genre::Column::Id"
    )]
    Genre,

    #[sea_orm(has_many = "super::wishlist_entry::Entity", on_delete = "Cascade")]
    WishlistEntries,
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Genre.def()
    }
}

impl Related<super::wishlist_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WishlistEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
