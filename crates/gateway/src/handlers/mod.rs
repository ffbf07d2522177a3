//! API handlers module

use serde::Serialize;

pub mod genres;
pub mod health;
pub mod movies;
pub mod reviews;
pub mod wishlist;

/// Plain confirmation body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
