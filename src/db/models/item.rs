//! Rental item models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_images;
use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_per_day: f64,
    pub location: String,
    /// JSON array of image URL strings
    pub images: String,
    pub is_available: bool,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    pub fn image_urls(&self) -> Vec<String> {
        parse_images(&self.images)
    }
}

/// Item joined with its owner, as returned by list/get endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithOwner {
    #[serde(flatten)]
    pub item: ItemResponse,
    pub owner: UserSummary,
}

/// Response DTO with the image list deserialized
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_per_day: f64,
    pub location: String,
    pub images: Vec<String>,
    pub is_available: bool,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        let images = item.image_urls();
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            category: item.category,
            price_per_day: item.price_per_day,
            location: item.location,
            images,
            is_available: item.is_available,
            owner_id: item.owner_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_per_day: f64,
    pub location: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_per_day: Option<f64>,
    pub location: Option<String>,
    pub images: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

/// Query parameters accepted by the item listing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub owner_id: Option<String>,
}
