//! Booking models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::BookingStatus;
use super::item::ItemResponse;
use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub item_id: String,
    pub renter_id: String,
    /// Inclusive calendar date, YYYY-MM-DD
    pub start_date: String,
    /// Inclusive calendar date, YYYY-MM-DD
    pub end_date: String,
    pub total_price: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    pub fn status(&self) -> Option<BookingStatus> {
        self.status.parse().ok()
    }
}

/// Booking denormalized with its item and renter, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithRelations {
    #[serde(flatten)]
    pub booking: Booking,
    pub item: ItemResponse,
    pub item_owner: UserSummary,
    pub renter: UserSummary,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub item_id: String,
    pub renter_id: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: String,
    /// Party performing the transition; must be the renter or the item owner
    pub user_id: String,
}

/// Query parameters accepted by the booking listing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub owner_id: Option<String>,
    pub renter_id: Option<String>,
    pub status: Option<String>,
}
