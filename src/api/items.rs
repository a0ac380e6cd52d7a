//! Listing CRUD: browse/search, detail, create, update.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ApiError, Json, ValidationErrorBuilder};
use super::validation::{validate_images, validate_price, validate_text, validate_uuid};
use crate::db::{
    serialize_images, CreateItemRequest, Item, ItemFilter, ItemResponse, ItemWithOwner,
    UpdateItemRequest, User, UserSummary,
};
use crate::AppState;

#[derive(FromRow)]
struct ItemOwnerRow {
    #[sqlx(flatten)]
    item: Item,
    owner_name: String,
    owner_email: String,
    owner_image: Option<String>,
}

impl From<ItemOwnerRow> for ItemWithOwner {
    fn from(row: ItemOwnerRow) -> Self {
        let owner = UserSummary {
            id: row.item.owner_id.clone(),
            name: row.owner_name,
            email: row.owner_email,
            image: row.owner_image,
        };
        Self {
            item: row.item.into(),
            owner,
        }
    }
}

fn validate_create_request(req: &CreateItemRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_text(&req.title, "title", 120) {
        errors.add("title", e);
    }
    if let Err(e) = validate_text(&req.description, "description", 5000) {
        errors.add("description", e);
    }
    if let Err(e) = validate_text(&req.category, "category", 60) {
        errors.add("category", e);
    }
    if let Err(e) = validate_text(&req.location, "location", 120) {
        errors.add("location", e);
    }
    if let Err(e) = validate_price(req.price_per_day) {
        errors.add("price_per_day", e);
    }
    if let Err(e) = validate_images(&req.images) {
        errors.add("images", e);
    }
    if let Err(e) = validate_uuid(&req.owner_id, "owner_id") {
        errors.add("owner_id", e);
    }

    errors.finish()
}

/// GET /api/items
///
/// Supports category, full-text search over title/description, price bounds,
/// and owner filtering. Unavailable items are hidden unless the caller is
/// browsing a specific owner's inventory.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<ItemWithOwner>>, ApiError> {
    let mut query = QueryBuilder::new(
        "SELECT i.*, o.name AS owner_name, o.email AS owner_email, o.image AS owner_image \
         FROM items i JOIN users o ON o.id = i.owner_id WHERE 1 = 1",
    );

    if let Some(owner_id) = &filter.owner_id {
        query.push(" AND i.owner_id = ").push_bind(owner_id);
    } else {
        query.push(" AND i.is_available = 1");
    }

    if let Some(category) = &filter.category {
        query
            .push(" AND i.category LIKE ")
            .push_bind(format!("%{}%", category));
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (i.title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.description LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(min_price) = filter.min_price {
        query.push(" AND i.price_per_day >= ").push_bind(min_price);
    }

    if let Some(max_price) = filter.max_price {
        query.push(" AND i.price_per_day <= ").push_bind(max_price);
    }

    query.push(" ORDER BY i.created_at DESC");

    let rows: Vec<ItemOwnerRow> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Date range already reserved on an item, for the client's calendar
#[derive(Debug, Serialize, FromRow)]
pub struct BookedRange {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ItemDetailResponse {
    #[serde(flatten)]
    pub item: ItemResponse,
    pub owner: UserSummary,
    /// Blocking bookings only; CANCELLED and COMPLETED ranges are free again
    pub booked_ranges: Vec<BookedRange>,
}

/// GET /api/items/:id
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "item_id") {
        return Err(ApiError::validation_field("item_id", e));
    }

    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    let owner = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&item.owner_id)
        .fetch_one(&state.db)
        .await?;

    let booked_ranges = sqlx::query_as::<_, BookedRange>(
        "SELECT id, start_date, end_date, status FROM bookings \
         WHERE item_id = ? AND status IN ('PENDING', 'CONFIRMED') ORDER BY start_date",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ItemDetailResponse {
        item: item.into(),
        owner: owner.into(),
        booked_ranges,
    }))
}

/// POST /api/items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    validate_create_request(&req)?;

    let owner: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&req.owner_id)
        .fetch_optional(&state.db)
        .await?;
    if owner.is_none() {
        return Err(ApiError::not_found("Owner not found"));
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let images_json = serialize_images(&req.images);

    sqlx::query(
        "INSERT INTO items (id, title, description, category, price_per_day, location, images, is_available, owner_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.category)
    .bind(req.price_per_day)
    .bind(&req.location)
    .bind(&images_json)
    .bind(&req.owner_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    tracing::info!(item = %id, owner = %req.owner_id, "Item listed");

    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /api/items/:id
///
/// Partial update: absent fields keep their current value.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "item_id") {
        return Err(ApiError::validation_field("item_id", e));
    }

    let mut errors = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        if let Err(e) = validate_text(title, "title", 120) {
            errors.add("title", e);
        }
    }
    if let Some(description) = &req.description {
        if let Err(e) = validate_text(description, "description", 5000) {
            errors.add("description", e);
        }
    }
    if let Some(category) = &req.category {
        if let Err(e) = validate_text(category, "category", 60) {
            errors.add("category", e);
        }
    }
    if let Some(location) = &req.location {
        if let Err(e) = validate_text(location, "location", 120) {
            errors.add("location", e);
        }
    }
    if let Some(price) = req.price_per_day {
        if let Err(e) = validate_price(price) {
            errors.add("price_per_day", e);
        }
    }
    if let Some(images) = &req.images {
        if let Err(e) = validate_images(images) {
            errors.add("images", e);
        }
    }
    errors.finish()?;

    let existing = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    let now = chrono::Utc::now().to_rfc3339();
    let title = req.title.unwrap_or(existing.title);
    let description = req.description.unwrap_or(existing.description);
    let category = req.category.unwrap_or(existing.category);
    let price_per_day = req.price_per_day.unwrap_or(existing.price_per_day);
    let location = req.location.unwrap_or(existing.location);
    let images = req
        .images
        .map(|urls| serialize_images(&urls))
        .unwrap_or(existing.images);
    let is_available = req.is_available.unwrap_or(existing.is_available);

    sqlx::query(
        "UPDATE items SET title = ?, description = ?, category = ?, price_per_day = ?, \
         location = ?, images = ?, is_available = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&title)
    .bind(&description)
    .bind(&category)
    .bind(price_per_day)
    .bind(&location)
    .bind(&images)
    .bind(is_available)
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(item.into()))
}
