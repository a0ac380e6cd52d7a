//! Messaging: per-booking threads, conversation lists, send, mark-read.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ApiError, Json, ValidationErrorBuilder};
use super::validation::{validate_text, validate_uuid};
use crate::db::{
    Booking, ConversationSummary, Item, MarkReadRequest, Message, MessageFilter,
    MessageWithParties, SendMessageRequest, UserSummary,
};
use crate::engine::conversations::{list_conversations, mark_read, verify_message_parties};
use crate::AppState;

#[derive(FromRow)]
struct MessageRow {
    #[sqlx(flatten)]
    message: Message,
    sender_name: String,
    sender_email: String,
    sender_image: Option<String>,
    receiver_name: String,
    receiver_email: String,
    receiver_image: Option<String>,
}

impl From<MessageRow> for MessageWithParties {
    fn from(row: MessageRow) -> Self {
        let sender = UserSummary {
            id: row.message.sender_id.clone(),
            name: row.sender_name,
            email: row.sender_email,
            image: row.sender_image,
        };
        let receiver = UserSummary {
            id: row.message.receiver_id.clone(),
            name: row.receiver_name,
            email: row.receiver_email,
            image: row.receiver_image,
        };
        Self {
            message: row.message,
            sender,
            receiver,
        }
    }
}

/// Response for the two GET modes
#[derive(Serialize)]
#[serde(untagged)]
pub enum MessagesResponse {
    Thread { messages: Vec<MessageWithParties> },
    Conversations { conversations: Vec<ConversationSummary> },
}

/// GET /api/messages?booking_id=… | ?user_id=…
///
/// With `booking_id`: the full thread for one booking, oldest first.
/// With `user_id`: the per-user conversation list, most recently active
/// first.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MessageFilter>,
) -> Result<Json<MessagesResponse>, ApiError> {
    match (&filter.booking_id, &filter.user_id) {
        (Some(booking_id), _) => {
            if let Err(e) = validate_uuid(booking_id, "booking_id") {
                return Err(ApiError::validation_field("booking_id", e));
            }

            let rows: Vec<MessageRow> = sqlx::query_as(
                "SELECT m.*, \
                 s.name AS sender_name, s.email AS sender_email, s.image AS sender_image, \
                 r.name AS receiver_name, r.email AS receiver_email, r.image AS receiver_image \
                 FROM messages m \
                 JOIN users s ON s.id = m.sender_id \
                 JOIN users r ON r.id = m.receiver_id \
                 WHERE m.booking_id = ? ORDER BY m.created_at ASC, m.id ASC",
            )
            .bind(booking_id)
            .fetch_all(&state.db)
            .await?;

            Ok(Json(MessagesResponse::Thread {
                messages: rows.into_iter().map(Into::into).collect(),
            }))
        }
        (None, Some(user_id)) => {
            let conversations = list_conversations(&state.db, user_id).await?;
            Ok(Json(MessagesResponse::Conversations { conversations }))
        }
        (None, None) => Err(ApiError::validation_field(
            "booking_id",
            "booking_id or user_id is required",
        )),
    }
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageWithParties>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_uuid(&req.booking_id, "booking_id") {
        errors.add("booking_id", e);
    }
    if let Err(e) = validate_uuid(&req.sender_id, "sender_id") {
        errors.add("sender_id", e);
    }
    if let Err(e) = validate_uuid(&req.receiver_id, "receiver_id") {
        errors.add("receiver_id", e);
    }
    if let Err(e) = validate_text(&req.content, "content", 5000) {
        errors.add("content", e);
    }
    errors.finish()?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(&req.booking_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(&booking.item_id)
        .fetch_one(&state.db)
        .await?;

    verify_message_parties(&booking, &item.owner_id, &req.sender_id, &req.receiver_id)
        .map_err(ApiError::from)?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    // Insert and bump the conversation's ordering key together
    let mut tx = state.db.begin().await?;
    sqlx::query(
        "INSERT INTO messages (id, booking_id, sender_id, receiver_id, content, is_read, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(&req.booking_id)
    .bind(&req.sender_id)
    .bind(&req.receiver_id)
    .bind(&req.content)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE bookings SET updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(&req.booking_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let row: MessageRow = sqlx::query_as(
        "SELECT m.*, \
         s.name AS sender_name, s.email AS sender_email, s.image AS sender_image, \
         r.name AS receiver_name, r.email AS receiver_email, r.image AS receiver_image \
         FROM messages m \
         JOIN users s ON s.id = m.sender_id \
         JOIN users r ON r.id = m.receiver_id \
         WHERE m.id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: u64,
}

/// PATCH /api/messages/read
pub async fn mark_messages_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_uuid(&req.booking_id, "booking_id") {
        errors.add("booking_id", e);
    }
    if let Err(e) = validate_uuid(&req.user_id, "user_id") {
        errors.add("user_id", e);
    }
    errors.finish()?;

    let updated = mark_read(&state.db, &req.booking_id, &req.user_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}
