//! Message models and conversation DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Message with sender/receiver summaries, as returned by the thread endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MessageWithParties {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
    pub receiver: UserSummary,
}

/// One entry in a user's conversation list: a booking annotated with the
/// latest message and the count of unread messages addressed to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub booking_id: String,
    pub booking_status: String,
    pub start_date: String,
    pub end_date: String,
    pub updated_at: String,
    pub item_id: String,
    pub item_title: String,
    /// The participant who is not the requesting user
    pub other_party: UserSummary,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub booking_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub booking_id: String,
    pub user_id: String,
}

/// Query parameters for the messages endpoint: exactly one of the two
/// selects the mode (thread for a booking, or conversation list for a user).
#[derive(Debug, Default, Deserialize)]
pub struct MessageFilter {
    pub booking_id: Option<String>,
    pub user_id: Option<String>,
}
