//! Conversation aggregation and the message-party rule.
//!
//! A conversation is the message thread of one booking, viewed from one
//! participant's side. The list is ordered by the booking's `updated_at`,
//! which message sends bump, so the most recently active thread sorts first.

use sqlx::{FromRow, SqlitePool};

use super::EngineError;
use crate::db::{Booking, ConversationSummary, LastMessage, UserSummary};

/// Enforce that a message stays between the two legitimate parties of a
/// booking: the sender must be the renter or the item owner, and the
/// receiver must be whichever of the two the sender is not. The receiver is
/// client-supplied, so a mismatch is a bad request, never silently fixed up.
pub fn verify_message_parties(
    booking: &Booking,
    item_owner_id: &str,
    sender_id: &str,
    receiver_id: &str,
) -> Result<(), EngineError> {
    let is_renter = booking.renter_id == sender_id;
    let is_owner = item_owner_id == sender_id;

    if !is_renter && !is_owner {
        return Err(EngineError::forbidden(
            "Only the renter or the item owner can message on this booking",
        ));
    }

    let expected_receiver = if is_renter {
        item_owner_id
    } else {
        booking.renter_id.as_str()
    };

    if receiver_id != expected_receiver {
        return Err(EngineError::validation("Invalid receiver for this booking"));
    }

    Ok(())
}

#[derive(FromRow)]
struct ConversationRow {
    booking_id: String,
    booking_status: String,
    start_date: String,
    end_date: String,
    updated_at: String,
    item_id: String,
    item_title: String,
    renter_id: String,
    renter_name: String,
    renter_email: String,
    renter_image: Option<String>,
    owner_id: String,
    owner_name: String,
    owner_email: String,
    owner_image: Option<String>,
    unread_count: i64,
    last_content: Option<String>,
    last_sender_id: Option<String>,
    last_created_at: Option<String>,
}

/// List the conversations a user participates in, most recently active
/// first. Each entry carries enough denormalized data to render a
/// conversation list without further lookups.
pub async fn list_conversations(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ConversationSummary>, EngineError> {
    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT
            b.id AS booking_id,
            b.status AS booking_status,
            b.start_date,
            b.end_date,
            b.updated_at,
            i.id AS item_id,
            i.title AS item_title,
            r.id AS renter_id, r.name AS renter_name, r.email AS renter_email, r.image AS renter_image,
            o.id AS owner_id, o.name AS owner_name, o.email AS owner_email, o.image AS owner_image,
            (SELECT COUNT(*) FROM messages m
                WHERE m.booking_id = b.id AND m.receiver_id = ? AND m.is_read = 0) AS unread_count,
            (SELECT m.content FROM messages m
                WHERE m.booking_id = b.id ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_content,
            (SELECT m.sender_id FROM messages m
                WHERE m.booking_id = b.id ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_sender_id,
            (SELECT m.created_at FROM messages m
                WHERE m.booking_id = b.id ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_created_at
        FROM bookings b
        JOIN items i ON i.id = b.item_id
        JOIN users r ON r.id = b.renter_id
        JOIN users o ON o.id = i.owner_id
        WHERE b.renter_id = ? OR i.owner_id = ?
        ORDER BY b.updated_at DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let conversations = rows
        .into_iter()
        .map(|row| {
            let other_party = if row.renter_id == user_id {
                UserSummary {
                    id: row.owner_id,
                    name: row.owner_name,
                    email: row.owner_email,
                    image: row.owner_image,
                }
            } else {
                UserSummary {
                    id: row.renter_id,
                    name: row.renter_name,
                    email: row.renter_email,
                    image: row.renter_image,
                }
            };

            let last_message = match (row.last_content, row.last_sender_id, row.last_created_at) {
                (Some(content), Some(sender_id), Some(created_at)) => Some(LastMessage {
                    content,
                    sender_id,
                    created_at,
                }),
                _ => None,
            };

            ConversationSummary {
                booking_id: row.booking_id,
                booking_status: row.booking_status,
                start_date: row.start_date,
                end_date: row.end_date,
                updated_at: row.updated_at,
                item_id: row.item_id,
                item_title: row.item_title,
                other_party,
                last_message,
                unread_count: row.unread_count,
            }
        })
        .collect();

    Ok(conversations)
}

/// Mark every message in a booking addressed to the user as read.
/// Idempotent: already-read messages are untouched, so re-invoking is a
/// no-op. Returns the number of messages flipped.
pub async fn mark_read(
    pool: &SqlitePool,
    booking_id: &str,
    user_id: &str,
) -> Result<u64, EngineError> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE booking_id = ? AND receiver_id = ? AND is_read = 0",
    )
    .bind(booking_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    fn booking_between(renter_id: &str) -> Booking {
        Booking {
            id: "b-1".to_string(),
            item_id: "i-1".to_string(),
            renter_id: renter_id.to_string(),
            start_date: "2025-03-01".to_string(),
            end_date: "2025-03-05".to_string(),
            total_price: 80.0,
            status: "PENDING".to_string(),
            created_at: "2025-02-01T00:00:00Z".to_string(),
            updated_at: "2025-02-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_verify_message_parties() {
        let booking = booking_between("renter");

        // Renter -> owner and owner -> renter both pass
        assert!(verify_message_parties(&booking, "owner", "renter", "owner").is_ok());
        assert!(verify_message_parties(&booking, "owner", "owner", "renter").is_ok());

        // A third party cannot send at all
        assert!(matches!(
            verify_message_parties(&booking, "owner", "stranger", "renter"),
            Err(EngineError::Forbidden(_))
        ));

        // A legitimate sender cannot redirect to a third party
        assert!(matches!(
            verify_message_parties(&booking, "owner", "renter", "stranger"),
            Err(EngineError::Validation(_))
        ));
        // ...or to themselves
        assert!(matches!(
            verify_message_parties(&booking, "owner", "renter", "renter"),
            Err(EngineError::Validation(_))
        ));
    }

    async fn seed_user(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO users (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("User {}", id))
        .bind(format!("{}@test.local", id))
        .bind("2025-01-01T00:00:00Z")
        .bind("2025-01-01T00:00:00Z")
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_item(pool: &SqlitePool, id: &str, owner_id: &str) {
        sqlx::query(
            "INSERT INTO items (id, title, description, category, price_per_day, location, owner_id, created_at, updated_at)
             VALUES (?, ?, 'desc', 'tools', 20.0, 'Berlin', ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("Item {}", id))
        .bind(owner_id)
        .bind("2025-01-01T00:00:00Z")
        .bind("2025-01-01T00:00:00Z")
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_booking(pool: &SqlitePool, id: &str, item_id: &str, renter_id: &str, updated_at: &str) {
        sqlx::query(
            "INSERT INTO bookings (id, item_id, renter_id, start_date, end_date, total_price, status, created_at, updated_at)
             VALUES (?, ?, ?, '2025-03-01', '2025-03-05', 80.0, 'PENDING', ?, ?)",
        )
        .bind(id)
        .bind(item_id)
        .bind(renter_id)
        .bind(updated_at)
        .bind(updated_at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_message(
        pool: &SqlitePool,
        id: &str,
        booking_id: &str,
        sender_id: &str,
        receiver_id: &str,
        created_at: &str,
    ) {
        sqlx::query(
            "INSERT INTO messages (id, booking_id, sender_id, receiver_id, content, created_at)
             VALUES (?, ?, ?, ?, 'hello', ?)",
        )
        .bind(id)
        .bind(booking_id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_conversations_unread_and_ordering() {
        let pool = init_test_pool().await;
        seed_user(&pool, "owner").await;
        seed_user(&pool, "renter").await;
        seed_item(&pool, "i-1", "owner").await;
        seed_item(&pool, "i-2", "owner").await;
        seed_booking(&pool, "b-old", "i-1", "renter", "2025-02-01T00:00:00Z").await;
        seed_booking(&pool, "b-new", "i-2", "renter", "2025-02-02T00:00:00Z").await;

        seed_message(&pool, "m-1", "b-old", "renter", "owner", "2025-02-01T10:00:00Z").await;
        seed_message(&pool, "m-2", "b-old", "renter", "owner", "2025-02-01T11:00:00Z").await;

        // Owner sees both conversations, newest booking activity first,
        // with two unread on the older thread
        let conversations = list_conversations(&pool, "owner").await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].booking_id, "b-new");
        assert_eq!(conversations[0].unread_count, 0);
        assert!(conversations[0].last_message.is_none());
        assert_eq!(conversations[1].booking_id, "b-old");
        assert_eq!(conversations[1].unread_count, 2);
        let last = conversations[1].last_message.as_ref().unwrap();
        assert_eq!(last.created_at, "2025-02-01T11:00:00Z");
        assert_eq!(conversations[1].other_party.id, "renter");

        // The renter sees the same threads with zero unread and the owner
        // as the other party
        let conversations = list_conversations(&pool, "renter").await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[1].unread_count, 0);
        assert_eq!(conversations[1].other_party.id, "owner");
    }

    #[tokio::test]
    async fn test_bumping_updated_at_reorders_conversations() {
        let pool = init_test_pool().await;
        seed_user(&pool, "owner").await;
        seed_user(&pool, "renter").await;
        seed_item(&pool, "i-1", "owner").await;
        seed_item(&pool, "i-2", "owner").await;
        seed_booking(&pool, "b-1", "i-1", "renter", "2025-02-01T00:00:00Z").await;
        seed_booking(&pool, "b-2", "i-2", "renter", "2025-02-02T00:00:00Z").await;

        // Sending on the older booking touches its updated_at
        seed_message(&pool, "m-1", "b-1", "renter", "owner", "2025-02-03T00:00:00Z").await;
        sqlx::query("UPDATE bookings SET updated_at = ? WHERE id = ?")
            .bind("2025-02-03T00:00:00Z")
            .bind("b-1")
            .execute(&pool)
            .await
            .unwrap();

        for user in ["owner", "renter"] {
            let conversations = list_conversations(&pool, user).await.unwrap();
            assert_eq!(conversations[0].booking_id, "b-1");
        }
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let pool = init_test_pool().await;
        seed_user(&pool, "owner").await;
        seed_user(&pool, "renter").await;
        seed_item(&pool, "i-1", "owner").await;
        seed_booking(&pool, "b-1", "i-1", "renter", "2025-02-01T00:00:00Z").await;
        seed_message(&pool, "m-1", "b-1", "renter", "owner", "2025-02-01T10:00:00Z").await;
        seed_message(&pool, "m-2", "b-1", "renter", "owner", "2025-02-01T11:00:00Z").await;

        assert_eq!(mark_read(&pool, "b-1", "owner").await.unwrap(), 2);
        // Second invocation finds nothing left to flip
        assert_eq!(mark_read(&pool, "b-1", "owner").await.unwrap(), 0);

        let conversations = list_conversations(&pool, "owner").await.unwrap();
        assert_eq!(conversations[0].unread_count, 0);
    }
}
