use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::MessageModel;
use crate::shared::AppError;

/// Trait for message repository operations
#[async_trait]
pub trait MessageRepository {
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError>;
    /// Messages exchanged between two users, oldest first
    async fn list_thread(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageModel>, AppError>;
    /// The most recent message with each counterpart of `user_id`, newest first
    async fn latest_per_counterpart(&self, user_id: &str) -> Result<Vec<MessageModel>, AppError>;
    /// Unread message counts for `user_id` keyed by sender
    async fn unread_by_sender(&self, user_id: &str) -> Result<HashMap<String, i64>, AppError>;
    /// Marks everything `sender_id` sent to `receiver_id` as read
    async fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<u64, AppError>;
    async fn count_unread(&self, user_id: &str) -> Result<i64, AppError>;
    /// Clears references to deleted bookings
    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError>;
}

/// In-memory implementation of MessageRepository for development and testing
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<MessageModel>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError> {
        debug!(message_id = %message.id, sender_id = %message.sender_id, "Storing message in memory");
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn list_thread(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let messages = self.messages.lock().unwrap();
        let mut thread: Vec<MessageModel> = messages
            .iter()
            .filter(|m| m.is_between(user_id, other_id))
            .cloned()
            .collect();
        thread.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(thread)
    }

    async fn latest_per_counterpart(&self, user_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let messages = self.messages.lock().unwrap();
        let mut latest: HashMap<String, MessageModel> = HashMap::new();
        for message in messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
        {
            let counterpart = message.counterpart(user_id).to_string();
            match latest.get(&counterpart) {
                Some(existing) if existing.created_at >= message.created_at => {}
                _ => {
                    latest.insert(counterpart, message.clone());
                }
            }
        }
        let mut latest: Vec<MessageModel> = latest.into_values().collect();
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(latest)
    }

    async fn unread_by_sender(&self, user_id: &str) -> Result<HashMap<String, i64>, AppError> {
        let messages = self.messages.lock().unwrap();
        let mut counts = HashMap::new();
        for message in messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
        {
            *counts.entry(message.sender_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<u64, AppError> {
        let mut messages = self.messages.lock().unwrap();
        let mut updated = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.receiver_id == receiver_id && m.sender_id == sender_id && !m.is_read)
        {
            message.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unread(&self, user_id: &str) -> Result<i64, AppError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .count() as i64)
    }

    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError> {
        let mut detached = 0;
        for message in self.messages.lock().unwrap().iter_mut() {
            if message
                .booking_id
                .as_ref()
                .is_some_and(|id| booking_ids.contains(id))
            {
                message.booking_id = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}

/// PostgreSQL implementation of message repository
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, booking_id, content, is_read, created_at";

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, booking_id, content, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.booking_id)
        .bind(&message.content)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store message in database");
            AppError::from(e)
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_thread(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let messages = sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .bind(other_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn latest_per_counterpart(&self, user_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let messages = sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM ( \
                 SELECT DISTINCT ON (CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END) * \
                 FROM messages WHERE sender_id = $1 OR receiver_id = $1 \
                 ORDER BY CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END, created_at DESC \
             ) latest ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn unread_by_sender(&self, user_id: &str) -> Result<HashMap<String, i64>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT sender_id, COUNT(*) FROM messages \
             WHERE receiver_id = $1 AND NOT is_read GROUP BY sender_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read",
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE messages SET booking_id = NULL WHERE booking_id = ANY($1)")
            .bind(booking_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message_at(from: &str, to: &str, content: &str, minutes_ago: i64) -> MessageModel {
        let mut message = MessageModel::new(from, to, content.to_string());
        message.created_at = Utc::now() - Duration::minutes(minutes_ago);
        message
    }

    #[tokio::test]
    async fn test_latest_per_counterpart() {
        let repo = InMemoryMessageRepository::new();
        for m in [
            message_at("a", "b", "1", 30),
            message_at("b", "a", "2", 20),
            message_at("c", "a", "3", 25),
            message_at("b", "c", "unrelated", 1),
        ] {
            repo.create_message(&m).await.unwrap();
        }

        let latest = repo.latest_per_counterpart("a").await.unwrap();
        let contents: Vec<&str> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_mark_read_only_touches_one_sender() {
        let repo = InMemoryMessageRepository::new();
        for m in [
            message_at("b", "a", "x", 3),
            message_at("b", "a", "y", 2),
            message_at("c", "a", "z", 1),
        ] {
            repo.create_message(&m).await.unwrap();
        }

        assert_eq!(repo.count_unread("a").await.unwrap(), 3);
        assert_eq!(repo.mark_read("a", "b").await.unwrap(), 2);
        assert_eq!(repo.count_unread("a").await.unwrap(), 1);

        let by_sender = repo.unread_by_sender("a").await.unwrap();
        assert_eq!(by_sender.get("c"), Some(&1));
        assert!(by_sender.get("b").is_none());
    }

    #[tokio::test]
    async fn test_detach_bookings() {
        let repo = InMemoryMessageRepository::new();
        let mut linked = message_at("a", "b", "linked", 2);
        linked.booking_id = Some("booking-1".to_string());
        let mut other = message_at("a", "b", "other", 1);
        other.booking_id = Some("booking-2".to_string());
        repo.create_message(&linked).await.unwrap();
        repo.create_message(&other).await.unwrap();

        let detached = repo
            .detach_bookings(&["booking-1".to_string()])
            .await
            .unwrap();
        assert_eq!(detached, 1);

        let thread = repo.list_thread("a", "b").await.unwrap();
        assert!(thread[0].booking_id.is_none());
        assert_eq!(thread[1].booking_id.as_deref(), Some("booking-2"));
    }

    #[tokio::test]
    async fn test_thread_is_oldest_first() {
        let repo = InMemoryMessageRepository::new();
        repo.create_message(&message_at("a", "b", "second", 1))
            .await
            .unwrap();
        repo.create_message(&message_at("b", "a", "first", 5))
            .await
            .unwrap();

        let thread = repo.list_thread("a", "b").await.unwrap();
        assert_eq!(thread[0].content, "first");
        assert_eq!(thread[1].content, "second");
    }
}
