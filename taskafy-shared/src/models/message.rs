/// Task-scoped messages between client and tasker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const MESSAGE_COLUMNS: &str = "id, task_id, sender_id, receiver_id, content, is_read, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub task_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO messages (task_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Message>(&query)
            .bind(task_id)
            .bind(sender_id)
            .bind(receiver_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// Conversation for a task, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE task_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, Message>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Marks everything addressed to `receiver_id` in a task as read
    pub async fn mark_read(pool: &PgPool, task_id: Uuid, receiver_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE WHERE task_id = $1 AND receiver_id = $2 AND NOT is_read",
        )
        .bind(task_id)
        .bind(receiver_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, receiver_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND NOT is_read")
                .bind(receiver_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

/// Trims and bounds message content
pub fn validate_content(content: &str) -> Result<&str, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("Message content cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message content must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(trimmed)
}
