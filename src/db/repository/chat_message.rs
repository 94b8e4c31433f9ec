use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Chat Message Repository
// ============================================================================

pub struct ChatMessageRepository;

impl ChatMessageRepository {
    pub async fn create(pool: &SqlitePool, msg: CreateChatMessage) -> AppResult<ChatMessage> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, stream_id, user_id, message, is_moderator, is_deleted, created_at)
            VALUES (?, ?, ?, ?, 0, 0, ?)
            RETURNING id, stream_id, user_id, message, is_moderator, is_deleted, created_at
            "#,
        )
        .bind(&id)
        .bind(&msg.stream_id)
        .bind(&msg.user_id)
        .bind(&msg.message)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Visible messages of a stream in chat order (oldest first).
    pub async fn list_for_stream(
        pool: &SqlitePool,
        stream_id: &str,
        limit: i64,
    ) -> AppResult<Vec<ChatMessage>> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, stream_id, user_id, message, is_moderator, is_deleted, created_at
            FROM chat_messages
            WHERE stream_id = ? AND is_deleted = 0
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(stream_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::init_memory_db;

    #[tokio::test]
    async fn messages_are_listed_per_stream_in_order() {
        let pool = init_memory_db().await.unwrap();
        for (stream, text) in [("s1", "first"), ("s2", "other"), ("s1", "second")] {
            ChatMessageRepository::create(
                &pool,
                CreateChatMessage {
                    stream_id: stream.to_string(),
                    user_id: "u1".to_string(),
                    message: text.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let msgs = ChatMessageRepository::list_for_stream(&pool, "s1", 100).await.unwrap();
        let texts: Vec<_> = msgs.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(msgs.iter().all(|m| !m.is_deleted && !m.is_moderator));
    }
}
