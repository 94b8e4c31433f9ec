use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub stream_id: String,
    pub user_id: String,
    pub message: String,
    pub is_moderator: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateChatMessage {
    pub stream_id: String,
    pub user_id: String,
    /// Already trimmed and length-checked by the caller.
    pub message: String,
}
