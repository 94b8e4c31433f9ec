use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A broadcast owned by a streamer. Rows are created idle (`is_live = false`)
/// and toggled by the start/end lifecycle endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub stream_key: String,
    pub playback_url: Option<String>,
    pub is_live: bool,
    pub viewer_count: i64,
    pub category: Option<String>,
    /// Stored as a JSON array in the `tags` column.
    pub tags: Option<Vec<String>>,
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateStream {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub stream_key: String,
    pub playback_url: Option<String>,
}
