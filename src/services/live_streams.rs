use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::{Stream, StreamRepository};
use crate::error::AppResult;
use crate::services::ttl_registry::TtlRegistry;

/// How many freshly-live candidates are inspected per check.
const CANDIDATE_LIMIT: i64 = 20;

/// Body of `newLiveStream` in the check-live response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamNotice {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Stream> for LiveStreamNotice {
    fn from(s: &Stream) -> Self {
        let went_live = s.started_at.unwrap_or(s.created_at);
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            user_id: s.user_id.clone(),
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(went_live, Utc),
        }
    }
}

/// Reports each stream that goes live once per retention window.
#[derive(Clone)]
pub struct LiveStreamTracker {
    notified: TtlRegistry<String, ()>,
    /// Streams that went live before the service started are not announced.
    tracking_since: NaiveDateTime,
}

impl LiveStreamTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            notified: TtlRegistry::new(ttl),
            tracking_since: Utc::now().naive_utc(),
        }
    }

    /// Oldest live stream that has not been announced yet, if any.
    pub async fn next_new_live(&self, pool: &SqlitePool) -> AppResult<Option<LiveStreamNotice>> {
        let window = chrono::Duration::from_std(self.notified.ttl())
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let floor = (Utc::now().naive_utc() - window).max(self.tracking_since);

        // Already-announced ids are filtered in SQL so they cannot crowd out newer streams
        let announced = self.notified.keys();
        let candidates =
            StreamRepository::find_live_since(pool, floor, &announced, CANDIDATE_LIMIT).await?;
        for stream in &candidates {
            // Concurrent checks race on the insert; only the winner announces it
            if self.notified.insert(stream.id.clone(), ()).is_ok() {
                tracing::info!("Announcing live stream {} ({})", stream.id, stream.title);
                return Ok(Some(LiveStreamNotice::from(stream)));
            }
        }

        Ok(None)
    }
}
