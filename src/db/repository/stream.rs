use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Stream Repository
// ============================================================================

const STREAM_COLUMNS: &str = r#"
    id, user_id, title, description, thumbnail_url, stream_key, playback_url,
    is_live, viewer_count, category, tags, started_at, ended_at, created_at, updated_at
"#;

fn map_stream(r: &SqliteRow) -> Stream {
    let tags: Option<String> = r.get("tags");
    Stream {
        id: r.get("id"),
        user_id: r.get("user_id"),
        title: r.get("title"),
        description: r.get("description"),
        thumbnail_url: r.get("thumbnail_url"),
        stream_key: r.get("stream_key"),
        playback_url: r.get("playback_url"),
        is_live: r.get("is_live"),
        viewer_count: r.get("viewer_count"),
        category: r.get("category"),
        // A malformed tags column should not make the whole row unreadable
        tags: tags.and_then(|t| serde_json::from_str(&t).ok()),
        started_at: r.get("started_at"),
        ended_at: r.get("ended_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

pub struct StreamRepository;

impl StreamRepository {
    pub async fn create(pool: &SqlitePool, stream: CreateStream) -> AppResult<Stream> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let tags = stream
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO streams (
                id, user_id, title, description, thumbnail_url, stream_key, playback_url,
                is_live, viewer_count, category, tags, started_at, ended_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, NULL, ?, ?, 0, 0, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&stream.user_id)
        .bind(&stream.title)
        .bind(&stream.description)
        .bind(&stream.stream_key)
        .bind(&stream.playback_url)
        .bind(&stream.category)
        .bind(&tags)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Stream {
            id,
            user_id: stream.user_id,
            title: stream.title,
            description: stream.description,
            thumbnail_url: None,
            stream_key: stream.stream_key,
            playback_url: stream.playback_url,
            is_live: false,
            viewer_count: 0,
            category: stream.category,
            tags: stream.tags,
            started_at: None,
            ended_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Stream>> {
        let row = sqlx::query(&format!("SELECT {} FROM streams WHERE id = ?", STREAM_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_stream))
    }

    /// Mark a stream live. Returns `None` when no stream has this id.
    pub async fn start(pool: &SqlitePool, id: &str) -> AppResult<Option<Stream>> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE streams
            SET is_live = 1, started_at = ?, ended_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Mark a stream ended and reset its viewer count.
    pub async fn end(pool: &SqlitePool, id: &str) -> AppResult<Option<Stream>> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE streams
            SET is_live = 0, ended_at = ?, viewer_count = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Most recently started stream that is currently live.
    pub async fn find_latest_live(pool: &SqlitePool) -> AppResult<Option<Stream>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM streams
            WHERE is_live = 1
            ORDER BY started_at DESC, created_at DESC
            LIMIT 1
            "#,
            STREAM_COLUMNS
        ))
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_stream))
    }

    /// Live streams that started strictly after `since`, oldest first,
    /// skipping the ids in `exclude`.
    pub async fn find_live_since(
        pool: &SqlitePool,
        since: NaiveDateTime,
        exclude: &[String],
        limit: i64,
    ) -> AppResult<Vec<Stream>> {
        let exclude_clause = if exclude.is_empty() {
            String::new()
        } else {
            format!("AND id NOT IN ({})", vec!["?"; exclude.len()].join(", "))
        };
        let sql = format!(
            r#"
            SELECT {}
            FROM streams
            WHERE is_live = 1 AND started_at > ? {}
            ORDER BY started_at ASC, rowid ASC
            LIMIT ?
            "#,
            STREAM_COLUMNS, exclude_clause
        );

        let mut query = sqlx::query(&sql).bind(since);
        for id in exclude {
            query = query.bind(id);
        }
        let rows = query
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(map_stream).collect())
    }

    pub async fn set_thumbnail(pool: &SqlitePool, id: &str, url: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query("UPDATE streams SET thumbnail_url = ?, updated_at = ? WHERE id = ?")
            .bind(url)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::init_memory_db;

    fn new_stream(user_id: &str, title: &str, key: &str) -> CreateStream {
        CreateStream {
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: Some("desc".to_string()),
            category: Some("AI & Machine Learning".to_string()),
            tags: Some(vec!["coding".to_string(), "ai".to_string()]),
            stream_key: key.to_string(),
            playback_url: Some("https://demo.m3u8".to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_find_roundtrips_tags() {
        let pool = init_memory_db().await.unwrap();
        let created = StreamRepository::create(&pool, new_stream("u1", "Hello", "sk_1"))
            .await
            .unwrap();

        let found = StreamRepository::find_by_id(&pool, &created.id)
            .await
            .unwrap()
            .expect("stream should exist");
        assert_eq!(found.title, "Hello");
        assert_eq!(found.tags, Some(vec!["coding".to_string(), "ai".to_string()]));
        assert!(!found.is_live);
    }

    #[tokio::test]
    async fn start_and_end_toggle_live_state() {
        let pool = init_memory_db().await.unwrap();
        let created = StreamRepository::create(&pool, new_stream("u1", "Hello", "sk_1"))
            .await
            .unwrap();

        let started = StreamRepository::start(&pool, &created.id).await.unwrap().unwrap();
        assert!(started.is_live);
        assert!(started.started_at.is_some());

        let latest = StreamRepository::find_latest_live(&pool).await.unwrap().unwrap();
        assert_eq!(latest.id, created.id);

        let ended = StreamRepository::end(&pool, &created.id).await.unwrap().unwrap();
        assert!(!ended.is_live);
        assert_eq!(ended.viewer_count, 0);
        assert!(ended.ended_at.is_some());

        assert!(StreamRepository::find_latest_live(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lifecycle_on_unknown_stream_is_none() {
        let pool = init_memory_db().await.unwrap();
        assert!(StreamRepository::start(&pool, "missing").await.unwrap().is_none());
        assert!(StreamRepository::end(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_live_since_orders_oldest_first() {
        let pool = init_memory_db().await.unwrap();
        let before = Utc::now().naive_utc() - chrono::Duration::seconds(1);

        let a = StreamRepository::create(&pool, new_stream("u1", "A", "sk_a")).await.unwrap();
        let b = StreamRepository::create(&pool, new_stream("u2", "B", "sk_b")).await.unwrap();
        let idle = StreamRepository::create(&pool, new_stream("u3", "C", "sk_c")).await.unwrap();
        StreamRepository::start(&pool, &a.id).await.unwrap();
        StreamRepository::start(&pool, &b.id).await.unwrap();

        let live = StreamRepository::find_live_since(&pool, before, &[], 10).await.unwrap();
        let ids: Vec<_> = live.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        assert!(!ids.contains(&idle.id.as_str()));

        let rest = StreamRepository::find_live_since(&pool, before, &[a.id.clone()], 10)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, b.id);
    }
}
