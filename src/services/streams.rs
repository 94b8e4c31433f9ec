use rand::RngCore;
use serde::Deserialize;

use crate::db::CreateStream;
use crate::error::{AppError, AppResult};

/// Body of `POST /streams/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub struct StreamService;

impl StreamService {
    /// Secret key an encoder uses to publish into a stream.
    pub fn generate_stream_key() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("sk_{}", hex::encode(bytes))
    }

    pub fn prepare(req: CreateStreamRequest, playback_url: &str) -> AppResult<CreateStream> {
        let title = req.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let user_id = req.user_id.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        let (title, user_id) = match (title, user_id) {
            (Some(t), Some(u)) => (t, u),
            _ => {
                return Err(AppError::BadRequest(
                    "Title and userId are required".to_string(),
                ))
            }
        };

        let tags = req.tags.map(|tags| {
            tags.into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(CreateStream {
            user_id,
            title,
            description: req.description,
            category: req.category,
            tags,
            stream_key: Self::generate_stream_key(),
            playback_url: Some(playback_url.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_keys_are_unique_hex() {
        let a = StreamService::generate_stream_key();
        let b = StreamService::generate_stream_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 3 + 32);
        assert!(a[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn prepare_requires_title_and_user() {
        let err = StreamService::prepare(
            CreateStreamRequest {
                title: Some("  ".into()),
                user_id: Some("u1".into()),
                ..Default::default()
            },
            "https://placeholder.m3u8",
        );
        assert!(matches!(err, Err(AppError::BadRequest(_))));

        let ok = StreamService::prepare(
            CreateStreamRequest {
                title: Some("Live Coding".into()),
                user_id: Some("u1".into()),
                tags: Some(vec!["ai".into(), " ".into()]),
                ..Default::default()
            },
            "https://placeholder.m3u8",
        )
        .unwrap();
        assert_eq!(ok.tags, Some(vec!["ai".to_string()]));
        assert_eq!(ok.playback_url.as_deref(), Some("https://placeholder.m3u8"));
    }
}
