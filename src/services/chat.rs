use serde::Deserialize;

use crate::db::CreateChatMessage;
use crate::error::{AppError, AppResult};

pub const MAX_MESSAGE_CHARS: usize = 500;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatMessage {
    pub stream_id: Option<String>,
    pub user_id: Option<String>,
    pub message: Option<String>,
}

pub struct ChatService;

impl ChatService {
    /// Check required fields and length, returning the row to insert with the
    /// message trimmed.
    pub fn validate(req: SendChatMessage) -> AppResult<CreateChatMessage> {
        let missing = || {
            AppError::BadRequest("StreamId, userId, and message are required".to_string())
        };

        let stream_id = req.stream_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let user_id = req.user_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let message = req.message.filter(|m| !m.trim().is_empty()).ok_or_else(missing)?;

        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::BadRequest(format!(
                "Message too long (max {} characters)",
                MAX_MESSAGE_CHARS
            )));
        }

        Ok(CreateChatMessage {
            stream_id,
            user_id,
            message: message.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(message: &str) -> SendChatMessage {
        SendChatMessage {
            stream_id: Some("s1".into()),
            user_id: Some("u1".into()),
            message: Some(message.into()),
        }
    }

    #[test]
    fn trims_valid_messages() {
        let row = ChatService::validate(req("  hi  ")).unwrap();
        assert_eq!(row.message, "hi");
    }

    #[test]
    fn length_limit_is_inclusive() {
        assert!(ChatService::validate(req(&"a".repeat(500))).is_ok());
        match ChatService::validate(req(&"a".repeat(501))) {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("too long")),
            _ => panic!("expected a length error"),
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        assert!(matches!(
            ChatService::validate(req("   ")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ChatService::validate(SendChatMessage::default()),
            Err(AppError::BadRequest(_))
        ));
    }
}
