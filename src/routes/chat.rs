use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{ChatMessage, ChatMessageRepository};
use crate::error::{AppError, AppResult};
use crate::routes::extract::AppJson;
use crate::services::chat::{ChatService, SendChatMessage};
use crate::AppState;

/// Upper bound on messages returned by one history request.
const HISTORY_LIMIT: i64 = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_messages).post(send_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryQuery {
    pub stream_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub chat_message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SendChatMessage>,
) -> AppResult<(StatusCode, Json<ChatMessageResponse>)> {
    let new_message = ChatService::validate(req)?;
    let chat_message = ChatMessageRepository::create(&state.db, new_message).await?;

    Ok((StatusCode::CREATED, Json(ChatMessageResponse { chat_message })))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatHistoryQuery>,
) -> AppResult<Json<ChatHistoryResponse>> {
    let stream_id = query
        .stream_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("streamId is required".to_string()))?;

    let messages = ChatMessageRepository::list_for_stream(&state.db, &stream_id, HISTORY_LIMIT).await?;

    Ok(Json(ChatHistoryResponse { messages }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{
        get_request, json_body, json_request, raw_json_request, test_app, test_state,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn message_is_trimmed_and_stored() {
        let app = test_app(test_state().await);

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"streamId": "s1", "userId": "u1", "message": "  hi  "}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json_body(res.into_body()).await;
        assert_eq!(body["chatMessage"]["message"], "hi");
        assert_eq!(body["chatMessage"]["stream_id"], "s1");

        let res = app.oneshot(get_request("/api/chat?streamId=s1")).await.unwrap();
        let body = json_body(res.into_body()).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversize_message_is_rejected_and_not_stored() {
        let app = test_app(test_state().await);

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"streamId": "s1", "userId": "u1", "message": "x".repeat(501)}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res.into_body()).await["error"],
            "Message too long (max 500 characters)"
        );

        let res = app.oneshot(get_request("/api/chat?streamId=s1")).await.unwrap();
        let body = json_body(res.into_body()).await;
        assert!(body["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let app = test_app(test_state().await);

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"streamId": "s1", "message": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res.into_body()).await["error"],
            "StreamId, userId, and message are required"
        );

        let res = app.oneshot(get_request("/api/chat")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mistyped_body_gets_json_error() {
        let app = test_app(test_state().await);

        let res = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"streamId": "s1", "userId": "u1", "message": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res.into_body()).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["error"].as_str().unwrap().contains("message"));
    }

    #[tokio::test]
    async fn malformed_json_gets_json_error() {
        let app = test_app(test_state().await);

        let res = app
            .oneshot(raw_json_request("POST", "/api/chat", "{not json"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res.into_body()).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(!body["error"].as_str().unwrap().is_empty());
    }
}
