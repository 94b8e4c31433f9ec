use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::notifier::payload::Urgency;
use crate::services::ttl_registry::{DuplicateKey, TtlRegistry};

pub const DEFAULT_TOPIC: &str = "General assistance needed";

/// A viewer asking an expert for help. Serialized in the same camelCase shape
/// the expert-help widget decodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub id: String,
    pub expert_email: Option<String>,
    pub requester_name: String,
    pub topic: String,
    pub urgency: Urgency,
    pub timestamp: DateTime<Utc>,
    pub stream_id: Option<String>,
}

/// Body of `POST /expert/help-requests`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHelpRequest {
    /// Client-chosen id; generated when absent.
    pub id: Option<String>,
    pub expert_email: Option<String>,
    pub requester_name: Option<String>,
    pub topic: Option<String>,
    pub urgency: Option<String>,
    pub stream_id: Option<String>,
}

/// Recently issued help requests, each kept for a fixed retention window so the
/// same request id is never processed twice.
#[derive(Clone)]
pub struct HelpRequestRegistry {
    requests: TtlRegistry<String, HelpRequest>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl HelpRequestRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            requests: TtlRegistry::new(ttl),
        }
    }

    pub fn create(&self, req: CreateHelpRequest) -> AppResult<HelpRequest> {
        let requester_name = non_empty(req.requester_name)
            .ok_or_else(|| AppError::BadRequest("requesterName is required".to_string()))?;

        let urgency = match non_empty(req.urgency) {
            Some(u) => u.parse::<Urgency>().map_err(|_| {
                AppError::BadRequest(format!(
                    "Invalid urgency '{}' (expected low, medium or high)",
                    u
                ))
            })?,
            None => Urgency::Medium,
        };

        let id = non_empty(req.id).unwrap_or_else(|| format!("help-{}", Uuid::new_v4()));

        let request = HelpRequest {
            id: id.clone(),
            expert_email: non_empty(req.expert_email),
            requester_name,
            topic: non_empty(req.topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            urgency,
            timestamp: Utc::now(),
            stream_id: non_empty(req.stream_id),
        };

        self.requests
            .insert(id.clone(), request.clone())
            .map_err(|DuplicateKey| {
                AppError::Conflict(format!("Help request {} was already submitted", id))
            })?;

        tracing::info!(
            "Registered help request {} from {} (urgency={})",
            request.id,
            request.requester_name,
            request.urgency.as_str()
        );

        Ok(request)
    }

    /// Newest unacknowledged request for an expert.
    ///
    /// Recipient assignment is not defined yet, so this always reports "no new
    /// request" regardless of what the registry holds.
    pub fn list(&self, expert_email: Option<&str>) -> Option<HelpRequest> {
        tracing::debug!(
            "Help request lookup for expert={:?} ({} pending in registry)",
            expert_email,
            self.pending()
        );
        None
    }

    pub fn get(&self, id: &str) -> Option<HelpRequest> {
        self.requests.get(&id.to_string())
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(5 * 60);

    fn body(name: &str) -> CreateHelpRequest {
        CreateHelpRequest {
            requester_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn created_request_expires_after_retention_window() {
        let registry = HelpRequestRegistry::new(TTL);
        let created = registry.create(body("John Student")).unwrap();

        assert_eq!(registry.get(&created.id), Some(created.clone()));

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(registry.get(&created.id), None);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn defaults_are_applied() {
        let registry = HelpRequestRegistry::new(TTL);
        let created = registry.create(body("John Student")).unwrap();

        assert!(created.id.starts_with("help-"));
        assert_eq!(created.topic, DEFAULT_TOPIC);
        assert_eq!(created.urgency, Urgency::Medium);
        assert_eq!(created.stream_id, None);
    }

    #[tokio::test]
    async fn duplicate_client_id_is_rejected() {
        let registry = HelpRequestRegistry::new(TTL);
        let mut req = body("John Student");
        req.id = Some("help-fixed".to_string());

        registry.create(req.clone()).unwrap();
        match registry.create(req) {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("help-fixed")),
            other => panic!("expected conflict, got {:?}", other.map(|r| r.id)),
        }
        assert_eq!(registry.pending(), 1);
    }

    #[tokio::test]
    async fn rejects_missing_requester_and_unknown_urgency() {
        let registry = HelpRequestRegistry::new(TTL);
        assert!(matches!(
            registry.create(CreateHelpRequest::default()),
            Err(AppError::BadRequest(_))
        ));

        let mut req = body("Jane");
        req.urgency = Some("critical".to_string());
        assert!(matches!(registry.create(req), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn list_is_a_stub() {
        let registry = HelpRequestRegistry::new(TTL);
        let mut req = body("Jane");
        req.expert_email = Some("expert@example.com".to_string());
        registry.create(req).unwrap();

        assert_eq!(registry.list(Some("expert@example.com")), None);
        assert_eq!(registry.list(None), None);
    }
}
