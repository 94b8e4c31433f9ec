//! Notification payloads delivered by polling or by local events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::notifier::sound::{self, SoundCue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Urgency::Low => "💡",
            Urgency::Medium => "⚠️",
            Urgency::High => "🚨",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown urgency: {0}")]
pub struct ParseUrgencyError(pub String);

impl FromStr for Urgency {
    type Err = ParseUrgencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            other => Err(ParseUrgencyError(other.to_string())),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour family used when rendering a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Primary,
    Blue,
    Amber,
    Red,
}

/// What the "act on this" button of a toast does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertAction {
    /// Navigate to the stream page.
    OpenStream { path: String },
    /// Respond to a requester who is not attached to a stream.
    Respond { requester_name: String },
}

/// Request for an OS-level notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNotification {
    pub title: String,
    pub body: String,
    /// Platforms coalesce notifications sharing a tag.
    pub tag: String,
    pub require_interaction: bool,
}

/// A payload kind handled by a notification widget.
pub trait Alert: Clone + fmt::Debug + Send + Sync + DeserializeOwned + Serialize + 'static {
    /// Name of the local event that carries this payload.
    const EVENT_NAME: &'static str;
    /// Field of the poll response holding the payload.
    const RESPONSE_FIELD: &'static str;

    fn id(&self) -> &str;

    /// Payloads failing this check are dropped without surfacing anything.
    fn is_well_formed(&self) -> bool;

    fn sound(&self) -> SoundCue;

    fn system_notification(&self) -> SystemNotification;

    fn action(&self) -> AlertAction;

    fn accent(&self) -> Accent;

    /// One-line text used by terminal renderers.
    fn headline(&self) -> String;

    /// Decode and validate a raw payload. `None` for anything malformed.
    fn from_value(value: serde_json::Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        serde_json::from_value::<Self>(value)
            .ok()
            .filter(|alert| alert.is_well_formed())
    }
}

// ============================================================================
// Live stream
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamAlert {
    /// Stream id; also the navigation target.
    pub id: String,
    pub title: String,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Alert for LiveStreamAlert {
    const EVENT_NAME: &'static str = "newLiveStream";
    const RESPONSE_FIELD: &'static str = "newLiveStream";

    fn id(&self) -> &str {
        &self.id
    }

    fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }

    fn sound(&self) -> SoundCue {
        sound::live_stream_chime()
    }

    fn system_notification(&self) -> SystemNotification {
        SystemNotification {
            title: "🔴 New Live Stream!".to_string(),
            body: format!("{} is now live!", self.title),
            tag: self.id.clone(),
            require_interaction: false,
        }
    }

    fn action(&self) -> AlertAction {
        AlertAction::OpenStream {
            path: format!("/stream/{}", self.id),
        }
    }

    fn accent(&self) -> Accent {
        Accent::Primary
    }

    fn headline(&self) -> String {
        format!("New Live Stream! {}", self.title)
    }
}

// ============================================================================
// Expert help request
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequestAlert {
    pub id: String,
    pub requester_name: String,
    pub topic: String,
    pub urgency: Urgency,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

impl Alert for HelpRequestAlert {
    const EVENT_NAME: &'static str = "expertHelpRequest";
    const RESPONSE_FIELD: &'static str = "newRequest";

    fn id(&self) -> &str {
        &self.id
    }

    fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty()
    }

    fn sound(&self) -> SoundCue {
        sound::help_request_alarm(self.urgency)
    }

    fn system_notification(&self) -> SystemNotification {
        SystemNotification {
            title: format!(
                "{} Help Request from {}",
                self.urgency.icon(),
                self.requester_name
            ),
            body: format!("Topic: {}", self.topic),
            tag: self.id.clone(),
            require_interaction: self.urgency == Urgency::High,
        }
    }

    fn action(&self) -> AlertAction {
        match self.stream_id.as_deref().filter(|s| !s.is_empty()) {
            Some(stream_id) => AlertAction::OpenStream {
                path: format!("/stream/{}", stream_id),
            },
            None => AlertAction::Respond {
                requester_name: self.requester_name.clone(),
            },
        }
    }

    fn accent(&self) -> Accent {
        match self.urgency {
            Urgency::Low => Accent::Blue,
            Urgency::Medium => Accent::Amber,
            Urgency::High => Accent::Red,
        }
    }

    fn headline(&self) -> String {
        format!(
            "{} Help Request - {} Priority | From: {} | Topic: {}",
            self.urgency.icon(),
            self.urgency.as_str().to_uppercase(),
            self.requester_name,
            self.topic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn live_stream_accepts_both_casings() {
        let camel = LiveStreamAlert::from_value(json!({
            "id": "s1", "title": "Live", "userId": "u1", "createdAt": "2024-10-01T12:00:00Z"
        }))
        .unwrap();
        let snake = LiveStreamAlert::from_value(json!({
            "id": "s1", "title": "Live", "user_id": "u1", "created_at": "2024-10-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(camel, snake);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(LiveStreamAlert::from_value(json!(null)).is_none());
        assert!(LiveStreamAlert::from_value(json!({})).is_none());
        assert!(LiveStreamAlert::from_value(json!({"id": "", "title": "x"})).is_none());
        assert!(LiveStreamAlert::from_value(json!({"id": "s1", "title": " "})).is_none());

        // urgency is mandatory for help requests
        assert!(HelpRequestAlert::from_value(json!({
            "id": "h1", "requesterName": "John", "topic": "t", "timestamp": "2024-10-01T12:00:00Z"
        }))
        .is_none());
        assert!(HelpRequestAlert::from_value(json!({
            "id": "h1", "requesterName": "John", "topic": "t", "urgency": "urgent",
            "timestamp": "2024-10-01T12:00:00Z"
        }))
        .is_none());
    }

    #[test]
    fn help_request_presentation_follows_urgency() {
        let mut alert = HelpRequestAlert::from_value(json!({
            "id": "h1", "requesterName": "John Student", "topic": "Docker",
            "urgency": "high", "timestamp": "2024-10-01T12:00:00Z"
        }))
        .unwrap();

        let native = alert.system_notification();
        assert_eq!(native.title, "🚨 Help Request from John Student");
        assert_eq!(native.body, "Topic: Docker");
        assert_eq!(native.tag, "h1");
        assert!(native.require_interaction);
        assert_eq!(alert.accent(), Accent::Red);
        assert_eq!(
            alert.action(),
            AlertAction::Respond {
                requester_name: "John Student".into()
            }
        );

        alert.urgency = Urgency::Low;
        alert.stream_id = Some("test-stream".into());
        assert!(!alert.system_notification().require_interaction);
        assert_eq!(alert.accent(), Accent::Blue);
        assert_eq!(
            alert.action(),
            AlertAction::OpenStream {
                path: "/stream/test-stream".into()
            }
        );
    }

    #[test]
    fn live_stream_native_notification_is_tagged_by_id() {
        let alert = LiveStreamAlert {
            id: "s9".into(),
            title: "Learning MCP".into(),
            user_id: None,
            created_at: None,
        };
        let native = alert.system_notification();
        assert_eq!(native.tag, "s9");
        assert_eq!(native.body, "Learning MCP is now live!");
    }

    #[test]
    fn urgency_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Urgency>(), Ok(Urgency::High));
        assert!("critical".parse::<Urgency>().is_err());
        assert!(Urgency::High > Urgency::Low);
    }
}
