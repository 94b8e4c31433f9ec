//! In-process publish/subscribe for locally dispatched notification events.
//!
//! This is the second delivery path next to polling: anything able to reach the
//! bus (a test trigger, another component) can hand a payload to the widgets
//! listening for its event name.

use chrono::Utc;
use tokio::sync::broadcast;

use crate::notifier::payload::{Alert, HelpRequestAlert, LiveStreamAlert, Urgency};

const BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalEvent {
    pub name: String,
    pub detail: Option<serde_json::Value>,
}

impl LocalEvent {
    /// Detail worth forwarding: present, not null, not an empty object.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.detail.as_ref().filter(|d| match d {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            _ => true,
        })
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LocalEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Returns the number of listeners that received the event.
    pub fn dispatch(&self, name: &str, detail: Option<serde_json::Value>) -> usize {
        let event = LocalEvent {
            name: name.to_string(),
            detail,
        };
        // No listener registered is not an error
        self.tx.send(event).unwrap_or(0)
    }

    pub fn dispatch_alert<A: Alert>(&self, alert: &A) -> usize {
        match serde_json::to_value(alert) {
            Ok(detail) => self.dispatch(A::EVENT_NAME, Some(detail)),
            Err(e) => {
                tracing::warn!("Failed to encode {} event: {}", A::EVENT_NAME, e);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LocalEvent> {
        self.tx.subscribe()
    }
}

/// Payload of the manual "Test Notification" trigger.
pub fn test_live_stream() -> LiveStreamAlert {
    LiveStreamAlert {
        id: format!("test-{}", Utc::now().timestamp_millis()),
        title: "Test Stream: Learning MCP with AI Agents".to_string(),
        user_id: Some("test-user".to_string()),
        created_at: Some(Utc::now()),
    }
}

/// Payload of the manual "Test Expert Alert" trigger.
pub fn test_help_request(urgency: Urgency) -> HelpRequestAlert {
    let topic = match urgency {
        Urgency::High => "URGENT: AWS Deployment Failing",
        Urgency::Medium => "Question about Docker Configuration",
        Urgency::Low => "General AI Learning Question",
    };
    HelpRequestAlert {
        id: format!("help-test-{}", Utc::now().timestamp_millis()),
        requester_name: "John Student".to_string(),
        topic: topic.to_string(),
        urgency,
        timestamp: Utc::now(),
        stream_id: Some("test-stream".to_string()),
    }
}
