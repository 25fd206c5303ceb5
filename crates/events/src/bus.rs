//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.
//! Events are only ever published after the transaction that produced them
//! has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subhub_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const SUBTITLES_ADDED: &str = "subtitles.added";
pub const SUBTITLES_PUBLISHED: &str = "subtitles.published";
pub const SUBTITLES_ROLLED_BACK: &str = "subtitles.rolled_back";
pub const TASK_CREATED: &str = "task.created";
pub const TASK_COMPLETED: &str = "task.completed";
pub const TASK_SENT_BACK: &str = "task.sent_back";
pub const VIDEO_CACHE_INVALIDATED: &str = "video.cache_invalidated";
pub const WRITELOCK_RELEASED: &str = "writelock.released";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened to a video, language or task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"subtitles.published"`.
    pub event_type: String,

    pub video_id: Option<String>,

    pub language_code: Option<String>,

    /// Id of the user that triggered the event, if any.
    pub actor_user_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            video_id: None,
            language_code: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_video(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Every subscriber independently receives each published [`DomainEvent`].
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(event_type = %event.event_type, "Publishing event");
        // A send error only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            DomainEvent::new(SUBTITLES_ADDED)
                .with_video("abcdefghijkl")
                .with_language("en")
                .with_actor(Some(7))
                .with_payload(serde_json::json!({"version_number": 3})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, SUBTITLES_ADDED);
        assert_eq!(received.video_id.as_deref(), Some("abcdefghijkl"));
        assert_eq!(received.language_code.as_deref(), Some("en"));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload["version_number"], 3);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DomainEvent::new(TASK_CREATED));

        assert_eq!(rx1.recv().await.unwrap().event_type, TASK_CREATED);
        assert_eq!(rx2.recv().await.unwrap().event_type, TASK_CREATED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(DomainEvent::new(WRITELOCK_RELEASED));
    }
}
