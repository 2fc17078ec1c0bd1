//! View events and the EventBus that distributes them
//!
//! Controllers publish what happened (phase changes, renders, notices) instead
//! of touching any front end directly. The CLI prints notices from the bus;
//! tests subscribe and assert on the sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events published by list controllers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewEvent {
    /// Controller moved to a new phase
    PhaseChanged {
        screen: String,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },

    /// Row model reconciled with a new visible slice
    Rendered {
        screen: String,
        rows: usize,
        page: u64,
        total_pages: u64,
        timestamp: DateTime<Utc>,
    },

    /// Toast-style notification
    Notice {
        screen: String,
        level: NoticeLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Backend rejected the session; the front end should send the user to login
    AuthRequired {
        screen: String,
        timestamp: DateTime<Utc>,
    },

    /// A play action resolved an audio URL
    PlayRequested {
        screen: String,
        record_id: i64,
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// Multipart upload progress, in bytes
    UploadProgress {
        screen: String,
        sent: u64,
        total: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ViewEvent {
    pub fn notice(screen: &str, level: NoticeLevel, message: impl Into<String>) -> Self {
        ViewEvent::Notice {
            screen: screen.to_string(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn screen(&self) -> &str {
        match self {
            ViewEvent::PhaseChanged { screen, .. }
            | ViewEvent::Rendered { screen, .. }
            | ViewEvent::Notice { screen, .. }
            | ViewEvent::AuthRequired { screen, .. }
            | ViewEvent::PlayRequested { screen, .. }
            | ViewEvent::UploadProgress { screen, .. } => screen,
        }
    }
}

/// Event distribution bus over tokio::broadcast
///
/// Slow subscribers lag and lose old events rather than blocking the
/// controller.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ViewEvent>,
}

impl EventBus {
    /// Bus holding at most `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ViewEvent,
    ) -> Result<usize, broadcast::error::SendError<ViewEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ViewEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(8);
        assert!(bus.emit(ViewEvent::notice("songs", NoticeLevel::Info, "hi")).is_err());
        bus.emit_lossy(ViewEvent::notice("songs", NoticeLevel::Info, "hi"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(ViewEvent::notice("singers", NoticeLevel::Error, "boom"))
            .unwrap();

        match rx.recv().await.unwrap() {
            ViewEvent::Notice { screen, level, message, .. } => {
                assert_eq!(screen, "singers");
                assert_eq!(level, NoticeLevel::Error);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..3 {
            bus.emit_lossy(ViewEvent::notice("songs", NoticeLevel::Info, format!("n{}", i)));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        match rx.recv().await.unwrap() {
            ViewEvent::Notice { message, .. } => assert_eq!(message, "n1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ViewEvent::AuthRequired {
            screen: "users".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AuthRequired");
        assert_eq!(event.screen(), "users");
    }
}
