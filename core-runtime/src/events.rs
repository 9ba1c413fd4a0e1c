//! # Playback Event Bus
//!
//! Broadcasts playback notifications from controllers to any number of
//! listeners using `tokio::sync::broadcast`.
//!
//! Every event is a [`CoreEvent`] wrapping a [`PlaybackEvent`] or a
//! [`NavigationEvent`].
//!
//!
//! ```text
//! ┌────────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ PlaybackController ├────────>│ EventBus  ├────────────>│ UI / API   │
//! └────────────────────┘         │ (broadcast│             └────────────┘
//! ┌────────────────────┐  emit   │  channel) │  subscribe  ┌────────────┐
//! │ about-to-finish    ├────────>│           ├────────────>│ Playlist   │
//! │ handshake (engine) │         └───────────┘             └────────────┘
//! └────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut listener = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Tick { time_ms: 1500 })).ok();
//!
//! let event = listener.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback tick");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the listener was too slow and missed `n`
//!   events. Ticks are the usual victims; listeners should keep going.
//! - **`RecvError::Closed`**: every sender is gone, the controller was dropped.
//!
//! Emitting with no listeners is not an error for the controller: it ignores
//! the `SendError` and keeps running.

use bridge_traits::playback::{ErrorKind, NavigationMenu, PlaybackState, TagMap};
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Listeners that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback state machine notifications
    Playback(PlaybackEvent),
    /// Disc title and menu notifications
    Navigation(NavigationEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Navigation(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Warning { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::StateChanged { .. })
            | CoreEvent::Playback(PlaybackEvent::Finished)
            | CoreEvent::Playback(PlaybackEvent::CurrentSourceChanged { .. }) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (ticks, buffer levels)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Notifications emitted by a playback controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Public state changed.
    StateChanged {
        new_state: PlaybackState,
        old_state: PlaybackState,
    },
    /// Periodic position update while playing.
    Tick {
        /// Current position (milliseconds).
        time_ms: i64,
    },
    /// The current source played to its end.
    Finished,
    /// The engine is about to run out of data; queue the next source now.
    AboutToFinish,
    /// The position crossed the prefinish mark.
    PrefinishMarkReached {
        /// Time left until the end (milliseconds).
        remaining_ms: i64,
    },
    /// Duration of the current source changed.
    TotalTimeChanged {
        /// New duration (milliseconds), `-1` when unknown.
        total_ms: i64,
    },
    /// A queued source became current.
    CurrentSourceChanged {
        /// Redacted description of the new source.
        source: String,
    },
    /// Engine buffer fill level.
    BufferStatus { percent: u8 },
    MetaDataChanged { tags: TagMap },
    SeekableChanged { seekable: bool },
    HasVideoChanged { has_video: bool },
    /// Non-fatal engine warning.
    Warning { message: String },
    /// An error was latched and the controller entered the error state.
    Error { message: String, kind: ErrorKind },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Tick { .. } => "Playback tick",
            PlaybackEvent::Finished => "Playback finished",
            PlaybackEvent::AboutToFinish => "Playback about to finish",
            PlaybackEvent::PrefinishMarkReached { .. } => "Prefinish mark reached",
            PlaybackEvent::TotalTimeChanged { .. } => "Total time changed",
            PlaybackEvent::CurrentSourceChanged { .. } => "Current source changed",
            PlaybackEvent::BufferStatus { .. } => "Buffer status",
            PlaybackEvent::MetaDataChanged { .. } => "Metadata changed",
            PlaybackEvent::SeekableChanged { .. } => "Seekable changed",
            PlaybackEvent::HasVideoChanged { .. } => "Video availability changed",
            PlaybackEvent::Warning { .. } => "Playback warning",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Navigation Events
// ============================================================================

/// Title and menu notifications for disc sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NavigationEvent {
    /// A different title is now playing.
    TitleChanged { title: u32 },
    AvailableTitlesChanged { count: u32 },
    AvailableMenusChanged { menus: Vec<NavigationMenu> },
}

impl NavigationEvent {
    fn description(&self) -> &str {
        match self {
            NavigationEvent::TitleChanged { .. } => "Title changed",
            NavigationEvent::AvailableTitlesChanged { .. } => "Available titles changed",
            NavigationEvent::AvailableMenusChanged { .. } => "Available menus changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every `subscribe()` creates an
/// independent receiver that sees all future events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changed(new_state: PlaybackState, old_state: PlaybackState) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::StateChanged {
            new_state,
            old_state,
        })
    }

    #[test]
    fn test_emit_without_listeners_is_an_error() {
        let bus = EventBus::new(10);
        assert!(bus
            .emit(CoreEvent::Playback(PlaybackEvent::Finished))
            .is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = state_changed(PlaybackState::Playing, PlaybackState::Stopped);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Tick { time_ms: i }))
                .ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            message: "no decoder".to_string(),
            kind: ErrorKind::Normal,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let warning = CoreEvent::Playback(PlaybackEvent::Warning {
            message: "clock skew".to_string(),
        });
        assert_eq!(warning.severity(), EventSeverity::Warning);

        assert_eq!(
            state_changed(PlaybackState::Paused, PlaybackState::Playing).severity(),
            EventSeverity::Info
        );
        assert_eq!(
            CoreEvent::Playback(PlaybackEvent::Tick { time_ms: 0 }).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Navigation(NavigationEvent::TitleChanged { title: 3 });
        assert_eq!(event.description(), "Title changed");
        assert_eq!(
            CoreEvent::Playback(PlaybackEvent::AboutToFinish).description(),
            "Playback about to finish"
        );
    }

    #[test]
    fn test_event_serialization() {
        let mut tags = TagMap::new();
        tags.insert("ARTIST".to_string(), vec!["Someone".to_string()]);
        let event = CoreEvent::Playback(PlaybackEvent::MetaDataChanged { tags });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Someone"));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }


    #[test]
    fn test_tick_and_state_share_one_ordered_channel() {
        let bus = EventBus::new(8);
        let mut listener = bus.subscribe();

        bus.emit(state_changed(PlaybackState::Playing, PlaybackState::Stopped))
            .ok();
        bus.emit(CoreEvent::Playback(PlaybackEvent::Tick { time_ms: 50 }))
            .ok();
        bus.emit(CoreEvent::Playback(PlaybackEvent::Finished)).ok();

        let descriptions: Vec<_> = std::iter::from_fn(|| listener.try_recv().ok())
            .map(|event| event.description().to_string())
            .collect();
        assert_eq!(
            descriptions,
            vec!["Playback state changed", "Playback tick", "Playback finished"]
        );
    }
}
