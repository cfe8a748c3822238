//! # Event Bus System
//!
//! Session-wide notifications over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`LibraryEvent`] for catalog changes and
//!   [`PlaybackEvent`] for player transitions, wrapped in [`CoreEvent`]
//! - **EventBus**: central broadcast channel
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Live queries are the way to observe *data*; the bus carries *facts about
//! what happened* (a playlist was created, a song started) for toasts,
//! analytics and logging front ends.
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐    subscribe    ┌────────────┐
//! │ CoreService  ├──────────────>│ EventBus  ├────────────────>│ Subscriber │
//! └──────────────┘               │ (broadcast│                 └────────────┘
//!                                │  channel) ├────────────────>┌────────────┐
//!                                └───────────┘                 │ Subscriber │
//!                                                              └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
//!     playlist_id: "c0ffee".to_string(),
//!     name: "mix".to_string(),
//!     song_count: 2,
//! }))
//! .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Playlist created");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; it keeps receiving newer events.
//! - **`RecvError::Closed`**: every sender was dropped; treat it as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Library(LibraryEvent),
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::SeedSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Library(
                LibraryEvent::SongsImported { .. }
                | LibraryEvent::PlaylistCreated { .. }
                | LibraryEvent::PlaylistDeleted { .. }
                | LibraryEvent::LibraryReset { .. },
            ) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Library Events
// ============================================================================

/// Catalog changes, emitted after the mutation committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Songs were bulk-imported (seeding or an explicit import).
    SongsImported {
        count: usize,
    },
    /// Catalog seeding did not run to completion; the catalog is unchanged.
    SeedSkipped {
        reason: String,
    },
    FavoriteToggled {
        song_id: String,
        /// State after the toggle.
        favorited: bool,
    },
    PlaylistCreated {
        playlist_id: String,
        name: String,
        /// Songs added together with the playlist.
        song_count: usize,
    },
    /// Songs were added to an existing playlist.
    PlaylistSongsAdded {
        playlist_id: String,
        /// Songs that were not already members.
        added: usize,
    },
    PlaylistSongsRemoved {
        playlist_id: String,
        removed: usize,
    },
    /// Name, description or cover changed.
    PlaylistUpdated {
        playlist_id: String,
        name: String,
    },
    PlaylistDeleted {
        playlist_id: String,
    },
    /// Every table was cleared.
    LibraryReset {
        removed: usize,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::SongsImported { .. } => "Songs imported",
            LibraryEvent::SeedSkipped { .. } => "Catalog seeding skipped",
            LibraryEvent::FavoriteToggled { .. } => "Favorite toggled",
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
            LibraryEvent::PlaylistSongsAdded { .. } => "Songs added to playlist",
            LibraryEvent::PlaylistSongsRemoved { .. } => "Songs removed from playlist",
            LibraryEvent::PlaylistUpdated { .. } => "Playlist updated",
            LibraryEvent::PlaylistDeleted { .. } => "Playlist deleted",
            LibraryEvent::LibraryReset { .. } => "Library reset",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Player transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A song was selected and is loading.
    Loading {
        song_id: String,
        url: String,
    },
    /// Playback started or resumed.
    Playing {
        song_id: String,
    },
    Paused {
        song_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// The song reached its natural end.
    Completed {
        song_id: String,
    },
    Seeked {
        song_id: String,
        position_ms: u64,
    },
    /// Playback was abandoned and the player is idle.
    Stopped,
    /// The media backend failed; the player is idle.
    Error {
        song_id: Option<String>,
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading song",
            PlaybackEvent::Playing { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Completed { .. } => "Song finished",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by every publisher and subscriber of a session.
///
/// Cloning is cheap; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    ///
    /// A subscriber that falls further behind receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

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
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered event that passes the filter, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
