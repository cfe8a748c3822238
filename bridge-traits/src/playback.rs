//! Media backend bridge trait and supporting event types.
//!
//! The host owns the actual media element (an HTML audio element, a native
//! audio engine, ...). The core drives it through [`MediaBackend`] commands
//! and consumes its asynchronous notifications as [`MediaEventEnvelope`]s.
//!
//! Every load is tagged with a [`LoadGeneration`]. Backends must stamp each
//! event with the generation of the load that produced it so the core can
//! discard events that belong to a superseded load.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Monotonic counter identifying one load of one media source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadGeneration(pub u64);

impl LoadGeneration {
    /// The generation following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LoadGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Notification emitted by the media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEvent {
    /// Playback actually started or resumed.
    Playing,
    /// Playback paused (from any source, including OS media keys).
    Paused,
    /// Periodic position report.
    TimeUpdate { position_secs: f64 },
    /// Reached the natural end of the media.
    Ended,
    /// Load was aborted before completion.
    Aborted,
    /// Media failed to load or decode.
    Error { message: String },
}

/// A [`MediaEvent`] stamped with the load it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEventEnvelope {
    pub generation: LoadGeneration,
    pub event: MediaEvent,
}

impl MediaEventEnvelope {
    pub fn new(generation: LoadGeneration, event: MediaEvent) -> Self {
        Self { generation, event }
    }
}

/// Host media element driven by the playback state machine.
///
/// Commands return once the backend has accepted them; the resulting state
/// change is reported separately through the event stream.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Point the media element at a new source, superseding any previous one.
    async fn load(&self, url: &str, generation: LoadGeneration) -> Result<()>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the current position.
    async fn pause(&self) -> Result<()>;

    /// Jump to an absolute position in seconds.
    async fn seek(&self, seconds: f64) -> Result<()>;

    /// Current playback position in seconds.
    async fn current_time(&self) -> Result<f64>;
}
