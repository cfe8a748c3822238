//! Player state published to the UI.

use bridge_traits::playback::LoadGeneration;
use core_library::Song;
use serde::{Deserialize, Serialize};

/// Lifecycle of the single active track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Nothing loaded, or the last load failed or was aborted.
    #[default]
    Idle,
    /// A song was selected and the backend has not started it yet.
    Loading,
    Playing,
    Paused,
    /// The song reached its natural end.
    Done,
}

impl PlayerStatus {
    /// Label of the play/pause control for this status, if it is actionable.
    pub fn toggle_label(self) -> Option<&'static str> {
        match self {
            PlayerStatus::Playing => Some("pause"),
            PlayerStatus::Paused | PlayerStatus::Done => Some("play"),
            PlayerStatus::Idle | PlayerStatus::Loading => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, PlayerStatus::Playing | PlayerStatus::Paused)
    }
}

/// Snapshot of the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub status: PlayerStatus,
    pub song: Option<Song>,
    pub url: Option<String>,
    /// Last position reported by the backend, unclamped.
    pub position_secs: f64,
    /// Generation of the load this state belongs to.
    pub generation: LoadGeneration,
    /// Dismissible description of the last backend failure.
    pub last_error: Option<String>,
}

impl PlayerState {
    /// Duration of the current song, when known.
    pub fn duration(&self) -> Option<f64> {
        self.song.as_ref().and_then(Song::duration)
    }

    /// Position clamped to `[0, duration]`.
    ///
    /// Without a known duration only the lower bound applies.
    pub fn clamped_position(&self) -> f64 {
        let position = if self.position_secs.is_finite() {
            self.position_secs.max(0.0)
        } else {
            0.0
        };
        match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Progress through the current song in percent, `None` without a duration.
    pub fn progress_percent(&self) -> Option<f64> {
        self.duration()
            .map(|duration| self.clamped_position() / duration * 100.0)
    }
}
