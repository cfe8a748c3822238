//! # Playback Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The media backend rejected a command or reported a failure.
    #[error("Playback backend error: {0}")]
    Backend(String),

    /// No playable URL could be derived for a song.
    #[error("Cannot resolve a playable URL for song {song_id}: {reason}")]
    UrlResolution { song_id: String, reason: String },

    /// Attempted operation when no song is loaded.
    #[error("No song loaded")]
    NoSongLoaded,

    /// Seek target is not a usable position.
    #[error("Invalid seek position: {0}")]
    InvalidSeek(f64),
}

impl PlaybackError {
    /// Returns `true` if the failure came from the media element itself.
    pub fn is_backend(&self) -> bool {
        matches!(self, PlaybackError::Backend(_))
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        PlaybackError::Backend(err.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_failures_become_backend_errors() {
        let err: PlaybackError = BridgeError::MediaError("decode failed".into()).into();
        assert!(err.is_backend());
        assert!(err.to_string().contains("decode failed"));
    }
}
