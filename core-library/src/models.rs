//! Domain models for the media library
//!
//! Every persisted entity serializes to a JSON record in the store; optional
//! fields are omitted when absent so scans treat them as missing.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Opaque song identifier assigned by the catalog source.
///
/// Catalog feeds send numeric or string ids; both are stored as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SongId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SongId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier for a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaylistId(pub Uuid);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a favorite record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteId(pub Uuid);

impl FavoriteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FavoriteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobId(pub Uuid);

impl BlobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A playable audio track in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// When the catalog source first saw the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    /// Library root the path lives under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Client-scoped stream location, when the catalog provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Song {
    pub fn new(id: impl Into<SongId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            artist: None,
            album: None,
            date_added: None,
            seconds: None,
            base_path: None,
            path: None,
            url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_seconds(mut self, seconds: f64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub fn with_path(mut self, base_path: impl Into<String>, path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self.path = Some(path.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// String-typed fields searched by free-text queries.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [
            &self.title,
            &self.artist,
            &self.album,
            &self.date_added,
            &self.base_path,
            &self.path,
            &self.url,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
    }

    /// Duration, when known and positive.
    pub fn duration(&self) -> Option<f64> {
        self.seconds.filter(|s| s.is_finite() && *s > 0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(LibraryError::invalid_input("id", "Song id cannot be empty"));
        }

        if let Some(seconds) = self.seconds {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(LibraryError::invalid_input(
                    "seconds",
                    format!("Duration must be a non-negative number, got {}", seconds),
                ));
            }
        }

        Ok(())
    }
}

/// User-created playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover image blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<BlobId>,
    /// Creation time (Unix millis)
    pub created_at: i64,
}

impl Playlist {
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: PlaylistId::new(),
            name: name.into(),
            description: None,
            cover: None,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LibraryError::invalid_input(
                "name",
                "Playlist name cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Partial playlist update. `None` leaves a field untouched; for the
/// optional fields `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Option<BlobId>>,
}

impl PlaylistPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn cover(mut self, cover: Option<BlobId>) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.cover.is_none()
    }

    /// Merge the patch into `playlist`.
    pub fn apply(&self, playlist: &mut Playlist) {
        if let Some(name) = &self.name {
            playlist.name = name.clone();
        }
        if let Some(description) = &self.description {
            playlist.description = description.clone();
        }
        if let Some(cover) = self.cover {
            playlist.cover = cover;
        }
    }
}

/// A song's place in a playlist. Unique per `(playlist_id, song_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMembership {
    pub playlist_id: PlaylistId,
    pub song_id: SongId,
    /// Ordering hint within the playlist
    pub sort_order: i64,
}

/// Presence of this record marks the song as favorited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub song_id: SongId,
}

impl Favorite {
    pub fn new(song_id: SongId) -> Self {
        Self {
            id: FavoriteId::new(),
            song_id,
        }
    }
}

/// Raw binary content (e.g. a playlist cover image)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub id: BlobId,
    /// SHA-256 of `data`, lowercase hex
    pub hash: String,
    pub size: u64,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn from_bytes(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let hash = format!("{:x}", Sha256::digest(&data));
        Self {
            id: BlobId::new(),
            hash,
            size: data.len() as u64,
            mime_type: mime_type.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn song_id_accepts_numbers_and_strings() {
        let song: Song = serde_json::from_value(json!({ "id": 42, "title": "x" })).unwrap();
        assert_eq!(song.id.as_str(), "42");

        let song: Song = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        assert_eq!(song.id, SongId::from("abc"));
        assert!(song.title.is_none());
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let value = serde_json::to_value(Song::new("1").with_title("A")).unwrap();
        assert_eq!(value, json!({ "id": "1", "title": "A" }));
    }

    #[test]
    fn song_validation_rejects_negative_duration() {
        assert!(Song::new("1").with_seconds(12.5).validate().is_ok());
        assert!(Song::new("1").with_seconds(-1.0).validate().is_err());
        assert!(Song::new("1").with_seconds(f64::NAN).validate().is_err());
        assert!(Song::new(" ").validate().is_err());
    }

    #[test]
    fn duration_ignores_zero() {
        assert_eq!(Song::new("1").with_seconds(0.0).duration(), None);
        assert_eq!(Song::new("1").with_seconds(90.0).duration(), Some(90.0));
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut playlist = Playlist::new("mix", 0);
        playlist.description = Some("old".into());

        PlaylistPatch::new().name("road trip").apply(&mut playlist);
        assert_eq!(playlist.name, "road trip");
        assert_eq!(playlist.description.as_deref(), Some("old"));

        PlaylistPatch::new().description(None).apply(&mut playlist);
        assert!(playlist.description.is_none());
        assert!(PlaylistPatch::new().is_empty());
    }

    #[test]
    fn blob_hashes_content() {
        let blob = Blob::from_bytes(b"abc".to_vec(), "image/png");
        assert_eq!(blob.size, 3);
        assert_eq!(
            blob.hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
