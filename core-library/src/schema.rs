//! Persisted table layout and entity codec
//!
//! | Table            | Key                       | Entity                 |
//! |------------------|---------------------------|------------------------|
//! | `songs`          | song id                   | [`Song`]               |
//! | `favorites`      | generated id              | [`Favorite`]           |
//! | `playlists`      | generated id              | [`Playlist`]           |
//! | `playlist_songs` | `(playlist id, song id)`  | [`PlaylistMembership`] |
//! | `blobs`          | generated id              | [`Blob`]               |

use bridge_traits::store::{IndexHint, Record, RecordKey, StoreAdapter, WriteOp};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{LibraryError, Result};
use crate::models::{Blob, BlobId, Favorite, Playlist, PlaylistId, PlaylistMembership, Song, SongId};

pub const SONGS: &str = "songs";
pub const FAVORITES: &str = "favorites";
pub const PLAYLISTS: &str = "playlists";
pub const PLAYLIST_SONGS: &str = "playlist_songs";
pub const BLOBS: &str = "blobs";

/// Every table owned by the library, in reset order.
pub const ALL_TABLES: [&str; 5] = [PLAYLIST_SONGS, FAVORITES, PLAYLISTS, BLOBS, SONGS];

/// A model stored as one record of one table.
pub trait Entity: Serialize + DeserializeOwned {
    const TABLE: &'static str;

    fn key(&self) -> RecordKey;
}

impl Entity for Song {
    const TABLE: &'static str = SONGS;

    fn key(&self) -> RecordKey {
        song_key(&self.id)
    }
}

impl Entity for Favorite {
    const TABLE: &'static str = FAVORITES;

    fn key(&self) -> RecordKey {
        RecordKey::single(self.id.to_string())
    }
}

impl Entity for Playlist {
    const TABLE: &'static str = PLAYLISTS;

    fn key(&self) -> RecordKey {
        playlist_key(&self.id)
    }
}

impl Entity for PlaylistMembership {
    const TABLE: &'static str = PLAYLIST_SONGS;

    fn key(&self) -> RecordKey {
        membership_key(&self.playlist_id, &self.song_id)
    }
}

impl Entity for Blob {
    const TABLE: &'static str = BLOBS;

    fn key(&self) -> RecordKey {
        blob_key(&self.id)
    }
}

pub fn song_key(id: &SongId) -> RecordKey {
    RecordKey::single(id.as_str())
}

pub fn playlist_key(id: &PlaylistId) -> RecordKey {
    RecordKey::single(id.to_string())
}

pub fn blob_key(id: &BlobId) -> RecordKey {
    RecordKey::single(id.to_string())
}

pub fn membership_key(playlist_id: &PlaylistId, song_id: &SongId) -> RecordKey {
    RecordKey::composite([playlist_id.to_string(), song_id.to_string()])
}

pub fn encode<E: Entity>(entity: &E) -> Result<Record> {
    serde_json::to_value(entity).map_err(|e| LibraryError::Codec {
        table: E::TABLE.to_string(),
        message: e.to_string(),
    })
}

pub fn decode<E: Entity>(record: Record) -> Result<E> {
    serde_json::from_value(record).map_err(|e| LibraryError::Codec {
        table: E::TABLE.to_string(),
        message: e.to_string(),
    })
}

/// Upsert operation for `entity`.
pub fn put_op<E: Entity>(entity: &E) -> Result<WriteOp> {
    Ok(WriteOp::put(E::TABLE, entity.key(), encode(entity)?))
}

/// Point lookup decoded into an entity.
pub async fn load<E: Entity>(store: &dyn StoreAdapter, key: &RecordKey) -> Result<Option<E>> {
    store
        .get(E::TABLE, key)
        .await?
        .map(decode::<E>)
        .transpose()
}

/// Whole-table scan decoded into entities, in index order.
pub async fn load_all<E: Entity>(store: &dyn StoreAdapter, index: IndexHint) -> Result<Vec<E>> {
    store
        .scan(E::TABLE, index)
        .await?
        .into_iter()
        .map(|stored| decode::<E>(stored.record))
        .collect()
}
