//! Catalog mutations.
//!
//! Every operation builds its writes up front and applies them with a single
//! [`StoreAdapter::commit`], so live queries observe each mutation whole.

use bridge_traits::store::{IndexHint, StoreAdapter, WriteOp};
use bridge_traits::time::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{LibraryError, Result};
use crate::models::{
    Blob, BlobId, Favorite, Playlist, PlaylistId, PlaylistMembership, PlaylistPatch, Song, SongId,
};
use crate::schema::{self, Entity, ALL_TABLES};

/// Writes against the catalog tables.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn StoreAdapter>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn StoreAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Flip the favorite fact for `song_id`. Returns the new state.
    pub async fn toggle_favorite(&self, song_id: &SongId) -> Result<bool> {
        let existing: Vec<Favorite> = schema::load_all::<Favorite>(
            self.store.as_ref(),
            IndexHint::field("song_id"),
        )
        .await?
        .into_iter()
        .filter(|favorite| favorite.song_id == *song_id)
        .collect();

        let (ops, favorited) = if existing.is_empty() {
            (vec![schema::put_op(&Favorite::new(song_id.clone()))?], true)
        } else {
            let ops = existing
                .iter()
                .map(|favorite| WriteOp::delete(Favorite::TABLE, favorite.key()))
                .collect();
            (ops, false)
        };

        self.store.commit(ops).await?;
        info!(song_id = %song_id, favorited, "Toggled favorite");
        Ok(favorited)
    }

    /// Add songs to an existing playlist. Songs already present keep their
    /// row untouched. Returns how many memberships were created.
    pub async fn add_songs_to_playlist(
        &self,
        song_ids: &[SongId],
        playlist_id: &PlaylistId,
    ) -> Result<usize> {
        self.require_playlist(playlist_id).await?;

        let existing = self.memberships_of(playlist_id).await?;
        let ops = membership_ops(playlist_id, song_ids, &existing)?;
        let added = ops.len();

        if added > 0 {
            self.store.commit(ops).await?;
        }

        info!(
            playlist_id = %playlist_id,
            requested = song_ids.len(),
            added,
            "Added songs to playlist"
        );
        Ok(added)
    }

    /// Create a playlist and fill it in one commit.
    ///
    /// A blank `name` becomes `new playlist <unix millis>`.
    pub async fn create_playlist_and_add(
        &self,
        song_ids: &[SongId],
        name: &str,
    ) -> Result<Playlist> {
        let now = self.clock.unix_timestamp_millis();
        let name = match name.trim() {
            "" => format!("new playlist {}", now),
            trimmed => trimmed.to_string(),
        };

        let playlist = Playlist::new(name, now);
        let mut ops = vec![schema::put_op(&playlist)?];
        ops.extend(membership_ops(&playlist.id, song_ids, &[])?);

        self.store.commit(ops).await?;
        info!(
            playlist_id = %playlist.id,
            name = %playlist.name,
            songs = song_ids.len(),
            "Created playlist"
        );
        Ok(playlist)
    }

    /// Merge `patch` into the stored playlist.
    pub async fn update_playlist(
        &self,
        playlist_id: &PlaylistId,
        patch: PlaylistPatch,
    ) -> Result<Playlist> {
        let mut playlist = self.require_playlist(playlist_id).await?;
        if patch.is_empty() {
            return Ok(playlist);
        }

        patch.apply(&mut playlist);
        playlist.validate()?;

        self.store.commit(vec![schema::put_op(&playlist)?]).await?;
        info!(playlist_id = %playlist_id, "Updated playlist");
        Ok(playlist)
    }

    /// Returns how many memberships were removed.
    pub async fn remove_songs_from_playlist(
        &self,
        song_ids: &[SongId],
        playlist_id: &PlaylistId,
    ) -> Result<usize> {
        let ops: Vec<WriteOp> = song_ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .map(|song_id| {
                WriteOp::delete(
                    PlaylistMembership::TABLE,
                    schema::membership_key(playlist_id, song_id),
                )
            })
            .collect();
        if ops.is_empty() {
            return Ok(0);
        }

        let batch = self.store.commit(ops).await?;
        info!(
            playlist_id = %playlist_id,
            removed = batch.len(),
            "Removed songs from playlist"
        );
        Ok(batch.len())
    }

    /// Delete a playlist together with its memberships.
    pub async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<()> {
        let playlist = self.require_playlist(playlist_id).await?;

        let mut ops = vec![WriteOp::delete(Playlist::TABLE, playlist.key())];
        ops.extend(
            self.memberships_of(playlist_id)
                .await?
                .iter()
                .map(|membership| WriteOp::delete(PlaylistMembership::TABLE, membership.key())),
        );

        self.store.commit(ops).await?;
        info!(playlist_id = %playlist_id, "Deleted playlist");
        Ok(())
    }

    pub async fn store_blob(&self, data: Vec<u8>, mime_type: &str) -> Result<Blob> {
        if mime_type.trim().is_empty() {
            return Err(LibraryError::invalid_input(
                "mime_type",
                "Blob mime type cannot be empty",
            ));
        }

        let blob = Blob::from_bytes(data, mime_type);
        self.store.commit(vec![schema::put_op(&blob)?]).await?;
        debug!(blob_id = %blob.id, size = blob.size, "Stored blob");
        Ok(blob)
    }

    pub async fn get_blob(&self, blob_id: &BlobId) -> Result<Option<Blob>> {
        schema::load(self.store.as_ref(), &schema::blob_key(blob_id)).await
    }

    /// Bulk upsert songs. Nothing is written if any song is invalid.
    pub async fn import_songs(&self, songs: Vec<Song>) -> Result<usize> {
        for song in &songs {
            song.validate()?;
        }
        if songs.is_empty() {
            return Ok(0);
        }

        let ops = songs
            .iter()
            .map(schema::put_op)
            .collect::<Result<Vec<_>>>()?;
        let count = ops.len();

        self.store.commit(ops).await?;
        info!(count, "Imported songs");
        Ok(count)
    }

    /// Delete every library row in one batch. Returns how many were removed.
    pub async fn reset_library(&self) -> Result<usize> {
        let mut ops = Vec::new();
        for table in ALL_TABLES {
            let rows = self.store.scan(table, IndexHint::PrimaryKey).await?;
            ops.extend(rows.into_iter().map(|row| WriteOp::delete(table, row.key)));
        }
        if ops.is_empty() {
            return Ok(0);
        }

        let batch = self.store.commit(ops).await?;
        info!(removed = batch.len(), "Reset library");
        Ok(batch.len())
    }

    async fn require_playlist(&self, playlist_id: &PlaylistId) -> Result<Playlist> {
        schema::load::<Playlist>(self.store.as_ref(), &schema::playlist_key(playlist_id))
            .await?
            .ok_or_else(|| LibraryError::not_found("Playlist", playlist_id))
    }

    async fn memberships_of(&self, playlist_id: &PlaylistId) -> Result<Vec<PlaylistMembership>> {
        let all: Vec<PlaylistMembership> =
            schema::load_all(self.store.as_ref(), IndexHint::PrimaryKey).await?;
        Ok(all
            .into_iter()
            .filter(|membership| membership.playlist_id == *playlist_id)
            .collect())
    }
}

/// Writes for the songs in `song_ids` not yet in `existing`, numbered after
/// the current highest `sort_order`.
fn membership_ops(
    playlist_id: &PlaylistId,
    song_ids: &[SongId],
    existing: &[PlaylistMembership],
) -> Result<Vec<WriteOp>> {
    let present: HashMap<&SongId, i64> = existing
        .iter()
        .map(|membership| (&membership.song_id, membership.sort_order))
        .collect();
    let mut next_order = existing
        .iter()
        .map(|membership| membership.sort_order + 1)
        .max()
        .unwrap_or(0);

    let mut seen = HashSet::new();
    let mut ops = Vec::new();
    for song_id in song_ids {
        if present.contains_key(song_id) || !seen.insert(song_id) {
            continue;
        }
        let membership = PlaylistMembership {
            playlist_id: *playlist_id,
            song_id: song_id.clone(),
            sort_order: next_order,
        };
        next_order += 1;
        ops.push(schema::put_op(&membership)?);
    }
    Ok(ops)
}
