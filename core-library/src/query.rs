//! Song catalog query engine.
//!
//! A query resolves the candidate id set for its view (all songs, favorites,
//! or one playlist), scans songs in sort order, keeps candidates matching the
//! search text, and only then applies the `offset`/`limit` window. Filtering
//! before windowing keeps page boundaries stable for a given snapshot.

use bridge_traits::store::{IndexHint, StoreAdapter};
use futures::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::models::{Favorite, Playlist, PlaylistId, PlaylistMembership, Song, SongId};
use crate::pagination::{Page, PageRequest};
use crate::schema::{self, FAVORITES, PLAYLIST_SONGS, SONGS};

/// Which slice of the catalog a query browses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    All,
    Favorites,
    Playlist,
}

impl FromStr for ViewMode {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "favorites" => Ok(Self::Favorites),
            "playlist" => Ok(Self::Playlist),
            other => Err(LibraryError::invalid_query(
                "view",
                format!("Unknown view '{}'", other),
            )),
        }
    }
}

/// Song field a query is ordered by. Ties always break by ascending id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongSortKey {
    Id,
    #[default]
    Title,
    Artist,
    Album,
    DateAdded,
    Seconds,
    BasePath,
    Path,
    Url,
}

impl SongSortKey {
    /// Record field backing this key.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::DateAdded => "date_added",
            Self::Seconds => "seconds",
            Self::BasePath => "base_path",
            Self::Path => "path",
            Self::Url => "url",
        }
    }

    fn index_hint(&self) -> IndexHint {
        match self {
            Self::Id => IndexHint::PrimaryKey,
            other => IndexHint::field(other.field_name()),
        }
    }
}

impl FromStr for SongSortKey {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "artist" => Ok(Self::Artist),
            "album" => Ok(Self::Album),
            "date_added" => Ok(Self::DateAdded),
            "seconds" => Ok(Self::Seconds),
            "base_path" => Ok(Self::BasePath),
            "path" => Ok(Self::Path),
            "url" => Ok(Self::Url),
            other => Err(LibraryError::invalid_query(
                "sort_key",
                format!("'{}' is not a sortable song field", other),
            )),
        }
    }
}

impl fmt::Display for SongSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Inputs of one page query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongQuery {
    pub view: ViewMode,
    /// Required when `view` is [`ViewMode::Playlist`]
    pub playlist_id: Option<PlaylistId>,
    /// Case-insensitive substring; empty matches everything
    pub search: String,
    pub sort_key: SongSortKey,
    pub offset: usize,
    pub limit: usize,
}

impl Default for SongQuery {
    fn default() -> Self {
        Self {
            view: ViewMode::All,
            playlist_id: None,
            search: String::new(),
            sort_key: SongSortKey::default(),
            offset: 0,
            limit: PageRequest::default().limit(),
        }
    }
}

impl SongQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn favorites() -> Self {
        Self {
            view: ViewMode::Favorites,
            ..Self::default()
        }
    }

    pub fn playlist(playlist_id: PlaylistId) -> Self {
        Self {
            view: ViewMode::Playlist,
            playlist_id: Some(playlist_id),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn sorted_by(mut self, sort_key: SongSortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn for_page(self, request: PageRequest) -> Self {
        self.window(request.offset(), request.limit())
    }

    pub fn validate(&self) -> Result<()> {
        if self.view == ViewMode::Playlist && self.playlist_id.is_none() {
            return Err(LibraryError::invalid_query(
                "playlist_id",
                "Playlist view requires a playlist id",
            ));
        }
        Ok(())
    }

    /// Tables whose mutations can change this query's result.
    pub fn dependencies(&self) -> Vec<&'static str> {
        match self.view {
            ViewMode::All => vec![SONGS],
            ViewMode::Favorites => vec![SONGS, FAVORITES],
            ViewMode::Playlist => vec![SONGS, PLAYLIST_SONGS],
        }
    }
}

fn matches_search(song: &Song, needle: &str) -> bool {
    needle.is_empty()
        || song
            .searchable_fields()
            .any(|field| field.to_lowercase().contains(needle))
}

/// Read-only access to the catalog.
#[derive(Clone)]
pub struct LibraryQueryService {
    store: Arc<dyn StoreAdapter>,
}

impl LibraryQueryService {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    /// One window of songs for `query`.
    pub async fn query_page(&self, query: &SongQuery) -> Result<Vec<Song>> {
        query.validate()?;
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let songs = self.filtered(query).await?;
        Ok(songs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    /// Number of songs matching `query`, ignoring its window.
    pub async fn count(&self, query: &SongQuery) -> Result<u64> {
        query.validate()?;
        Ok(self.filtered(query).await?.len() as u64)
    }

    /// Window of songs plus the total they were drawn from.
    pub async fn query(&self, query: &SongQuery) -> Result<Page<Song>> {
        query.validate()?;
        let songs = self.filtered(query).await?;
        let total = songs.len() as u64;
        let items = songs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        Ok(Page::window(items, total, query.offset, query.limit))
    }

    /// Lazily page through every song matching `query`, starting at its offset.
    pub fn stream_songs(&self, query: SongQuery) -> Result<BoxStream<'static, Result<Song>>> {
        query.validate()?;

        const STREAM_PAGE_SIZE: usize = 200;

        let offset = query.offset;
        let initial_state = SongStreamState {
            service: self.clone(),
            query: query.window(offset, STREAM_PAGE_SIZE),
            buffer: VecDeque::new(),
            done: false,
        };

        let stream = stream::try_unfold(initial_state, |mut state| async move {
            loop {
                if let Some(song) = state.buffer.pop_front() {
                    return Ok(Some((song, state)));
                }

                if state.done {
                    return Ok(None);
                }

                let songs = state.service.query_page(&state.query).await?;
                state.done = songs.len() < state.query.limit;
                state.query.offset += songs.len();
                state.buffer = VecDeque::from(songs);
            }
        });

        Ok(Box::pin(stream))
    }

    pub async fn get_song(&self, song_id: &SongId) -> Result<Option<Song>> {
        schema::load(self.store.as_ref(), &schema::song_key(song_id)).await
    }

    /// All playlists ordered by name.
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        schema::load_all(self.store.as_ref(), IndexHint::field("name")).await
    }

    pub async fn get_playlist(&self, playlist_id: &PlaylistId) -> Result<Option<Playlist>> {
        schema::load(self.store.as_ref(), &schema::playlist_key(playlist_id)).await
    }

    /// Members of a playlist in `sort_order`.
    pub async fn playlist_memberships(
        &self,
        playlist_id: &PlaylistId,
    ) -> Result<Vec<PlaylistMembership>> {
        let memberships: Vec<PlaylistMembership> =
            schema::load_all(self.store.as_ref(), IndexHint::field("sort_order")).await?;
        Ok(memberships
            .into_iter()
            .filter(|m| m.playlist_id == *playlist_id)
            .collect())
    }

    pub async fn favorite_song_ids(&self) -> Result<HashSet<SongId>> {
        let favorites: Vec<Favorite> =
            schema::load_all(self.store.as_ref(), IndexHint::field("song_id")).await?;
        Ok(favorites.into_iter().map(|f| f.song_id).collect())
    }

    pub async fn is_favorite(&self, song_id: &SongId) -> Result<bool> {
        Ok(self.favorite_song_ids().await?.contains(song_id))
    }

    /// `None` means every song is a candidate.
    async fn candidates(&self, query: &SongQuery) -> Result<Option<HashSet<SongId>>> {
        match query.view {
            ViewMode::All => Ok(None),
            ViewMode::Favorites => Ok(Some(self.favorite_song_ids().await?)),
            ViewMode::Playlist => {
                let playlist_id = query.playlist_id.ok_or_else(|| {
                    LibraryError::invalid_query("playlist_id", "Playlist view requires a playlist id")
                })?;
                let members = self.playlist_memberships(&playlist_id).await?;
                Ok(Some(members.into_iter().map(|m| m.song_id).collect()))
            }
        }
    }

    async fn filtered(&self, query: &SongQuery) -> Result<Vec<Song>> {
        let candidates = self.candidates(query).await?;
        if candidates.as_ref().is_some_and(HashSet::is_empty) {
            return Ok(Vec::new());
        }

        let songs: Vec<Song> =
            schema::load_all(self.store.as_ref(), query.sort_key.index_hint()).await?;
        let needle = query.search.to_lowercase();

        let matched: Vec<Song> = songs
            .into_iter()
            .filter(|song| {
                candidates
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&song.id))
            })
            .filter(|song| matches_search(song, &needle))
            .collect();

        debug!(
            view = ?query.view,
            sort_key = %query.sort_key,
            matched = matched.len(),
            "Evaluated song query"
        );

        Ok(matched)
    }
}

struct SongStreamState {
    service: LibraryQueryService,
    query: SongQuery,
    buffer: VecDeque<Song>,
    done: bool,
}
