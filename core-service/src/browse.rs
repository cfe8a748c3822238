//! Browse session: the filter, page and selection state behind a song list.
//!
//! A [`BrowseSession`] owns one live query. Every change to the view, search
//! text, sort key, page or page size replaces that subscription, and each
//! delivery is published on a `watch` channel as a [`BrowsePage`]. Deliveries
//! from a replaced subscription are dropped.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use core_library::{
    LiveQueryRegistry, PageRequest, Playlist, PlaylistId, Song, SongId, SongQuery, SongSortKey,
    SubscriptionHandle, ViewMode,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::Result;
use crate::CoreService;

/// The latest delivery of a browse session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowsePage {
    pub songs: Vec<Song>,
    /// Query the songs were produced by, including its window
    pub query: SongQuery,
    pub page: u32,
    pub page_size: u32,
    /// Set when the latest re-evaluation failed; `songs` then holds the
    /// previous delivery
    pub error: Option<String>,
}

struct BrowseState {
    /// Filters only; the window comes from `page` and `page_size`
    filter: SongQuery,
    page: u32,
    page_size: u32,
    handle: Option<SubscriptionHandle>,
}

impl BrowseState {
    fn windowed(&self) -> SongQuery {
        self.filter
            .clone()
            .for_page(PageRequest::new(self.page, self.page_size))
    }
}

pub struct BrowseSession {
    service: CoreService,
    registry: Arc<LiveQueryRegistry>,
    state: Mutex<BrowseState>,
    selection: StdMutex<BTreeSet<SongId>>,
    generation: Arc<AtomicU64>,
    output: Arc<watch::Sender<BrowsePage>>,
}

impl BrowseSession {
    /// Open a session on the first page of all songs.
    pub(crate) async fn open(service: CoreService) -> Result<Self> {
        let page_size = u32::try_from(service.config().page_size).unwrap_or(u32::MAX);
        let (output, _) = watch::channel(BrowsePage {
            page_size,
            ..BrowsePage::default()
        });

        let session = Self {
            registry: service.registry(),
            service,
            state: Mutex::new(BrowseState {
                filter: SongQuery::all(),
                page: 0,
                page_size,
                handle: None,
            }),
            selection: StdMutex::new(BTreeSet::new()),
            generation: Arc::new(AtomicU64::new(0)),
            output: Arc::new(output),
        };

        {
            let mut state = session.state.lock().await;
            session.resubscribe(&mut state).await?;
        }
        Ok(session)
    }

    /// Receive every page delivered from now on.
    pub fn subscribe(&self) -> watch::Receiver<BrowsePage> {
        self.output.subscribe()
    }

    pub fn current(&self) -> BrowsePage {
        self.output.borrow().clone()
    }

    /// Switch view. Clears the selection and returns to the first page.
    ///
    /// `playlist_id` is required for [`ViewMode::Playlist`] and ignored otherwise.
    pub async fn set_view(&self, view: ViewMode, playlist_id: Option<PlaylistId>) -> Result<()> {
        let mut state = self.state.lock().await;
        let filter = SongQuery {
            view,
            playlist_id: playlist_id.filter(|_| view == ViewMode::Playlist),
            ..state.filter.clone()
        };
        filter.validate()?;

        state.filter = filter;
        state.page = 0;
        self.clear_selection();
        self.resubscribe(&mut state).await
    }

    /// Change the search text and return to the first page.
    pub async fn set_search(&self, search: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.filter.search = search.into();
        state.page = 0;
        self.resubscribe(&mut state).await
    }

    pub async fn set_sort(&self, sort_key: SongSortKey) -> Result<()> {
        let mut state = self.state.lock().await;
        state.filter.sort_key = sort_key;
        self.resubscribe(&mut state).await
    }

    /// Change the page size and return to the first page. Zero is clamped to one.
    pub async fn set_page_size(&self, page_size: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        state.page_size = page_size.max(1);
        state.page = 0;
        self.resubscribe(&mut state).await
    }

    /// Advance one page if more songs follow. Returns whether the page changed.
    pub async fn next_page(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        let total = self.service.queries().count(&state.filter).await?;
        let shown = (u64::from(state.page) + 1) * u64::from(state.page_size);
        if shown >= total {
            return Ok(false);
        }

        state.page += 1;
        self.resubscribe(&mut state).await?;
        Ok(true)
    }

    /// Go back one page. Returns `false` on the first page.
    pub async fn previous_page(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.page == 0 {
            return Ok(false);
        }

        state.page -= 1;
        self.resubscribe(&mut state).await?;
        Ok(true)
    }

    /// Flip a song's membership in the selection. Returns whether it is now selected.
    pub fn toggle_selected(&self, song_id: SongId) -> bool {
        self.with_selection(|selection| {
            if selection.remove(&song_id) {
                false
            } else {
                selection.insert(song_id);
                true
            }
        })
    }

    pub fn is_selected(&self, song_id: &SongId) -> bool {
        self.with_selection(|selection| selection.contains(song_id))
    }

    /// Selected song ids in id order.
    pub fn selection(&self) -> Vec<SongId> {
        self.with_selection(|selection| selection.iter().cloned().collect())
    }

    pub fn clear_selection(&self) {
        self.with_selection(BTreeSet::clear);
    }

    /// Add every selected song to an existing playlist and clear the selection.
    pub async fn add_selection_to_playlist(&self, playlist_id: &PlaylistId) -> Result<usize> {
        let song_ids = self.selection();
        let added = self
            .service
            .add_songs_to_playlist(&song_ids, playlist_id)
            .await?;
        self.clear_selection();
        Ok(added)
    }

    /// Create a playlist holding the selected songs and clear the selection.
    pub async fn create_playlist_from_selection(&self, name: &str) -> Result<Playlist> {
        let song_ids = self.selection();
        let playlist = self
            .service
            .create_playlist_and_add(&song_ids, name)
            .await?;
        self.clear_selection();
        Ok(playlist)
    }

    /// Stop live updates. Receivers keep the last page.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = state.handle.take() {
            self.registry.unsubscribe(&handle);
        }
    }

    async fn resubscribe(&self, state: &mut BrowseState) -> Result<()> {
        if let Some(handle) = state.handle.take() {
            self.registry.unsubscribe(&handle);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let output = Arc::clone(&self.output);
        let query = state.windowed();
        let delivered = query.clone();
        let (page, page_size) = (state.page, state.page_size);

        let handle = self
            .registry
            .subscribe_songs(query, move |result| {
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }

                let next = match result {
                    Ok(songs) => BrowsePage {
                        songs,
                        query: delivered.clone(),
                        page,
                        page_size,
                        error: None,
                    },
                    Err(err) => {
                        warn!(error = %err, "Browse page refresh failed");
                        let songs = output.borrow().songs.clone();
                        BrowsePage {
                            songs,
                            query: delivered.clone(),
                            page,
                            page_size,
                            error: Some(err.to_string()),
                        }
                    }
                };
                output.send_replace(next);
            })
            .await?;

        debug!(subscription = handle.id(), page, page_size, "Browse query replaced");
        state.handle = Some(handle);
        Ok(())
    }

    fn with_selection<T>(&self, f: impl FnOnce(&mut BTreeSet<SongId>) -> T) -> T {
        match self.selection.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Drop for BrowseSession {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().handle.take() {
            self.registry.unsubscribe(&handle);
        }
    }
}
