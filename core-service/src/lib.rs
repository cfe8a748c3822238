//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (record store,
//! media backend, HTTP, clock) into one session object. Desktop hosts enable
//! the `desktop` feature and call [`bootstrap`], which picks a SQLite or
//! in-memory store from the configuration and seeds the catalog; other hosts
//! build [`CoreDependencies`] themselves and call [`CoreService::start`].
//!
//! Every catalog mutation and player transition that goes through the façade
//! is also announced on the session [`EventBus`].

pub mod browse;
pub mod error;

pub use browse::{BrowsePage, BrowseSession};
pub use error::{CoreError, Result};

use std::future::Future;
use std::sync::Arc;

use bridge_traits::http::HttpClient;
use bridge_traits::playback::{MediaBackend, MediaEventEnvelope};
use bridge_traits::store::StoreAdapter;
use bridge_traits::time::{Clock, SystemClock};
use core_library::{
    CatalogSeeder, CatalogService, LibraryQueryService, LiveQueryRegistry, Playlist, PlaylistId,
    PlaylistPatch, SeedReport, Song, SongId, SongQuery,
};
use core_playback::{PlaybackStateMachine, PlayerState, PlayerStatus, TemplateUrlResolver};
use core_runtime::config::CoreConfig;
use core_runtime::events::{
    CoreEvent, EventBus, EventStream, LibraryEvent, PlaybackEvent, Receiver,
};
use core_runtime::logging::{redact_if_sensitive, strip_path};
use futures::{pin_mut, Stream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[cfg(feature = "desktop")]
use bridge_desktop::{ReqwestHttpClient, SqliteRecordStore};
#[cfg(feature = "desktop")]
use core_library::MemoryStore;

/// Aggregated handle to the bridge dependencies a session requires.
pub struct CoreDependencies {
    pub store: Arc<dyn StoreAdapter>,
    pub media: Arc<dyn MediaBackend>,
    /// Needed only for catalog seeding
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    pub fn new(store: Arc<dyn StoreAdapter>, media: Arc<dyn MediaBackend>) -> Self {
        Self {
            store,
            media,
            http_client: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: CoreConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    store: Arc<dyn StoreAdapter>,
    queries: LibraryQueryService,
    catalog: CatalogService,
    registry: Arc<LiveQueryRegistry>,
    player: PlaybackStateMachine,
    events: EventBus,
}

impl CoreService {
    /// Wire a session from validated configuration and bridges.
    pub fn new(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let resolver = Arc::new(TemplateUrlResolver::new(config.stream_url_template.clone()));
        let inner = ServiceInner {
            http_client: deps.http_client,
            queries: LibraryQueryService::new(deps.store.clone()),
            catalog: CatalogService::new(deps.store.clone(), deps.clock),
            registry: LiveQueryRegistry::new(deps.store.clone()),
            player: PlaybackStateMachine::new(deps.media, resolver),
            events: EventBus::new(config.event_buffer_size),
            store: deps.store,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Wire a session and seed the catalog when a seed URL is configured.
    ///
    /// Seeding problems are logged and announced but never fail startup.
    pub async fn start(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        let service = Self::new(config, deps)?;

        if service.inner.config.seed_url.is_some() {
            match service.seed_catalog().await {
                Ok(report) => info!(imported = report.imported(), "Catalog seeding finished"),
                Err(err) => warn!(error = %err, "Catalog seeding unavailable"),
            }
        }

        info!(
            persistent = service.inner.config.is_persistent(),
            page_size = service.inner.config.page_size,
            "Core service started"
        );
        Ok(service)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn store(&self) -> Arc<dyn StoreAdapter> {
        Arc::clone(&self.inner.store)
    }

    /// Read-only catalog queries.
    pub fn queries(&self) -> &LibraryQueryService {
        &self.inner.queries
    }

    pub fn registry(&self) -> Arc<LiveQueryRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    /// Player transitions only.
    pub fn playback_events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
            .filter(|event| matches!(event, CoreEvent::Playback(_)))
    }

    /// Catalog changes only.
    pub fn library_events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)))
    }

    /// Start a browse session over the catalog using the configured page size.
    pub async fn browse(&self) -> Result<BrowseSession> {
        BrowseSession::open(self.clone()).await
    }

    pub async fn query_page(&self, query: &SongQuery) -> Result<Vec<Song>> {
        Ok(self.inner.queries.query_page(query).await?)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Fetch the configured seed URL and import its songs.
    pub async fn seed_catalog(&self) -> Result<SeedReport> {
        let Some(url) = self.inner.config.seed_url.as_deref() else {
            return Ok(SeedReport::Skipped {
                reason: "no seed URL configured".to_string(),
            });
        };
        let http = self
            .inner
            .http_client
            .clone()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: "Catalog seeding needs an HTTP client. \
                          Provide one with CoreDependencies::with_http_client."
                    .to_string(),
            })?;

        info!(seed_url = %redact_if_sensitive("seed_url", url), "Seeding catalog");
        let report = CatalogSeeder::new(http, self.inner.catalog.clone())
            .seed(url)
            .await;

        let event = match &report {
            SeedReport::Imported { count } => LibraryEvent::SongsImported { count: *count },
            SeedReport::Skipped { reason } => LibraryEvent::SeedSkipped {
                reason: reason.clone(),
            },
        };
        self.emit(CoreEvent::Library(event));
        Ok(report)
    }

    pub async fn import_songs(&self, songs: Vec<Song>) -> Result<usize> {
        let count = self.inner.catalog.import_songs(songs).await?;
        self.emit(CoreEvent::Library(LibraryEvent::SongsImported { count }));
        Ok(count)
    }

    /// Returns whether the song is a favorite after the toggle.
    pub async fn toggle_favorite(&self, song_id: &SongId) -> Result<bool> {
        let favorited = self.inner.catalog.toggle_favorite(song_id).await?;
        self.emit(CoreEvent::Library(LibraryEvent::FavoriteToggled {
            song_id: song_id.to_string(),
            favorited,
        }));
        Ok(favorited)
    }

    pub async fn add_songs_to_playlist(
        &self,
        song_ids: &[SongId],
        playlist_id: &PlaylistId,
    ) -> Result<usize> {
        let added = self
            .inner
            .catalog
            .add_songs_to_playlist(song_ids, playlist_id)
            .await?;
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistSongsAdded {
            playlist_id: playlist_id.to_string(),
            added,
        }));
        Ok(added)
    }

    pub async fn create_playlist_and_add(&self, song_ids: &[SongId], name: &str) -> Result<Playlist> {
        let playlist = self
            .inner
            .catalog
            .create_playlist_and_add(song_ids, name)
            .await?;
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
            playlist_id: playlist.id.to_string(),
            name: playlist.name.clone(),
            song_count: song_ids.len(),
        }));
        Ok(playlist)
    }

    pub async fn update_playlist(
        &self,
        playlist_id: &PlaylistId,
        patch: PlaylistPatch,
    ) -> Result<Playlist> {
        let playlist = self.inner.catalog.update_playlist(playlist_id, patch).await?;
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistUpdated {
            playlist_id: playlist.id.to_string(),
            name: playlist.name.clone(),
        }));
        Ok(playlist)
    }

    pub async fn remove_songs_from_playlist(
        &self,
        song_ids: &[SongId],
        playlist_id: &PlaylistId,
    ) -> Result<usize> {
        let removed = self
            .inner
            .catalog
            .remove_songs_from_playlist(song_ids, playlist_id)
            .await?;
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistSongsRemoved {
            playlist_id: playlist_id.to_string(),
            removed,
        }));
        Ok(removed)
    }

    pub async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<()> {
        self.inner.catalog.delete_playlist(playlist_id).await?;
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistDeleted {
            playlist_id: playlist_id.to_string(),
        }));
        Ok(())
    }

    pub async fn reset_library(&self) -> Result<usize> {
        let removed = self.inner.catalog.reset_library().await?;
        self.emit(CoreEvent::Library(LibraryEvent::LibraryReset { removed }));
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn player_state(&self) -> PlayerState {
        self.inner.player.state()
    }

    pub fn subscribe_player(&self) -> watch::Receiver<PlayerState> {
        self.inner.player.subscribe()
    }

    pub async fn select_song(&self, song: Song) -> Result<()> {
        info!(
            song_id = %song.id,
            file = song.path.as_deref().map(strip_path).unwrap_or_default(),
            "Song selected"
        );
        self.track(self.inner.player.select_song(song)).await?;
        Ok(())
    }

    pub async fn toggle_play_pause(&self) -> Result<PlayerStatus> {
        self.track(self.inner.player.toggle_play_pause()).await
    }

    /// Seek by a click on a seek bar; see [`PlaybackStateMachine::seek_to_pointer`].
    pub async fn seek_to_pointer(&self, pointer_x: f64, bar_width: f64) -> Result<Option<f64>> {
        let target = self
            .track(self.inner.player.seek_to_pointer(pointer_x, bar_width))
            .await?;
        if let (Some(seconds), Some(song)) = (target, self.inner.player.state().song) {
            self.emit(CoreEvent::Playback(PlaybackEvent::Seeked {
                song_id: song.id.to_string(),
                position_ms: to_millis(seconds),
            }));
        }
        Ok(target)
    }

    pub async fn stop(&self) -> Result<()> {
        self.track(self.inner.player.stop()).await
    }

    pub fn dismiss_playback_error(&self) {
        self.inner.player.dismiss_error();
    }

    /// Apply one media backend notification.
    pub async fn handle_media_event(&self, envelope: MediaEventEnvelope) -> bool {
        let before = self.inner.player.state();
        let applied = self.inner.player.handle_event(envelope).await;
        if applied {
            self.announce_transition(&before);
        }
        applied
    }

    /// Drain a media backend event stream into the player.
    pub async fn run_media_events<S>(&self, events: S) -> usize
    where
        S: Stream<Item = MediaEventEnvelope>,
    {
        pin_mut!(events);
        let mut applied = 0;
        while let Some(envelope) = events.next().await {
            if self.handle_media_event(envelope).await {
                applied += 1;
            }
        }
        applied
    }

    async fn track<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = core_playback::Result<T>>,
    {
        let before = self.inner.player.state();
        let result = operation.await;
        self.announce_transition(&before);
        Ok(result?)
    }

    fn announce_transition(&self, before: &PlayerState) {
        let after = self.inner.player.state();
        if let Some(event) = transition_event(before, &after) {
            self.emit(CoreEvent::Playback(event));
        }
    }

    fn emit(&self, event: CoreEvent) {
        if self.inner.events.emit(event).is_err() {
            debug!("No event subscribers");
        }
    }
}

fn to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Event describing the step from `before` to `after`, if the status or load changed.
fn transition_event(before: &PlayerState, after: &PlayerState) -> Option<PlaybackEvent> {
    if before.status == after.status && before.generation == after.generation {
        return None;
    }

    let song_id = |state: &PlayerState| state.song.as_ref().map(|song| song.id.to_string());

    match after.status {
        PlayerStatus::Loading => Some(PlaybackEvent::Loading {
            song_id: song_id(after)?,
            url: after.url.clone()?,
        }),
        PlayerStatus::Playing => Some(PlaybackEvent::Playing {
            song_id: song_id(after)?,
        }),
        PlayerStatus::Paused => Some(PlaybackEvent::Paused {
            song_id: song_id(after)?,
            position_ms: to_millis(after.clamped_position()),
        }),
        PlayerStatus::Done => Some(PlaybackEvent::Completed {
            song_id: song_id(after)?,
        }),
        PlayerStatus::Idle => match &after.last_error {
            Some(message) => Some(PlaybackEvent::Error {
                song_id: song_id(before),
                message: message.clone(),
            }),
            None if before.status != PlayerStatus::Idle => Some(PlaybackEvent::Stopped),
            None => None,
        },
    }
}

/// Open a desktop session.
///
/// Installs logging from the configuration (keeping an existing subscriber
/// if one is already set), opens the SQLite store at `database_path` or an
/// in-memory store without one, and seeds the catalog when configured.
#[cfg(feature = "desktop")]
pub async fn bootstrap(config: CoreConfig, media: Arc<dyn MediaBackend>) -> Result<CoreService> {
    if let Err(err) = core_runtime::logging::init_logging(config.logging.clone()) {
        warn!(error = %err, "Keeping existing logging setup");
    }

    let store: Arc<dyn StoreAdapter> = match &config.database_path {
        Some(path) => Arc::new(SqliteRecordStore::new(path.clone()).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let http = ReqwestHttpClient::new()?;

    let deps = CoreDependencies::new(store, media).with_http_client(Arc::new(http));
    CoreService::start(config, deps).await
}
