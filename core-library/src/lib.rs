//! # Library Module
//!
//! The reactive local-data layer of the media library.
//!
//! ## Overview
//!
//! - [`query`]: filtered, sorted, paginated song queries over three views
//!   (all songs, favorites, one playlist)
//! - [`live`]: live queries that re-evaluate when the tables they depend on
//!   change, pushing fresh results to subscribers
//! - [`catalog`]: favorite toggles, playlist creation and membership, playlist
//!   updates, blobs, bulk import and reset
//! - [`seed`]: one-shot catalog population from an HTTP endpoint
//! - [`display`]: song titles and durations for presentation
//!
//! All persistence goes through a [`StoreAdapter`](bridge_traits::store::StoreAdapter);
//! [`adapters::MemoryStore`] is the in-process implementation.

pub mod adapters;
pub mod catalog;
pub mod display;
pub mod error;
pub mod live;
pub mod models;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod seed;

pub use adapters::MemoryStore;
pub use catalog::CatalogService;
pub use display::{format_time, SongDisplay};
pub use error::{LibraryError, Result};
pub use live::{LiveQuery, LiveQueryRegistry, LiveResult, SubscriptionHandle};
pub use models::{
    Blob, BlobId, Favorite, FavoriteId, Playlist, PlaylistId, PlaylistMembership, PlaylistPatch,
    Song, SongId,
};
pub use pagination::{Page, PageRequest};
pub use query::{LibraryQueryService, SongQuery, SongSortKey, ViewMode};
pub use seed::{CatalogSeeder, SeedReport};
