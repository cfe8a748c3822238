//! # Host Bridge Traits
//!
//! Contracts between the media-library core and the host it runs in.
//!
//! ## Traits
//!
//! ### Persistence
//! - [`StoreAdapter`](store::StoreAdapter) - Table-oriented record store with
//!   atomic batch commits and mutation notifications
//!
//! ### Media
//! - [`MediaBackend`](playback::MediaBackend) - The host media element driven
//!   by the playback state machine
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP used for catalog seeding
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits report failures as [`BridgeError`](error::BridgeError).
//! Implementations convert host-specific failures (SQL errors, media element
//! errors, transport errors) into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so adapters can be shared across tokio
//! tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod playback;
pub mod store;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{LoadGeneration, MediaBackend, MediaEvent, MediaEventEnvelope};
pub use store::{
    IndexHint, MutationBatch, MutationKind, MutationListener, MutationNotice, Record, RecordKey,
    StoreAdapter, StoredRecord, WriteOp,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
