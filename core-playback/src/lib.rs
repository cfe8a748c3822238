//! # Playback Module
//!
//! The single active-track lifecycle of a session.
//!
//! ## Overview
//!
//! - [`machine`]: the playback state machine driving a host
//!   [`MediaBackend`](bridge_traits::playback::MediaBackend)
//! - [`state`]: the published [`PlayerState`] with progress math
//! - [`resolver`]: playable URL resolution for catalog songs

pub mod error;
pub mod machine;
pub mod resolver;
pub mod state;

pub use error::{PlaybackError, Result};
pub use machine::PlaybackStateMachine;
pub use resolver::{SongUrlResolver, TemplateUrlResolver, DEFAULT_STREAM_TEMPLATE};
pub use state::{PlayerState, PlayerStatus};
