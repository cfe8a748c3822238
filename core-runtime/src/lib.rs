//! # Core Runtime Module
//!
//! Foundational infrastructure shared by every core crate:
//! - Logging and tracing initialisation
//! - Session configuration
//! - Event bus
//!
//! Nothing here knows about songs or playlists beyond the event payloads;
//! the domain lives in `core-library` and `core-playback`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
