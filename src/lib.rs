//! Workspace entry crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-service`, `core-library`, `core-playback`). Host applications
//! can depend on `freqhole-workspace` and enable the documented features
//! without wiring each crate individually.

#[cfg(feature = "desktop")]
pub use core_service as service;

#[cfg(feature = "library-only")]
pub use core_library as library;

#[cfg(feature = "playback-only")]
pub use core_playback as playback;
