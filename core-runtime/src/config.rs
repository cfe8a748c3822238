//! # Core Configuration Module
//!
//! Builder-based configuration for a media library session.
//!
//! ## Overview
//!
//! `CoreConfig` collects the settings a session needs before it opens the
//! store: where the catalog lives, where songs stream from, how large pages
//! are and how logging is set up. The builder validates eagerly so a bad
//! configuration fails at startup with an actionable message instead of
//! surfacing later as a broken query or an unplayable song.
//!
//! ## Defaults
//!
//! | Setting | Default |
//! |---|---|
//! | `database_path` | none: in-memory store |
//! | `seed_url` | none: start with the stored catalog |
//! | `stream_url_template` | `http://localhost:3030/song/{id}` |
//! | `page_size` | 50 |
//! | `event_buffer_size` | 100 |
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/freqhole/library.db")
//!     .seed_url("http://localhost:3030/songs.json")
//!     .page_size(100)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.page_size, 100);
//! ```
//!
//! ```rust
//! use core_runtime::config::CoreConfig;
//!
//! let err = CoreConfig::builder()
//!     .stream_url_template("http://localhost:3030/song")
//!     .build()
//!     .unwrap_err();
//! assert!(err.to_string().contains("{id}"));
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use std::path::PathBuf;

/// Default stream location; `{id}` is replaced by the song id.
pub const DEFAULT_STREAM_URL_TEMPLATE: &str = "http://localhost:3030/song/{id}";

/// Default number of songs per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a browse session may request.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Settings for one media library session.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// SQLite database file; `None` keeps the catalog in memory
    pub database_path: Option<PathBuf>,

    /// Endpoint returning a JSON array of songs, fetched once at startup
    pub seed_url: Option<String>,

    /// Stream URL template containing `{id}`
    pub stream_url_template: String,

    /// Songs per page for browse sessions
    pub page_size: usize,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub logging: LoggingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            seed_url: None,
            stream_url_template: DEFAULT_STREAM_URL_TEMPLATE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Whether the catalog is persisted to disk.
    pub fn is_persistent(&self) -> bool {
        self.database_path.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The database path, when set, is not empty
    /// - The seed URL, when set, is http(s)
    /// - The stream template contains `{id}`
    /// - The page size is between 1 and [`MAX_PAGE_SIZE`]
    /// - The event buffer is non-zero
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Database path cannot be empty. Omit it to use an in-memory store."
                        .to_string(),
                ));
            }
        }

        if let Some(url) = &self.seed_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "Seed URL must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }

        if !self.stream_url_template.contains("{id}") {
            return Err(Error::Config(format!(
                "Stream URL template '{}' must contain an {{id}} placeholder",
                self.stream_url_template
            )));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    seed_url: Option<String>,
    stream_url_template: Option<String>,
    page_size: Option<usize>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Persist the catalog in a SQLite database at `path`.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Populate the catalog from `url` at startup.
    ///
    /// Seeding failures are not fatal; the session starts with whatever
    /// catalog is already stored.
    pub fn seed_url(mut self, url: impl Into<String>) -> Self {
        self.seed_url = Some(url.into());
        self
    }

    /// Sets the stream URL template.
    ///
    /// Default: `http://localhost:3030/song/{id}`
    pub fn stream_url_template(mut self, template: impl Into<String>) -> Self {
        self.stream_url_template = Some(template.into());
        self
    }

    /// Sets the number of songs per page.
    ///
    /// Default: 50
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the final `CoreConfig`.
    pub fn build(self) -> Result<CoreConfig> {
        let defaults = CoreConfig::default();
        let config = CoreConfig {
            database_path: self.database_path,
            seed_url: self.seed_url,
            stream_url_template: self
                .stream_url_template
                .unwrap_or(defaults.stream_url_template),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            event_buffer_size: self.event_buffer_size.unwrap_or(defaults.event_buffer_size),
            logging: self.logging.unwrap_or(defaults.logging),
        };

        config.validate()?;

        Ok(config)
    }
}
