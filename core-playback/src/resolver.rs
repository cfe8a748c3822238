//! Mapping songs to playable URLs.

use core_library::Song;

use crate::error::{PlaybackError, Result};

/// Placeholder replaced by the song id in stream templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default stream location for catalog songs.
pub const DEFAULT_STREAM_TEMPLATE: &str = "http://localhost:3030/song/{id}";

/// Resolves the URL the media backend should load for a song.
pub trait SongUrlResolver: Send + Sync {
    fn resolve(&self, song: &Song) -> Result<String>;
}

/// Substitutes the song id into a URL template.
///
/// A song that carries its own `url` is played from there instead.
#[derive(Debug, Clone)]
pub struct TemplateUrlResolver {
    template: String,
}

impl TemplateUrlResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Default for TemplateUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_TEMPLATE)
    }
}

impl SongUrlResolver for TemplateUrlResolver {
    fn resolve(&self, song: &Song) -> Result<String> {
        if let Some(url) = song.url.as_deref().filter(|url| !url.trim().is_empty()) {
            return Ok(url.to_string());
        }

        if !self.template.contains(ID_PLACEHOLDER) {
            return Err(PlaybackError::UrlResolution {
                song_id: song.id.to_string(),
                reason: format!("template '{}' has no {} placeholder", self.template, ID_PLACEHOLDER),
            });
        }

        Ok(self.template.replace(ID_PLACEHOLDER, song.id.as_str()))
    }
}
