//! Presentation helpers shared by every front end.

use std::fmt;

use crate::models::Song;

/// Display parts of a song, derived from whichever fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDisplay {
    pub primary: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl SongDisplay {
    /// Total over every combination of present fields.
    ///
    /// With any of title/artist/album present, the title leads (falling back
    /// to the relative path, then the id). Otherwise the relative path leads,
    /// then the id.
    pub fn of(song: &Song) -> Self {
        let title = non_blank(&song.title);
        let artist = non_blank(&song.artist);
        let album = non_blank(&song.album);
        let fallback = || relative_path(song).unwrap_or_else(|| song.id.to_string());

        let primary = match title {
            Some(title) => title.to_string(),
            None => fallback(),
        };

        Self {
            primary,
            artist: artist.map(str::to_string),
            album: album.map(str::to_string),
        }
    }
}

impl fmt::Display for SongDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)?;
        if let Some(artist) = &self.artist {
            write!(f, " - {}", artist)?;
        }
        if let Some(album) = &self.album {
            write!(f, " [{}]", album)?;
        }
        Ok(())
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

fn strip_base<'a>(value: &'a str, base_path: Option<&str>) -> &'a str {
    match base_path {
        Some(base) if !base.is_empty() => {
            let prefix = format!("{}/", base.trim_end_matches('/'));
            value.strip_prefix(prefix.as_str()).unwrap_or(value)
        }
        _ => value,
    }
}

/// `path` with the `base_path/` prefix removed.
pub fn relative_path(song: &Song) -> Option<String> {
    non_blank(&song.path).map(|path| strip_base(path, song.base_path.as_deref()).to_string())
}

/// `h:mm:ss` from one hour up, `mm:ss` below. `None` for zero, negative or
/// non-finite input.
pub fn format_time(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }

    let total = seconds.floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    Some(if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    })
}
