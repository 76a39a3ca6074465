//! The track sequence currently being played through.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::client::models::Track;

/// Where the tracks of a playback context came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextSource {
    Album(String),
    Playlist(String),
    Mix(String),
    /// Top tracks of an artist
    Artist(String),
    TrackRadio(String),
    ArtistRadio(String),
    /// Favourites, search results and other ad-hoc lists
    #[default]
    Adhoc,
}

impl ContextSource {
    /// Stable id persisted as the last playing list; ad-hoc lists have none.
    pub fn list_id(&self) -> Option<String> {
        match self {
            Self::Adhoc => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Album(id) => write!(f, "album:{id}"),
            Self::Playlist(id) => write!(f, "playlist:{id}"),
            Self::Mix(id) => write!(f, "mix:{id}"),
            Self::Artist(id) => write!(f, "artist:{id}"),
            Self::TrackRadio(id) => write!(f, "track-radio:{id}"),
            Self::ArtistRadio(id) => write!(f, "artist-radio:{id}"),
            Self::Adhoc => f.write_str("adhoc"),
        }
    }
}

impl FromStr for ContextSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "adhoc" {
            return Ok(Self::Adhoc);
        }
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid list id: {s}"))?;
        if id.is_empty() {
            return Err(format!("invalid list id: {s}"));
        }
        let id = id.to_string();
        match kind {
            "album" => Ok(Self::Album(id)),
            "playlist" => Ok(Self::Playlist(id)),
            "mix" => Ok(Self::Mix(id)),
            "artist" => Ok(Self::Artist(id)),
            "track-radio" => Ok(Self::TrackRadio(id)),
            "artist-radio" => Ok(Self::ArtistRadio(id)),
            _ => Err(format!("unknown list kind: {kind}")),
        }
    }
}

/// Ordered tracks plus the index of the current one.
///
/// The index is always valid when the context is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackContext {
    source: ContextSource,
    tracks: Vec<Track>,
    index: usize,
}

impl PlaybackContext {
    pub fn new(source: ContextSource, tracks: Vec<Track>) -> Self {
        Self {
            source,
            tracks,
            index: 0,
        }
    }

    /// Start at `index` instead of the first track (clamped to the last one).
    pub fn starting_at(mut self, index: usize) -> Self {
        self.index = index.min(self.tracks.len().saturating_sub(1));
        self
    }

    pub fn source(&self) -> &ContextSource {
        &self.source
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    /// Tracks after the current one.
    pub fn upcoming(&self) -> &[Track] {
        self.tracks.get(self.index + 1..).unwrap_or(&[])
    }

    /// Move to the next track. At the end, wraps to the start when `wrap` is
    /// set, otherwise stays put and returns `None`.
    pub fn advance(&mut self, wrap: bool) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.index + 1 < self.tracks.len() {
            self.index += 1;
        } else if wrap {
            self.index = 0;
        } else {
            return None;
        }
        self.current()
    }

    /// Move to the previous track, clamped at the first one.
    pub fn retreat(&mut self) -> Option<&Track> {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    /// Jump to a specific index.
    pub fn jump(&mut self, index: usize) -> Option<&Track> {
        if index < self.tracks.len() {
            self.index = index;
            self.current()
        } else {
            None
        }
    }

    /// Pick a uniformly random index whose track differs from `current_id`.
    ///
    /// A single-track context yields that track; if every track has the
    /// current id any index is returned.
    pub fn random_index<R: Rng>(&self, current_id: Option<&str>, rng: &mut R) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        let candidates: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| Some(track.id.as_str()) != current_id)
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            Some(rng.gen_range(0..self.tracks.len()))
        } else {
            Some(candidates[rng.gen_range(0..candidates.len())])
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::models::{AlbumRef, ArtistRef};

    pub(crate) fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            duration: 180,
            track_number: None,
            explicit: false,
            album: AlbumRef {
                id: String::from("album-1"),
                title: String::from("Album"),
                cover: None,
            },
            artist: ArtistRef {
                id: String::from("artist-1"),
                name: String::from("Artist"),
                picture: None,
            },
        }
    }

    pub(crate) fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| track(id)).collect()
    }

    #[test]
    fn test_retreat_is_clamped_at_zero() {
        let mut ctx = PlaybackContext::new(ContextSource::Adhoc, tracks(&["a", "b"]));
        assert_eq!(ctx.retreat().unwrap().id, "a");
        assert_eq!(ctx.retreat().unwrap().id, "a");
        assert_eq!(ctx.index(), 0);
    }

    #[test]
    fn test_advance_without_wrap_stops_at_end() {
        let mut ctx =
            PlaybackContext::new(ContextSource::Adhoc, tracks(&["a", "b"])).starting_at(1);
        assert!(ctx.advance(false).is_none());
        assert_eq!(ctx.index(), 1);
        assert_eq!(ctx.advance(true).unwrap().id, "a");
    }

    #[test]
    fn test_starting_at_is_clamped() {
        let ctx = PlaybackContext::new(ContextSource::Adhoc, tracks(&["a", "b"])).starting_at(7);
        assert_eq!(ctx.index(), 1);
        assert_eq!(ctx.upcoming().len(), 0);
    }

    #[test]
    fn test_random_index_never_picks_current_when_alternative_exists() {
        let ctx = PlaybackContext::new(ContextSource::Adhoc, tracks(&["a", "b", "c"]));
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let i = ctx.random_index(Some("b"), &mut rng).unwrap();
            assert_ne!(ctx.tracks()[i].id, "b");
        }
    }

    #[test]
    fn test_random_index_single_track() {
        let ctx = PlaybackContext::new(ContextSource::Adhoc, tracks(&["a"]));
        let mut rng = rand::thread_rng();
        assert_eq!(ctx.random_index(Some("a"), &mut rng), Some(0));
        assert_eq!(PlaybackContext::default().random_index(None, &mut rng), None);
    }

    #[test]
    fn test_source_list_id_round_trips() {
        for source in [
            ContextSource::Album(String::from("123")),
            ContextSource::Playlist(String::from("0b1c-uuid")),
            ContextSource::Mix(String::from("001f")),
            ContextSource::ArtistRadio(String::from("9")),
        ] {
            let id = source.list_id().unwrap();
            assert_eq!(id.parse::<ContextSource>().unwrap(), source);
        }
        assert_eq!(ContextSource::Adhoc.list_id(), None);
        assert!("album:".parse::<ContextSource>().is_err());
        assert!("genre:1".parse::<ContextSource>().is_err());
    }
}
