//! TIDAL API response models.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Base URL for catalog images.
const IMAGE_BASE_URL: &str = "https://resources.tidal.com/images";

/// Accept ids encoded either as JSON numbers or strings.
///
/// Tracks, albums and artists use numeric ids while playlists and mixes use
/// strings; everything is kept as `String` on our side.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Build the URL of a catalog image from its resource id.
///
/// Resource ids are UUIDs whose dashes map to path separators.
pub fn image_url(resource_id: &str, width: u32, height: u32) -> String {
    format!(
        "{}/{}/{}x{}.jpg",
        IMAGE_BASE_URL,
        resource_id.replace('-', "/"),
        width,
        height
    )
}

/// Format a duration in seconds as `mm:ss`, or `hh:mm:ss` past one hour.
pub fn pretty_duration(secs: u32) -> String {
    if secs == 0 {
        return String::from("00:00");
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

// ============================================================================
// Images
// ============================================================================

/// An image that can be fetched into the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Id of the entity the image belongs to (cache key)
    pub entity_id: String,
    /// Remote image URL
    pub url: String,
}

// ============================================================================
// Audio quality
// ============================================================================

/// Selectable streaming quality, ordered as in the preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quality {
    Low96k,
    Low320k,
    #[default]
    HighLossless,
    HiRes,
    HiResLossless,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Low96k,
        Quality::Low320k,
        Quality::HighLossless,
        Quality::HiRes,
        Quality::HiResLossless,
    ];

    /// Map a stored preference index to a quality (out of range falls back to default).
    pub fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn index(&self) -> u8 {
        match self {
            Self::Low96k => 0,
            Self::Low320k => 1,
            Self::HighLossless => 2,
            Self::HiRes => 3,
            Self::HiResLossless => 4,
        }
    }

    /// Value of the `audioquality` query parameter.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Low96k => "LOW",
            Self::Low320k => "HIGH",
            Self::HighLossless => "LOSSLESS",
            Self::HiRes => "HI_RES",
            Self::HiResLossless => "HI_RES_LOSSLESS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low96k => "Low (96 kbps)",
            Self::Low320k => "Low (320 kbps)",
            Self::HighLossless => "High (lossless)",
            Self::HiRes => "Hi-Res",
            Self::HiResLossless => "Hi-Res (lossless)",
        }
    }

    /// Next quality in preference order (wraps around).
    pub fn next(&self) -> Self {
        Self::from_index((self.index() + 1) % Self::ALL.len() as u8)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Artist reference embedded in tracks and albums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Album reference embedded in tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover: Option<String>,
}

/// A streamable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub explicit: bool,
    pub album: AlbumRef,
    pub artist: ArtistRef,
}

impl Track {
    pub fn duration_string(&self) -> String {
        pretty_duration(self.duration)
    }

    /// Cover art of the owning album.
    pub fn cover(&self) -> Option<ImageRef> {
        self.album.cover.as_ref().map(|cover| ImageRef {
            entity_id: self.album.id.clone(),
            url: image_url(cover, 320, 320),
        })
    }

    /// The owning artist as a full artist entity (for opening its page).
    pub fn artist_entity(&self) -> Artist {
        Artist {
            id: self.artist.id.clone(),
            name: self.artist.name.clone(),
            picture: self.artist.picture.clone(),
        }
    }
}

/// Album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub number_of_tracks: Option<u32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistRef>,
}

impl Album {
    pub fn image(&self) -> Option<ImageRef> {
        self.cover.as_ref().map(|cover| ImageRef {
            entity_id: self.id.clone(),
            url: image_url(cover, 320, 320),
        })
    }

    pub fn artist_name(&self) -> &str {
        self.artist.as_ref().map_or("Unknown Artist", |a| a.name.as_str())
    }

    /// Release year, if the release date is known.
    pub fn year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(|d| d.get(..4))
    }
}

impl From<&AlbumRef> for Album {
    fn from(album: &AlbumRef) -> Self {
        Self {
            id: album.id.clone(),
            title: album.title.clone(),
            duration: 0,
            number_of_tracks: None,
            release_date: None,
            cover: album.cover.clone(),
            artist: None,
        }
    }
}

/// Artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

impl Artist {
    pub fn image(&self) -> Option<ImageRef> {
        self.picture.as_ref().map(|picture| ImageRef {
            entity_id: self.id.clone(),
            url: image_url(picture, 320, 320),
        })
    }
}

/// Playlist (user or editorial).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "uuid")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub number_of_tracks: Option<u32>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub square_image: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Playlist {
    pub fn image(&self) -> Option<ImageRef> {
        self.square_image
            .as_ref()
            .map(|id| image_url(id, 320, 320))
            .or_else(|| self.image.as_ref().map(|id| image_url(id, 480, 320)))
            .map(|url| ImageRef {
                entity_id: self.id.clone(),
                url,
            })
    }
}

/// A size variant of a mix image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixImage {
    pub url: String,
}

/// A service-generated mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mix {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub images: HashMap<String, MixImage>,
}

impl Mix {
    pub fn image(&self) -> Option<ImageRef> {
        ["MEDIUM", "SMALL", "LARGE"]
            .iter()
            .find_map(|size| self.images.get(*size))
            .map(|image| ImageRef {
                entity_id: self.id.clone(),
                url: image.url.clone(),
            })
    }
}

/// Lyrics of a track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lyrics {
    #[serde(default)]
    pub lyrics: Option<String>,
    /// Time-synced lyrics in LRC format
    #[serde(default)]
    pub subtitles: Option<String>,
}

/// Artist biography.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistBio {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl ArtistBio {
    /// Bio text with the service's inline `[wimpLink ...]` markup removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut in_tag = false;
        for c in self.text.chars() {
            match c {
                '[' => in_tag = true,
                ']' if in_tag => in_tag = false,
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        out.replace("<br/>", "\n")
    }
}

// ============================================================================
// Collections
// ============================================================================

/// A paged list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_number_of_items: Option<u32>,
}

/// Entry of a favourites list.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteItem<T> {
    pub item: T,
}

/// Entry of a mix or playlist item list (tracks and videos are mixed).
#[derive(Debug, Clone, Deserialize)]
pub struct TypedItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub item: serde_json::Value,
}

/// Search results over all entity types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub artists: Option<Paged<Artist>>,
    #[serde(default)]
    pub albums: Option<Paged<Album>>,
    #[serde(default)]
    pub tracks: Option<Paged<Track>>,
    #[serde(default)]
    pub playlists: Option<Paged<Playlist>>,
}

impl From<SearchResponse> for SearchResults {
    fn from(response: SearchResponse) -> Self {
        Self {
            artists: response.artists.map(|p| p.items).unwrap_or_default(),
            albums: response.albums.map(|p| p.items).unwrap_or_default(),
            tracks: response.tracks.map(|p| p.items).unwrap_or_default(),
            playlists: response.playlists.map(|p| p.items).unwrap_or_default(),
        }
    }
}

/// Response of the `sessions` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub country_code: String,
}

/// Response of the stream URL endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StreamUrls {
    #[serde(default)]
    pub urls: Vec<String>,
}

// ============================================================================
// Editorial pages (home / explore)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EditorialPage {
    #[serde(default)]
    pub rows: Vec<EditorialRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EditorialRow {
    #[serde(default)]
    pub modules: Vec<RawModule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawModule {
    #[serde(rename = "type")]
    pub module_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub paged_list: Option<Paged<serde_json::Value>>,
}

/// Items of an editorial module.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItems {
    Tracks(Vec<Track>),
    Albums(Vec<Album>),
    Artists(Vec<Artist>),
    Playlists(Vec<Playlist>),
    Mixes(Vec<Mix>),
}

/// One titled carousel of an editorial page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageModule {
    pub title: String,
    pub items: ModuleItems,
}

/// Deserialize every item that parses, silently skipping the rest.
fn parse_items<T: serde::de::DeserializeOwned>(items: Vec<serde_json::Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}

impl EditorialPage {
    /// Flatten rows into the modules we know how to display.
    pub fn into_modules(self) -> Vec<PageModule> {
        self.rows
            .into_iter()
            .flat_map(|row| row.modules)
            .filter_map(|module| {
                let items = module.paged_list?.items;
                let items = match module.module_type.as_str() {
                    "TRACK_LIST" => ModuleItems::Tracks(parse_items(items)),
                    "ALBUM_LIST" => ModuleItems::Albums(parse_items(items)),
                    "ARTIST_LIST" => ModuleItems::Artists(parse_items(items)),
                    "PLAYLIST_LIST" => ModuleItems::Playlists(parse_items(items)),
                    "MIX_LIST" => ModuleItems::Mixes(parse_items(items)),
                    _ => return None,
                };
                Some(PageModule {
                    title: module.title,
                    items,
                })
            })
            .collect()
    }
}

/// Favourite categories shown in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Tracks,
    Mixes,
    Artists,
    Playlists,
    Albums,
}

impl fmt::Display for FavoriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tracks => "Favourite Tracks",
            Self::Mixes => "Favourite Mixes",
            Self::Artists => "Favourite Artists",
            Self::Playlists => "Favourite Playlists",
            Self::Albums => "Favourite Albums",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_JSON: &str = r#"{
        "id": 77646168,
        "title": "Nightcall",
        "duration": 258,
        "trackNumber": 1,
        "explicit": false,
        "album": {"id": 77646167, "title": "Drive", "cover": "1f5e4c1e-7d2a-4d3b-9c1a-8e3b2f6a9d10"},
        "artist": {"id": 3637405, "name": "Kavinsky", "picture": null}
    }"#;

    #[test]
    fn test_track_numeric_ids_become_strings() {
        let track: Track = serde_json::from_str(TRACK_JSON).unwrap();
        assert_eq!(track.id, "77646168");
        assert_eq!(track.album.id, "77646167");
        assert_eq!(track.artist.name, "Kavinsky");
        assert_eq!(track.duration_string(), "04:18");
    }

    #[test]
    fn test_track_cover_is_keyed_by_album() {
        let track: Track = serde_json::from_str(TRACK_JSON).unwrap();
        let cover = track.cover().unwrap();
        assert_eq!(cover.entity_id, "77646167");
        assert_eq!(
            cover.url,
            "https://resources.tidal.com/images/1f5e4c1e/7d2a/4d3b/9c1a/8e3b2f6a9d10/320x320.jpg"
        );
    }

    #[test]
    fn test_pretty_duration() {
        assert_eq!(pretty_duration(0), "00:00");
        assert_eq!(pretty_duration(59), "00:59");
        assert_eq!(pretty_duration(61), "01:01");
        assert_eq!(pretty_duration(3725), "01:02:05");
    }

    #[test]
    fn test_quality_index_mapping() {
        assert_eq!(Quality::from_index(0), Quality::Low96k);
        assert_eq!(Quality::from_index(4), Quality::HiResLossless);
        assert_eq!(Quality::from_index(9), Quality::HighLossless);
        assert_eq!(Quality::HiResLossless.next(), Quality::Low96k);
        assert_eq!(Quality::Low320k.api_name(), "HIGH");
    }

    #[test]
    fn test_editorial_page_keeps_known_modules() {
        let json = r#"{
            "rows": [
                {"modules": [{
                    "type": "ALBUM_LIST",
                    "title": "New Albums",
                    "pagedList": {"items": [
                        {"id": 1, "title": "First"},
                        {"broken": true}
                    ]}
                }]},
                {"modules": [{"type": "FEATURED_PROMOTIONS", "title": "Promo"}]},
                {"modules": [{
                    "type": "MIX_LIST",
                    "title": "Your Mixes",
                    "pagedList": {"items": [
                        {"id": "0123abc", "title": "My Mix 1", "images": {"SMALL": {"url": "https://img/mix.jpg"}}}
                    ]}
                }]}
            ]
        }"#;

        let page: EditorialPage = serde_json::from_str(json).unwrap();
        let modules = page.into_modules();

        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].title, "New Albums");
        match &modules[0].items {
            ModuleItems::Albums(albums) => {
                assert_eq!(albums.len(), 1);
                assert_eq!(albums[0].id, "1");
            }
            other => panic!("unexpected items: {other:?}"),
        }
        match &modules[1].items {
            ModuleItems::Mixes(mixes) => {
                assert_eq!(mixes[0].image().unwrap().url, "https://img/mix.jpg");
            }
            other => panic!("unexpected items: {other:?}"),
        }
    }

    #[test]
    fn test_bio_markup_is_stripped() {
        let bio = ArtistBio {
            text: String::from("Born in [wimpLink artistId=\"1\"]Paris[/wimpLink].<br/>Producer."),
            source: None,
        };
        assert_eq!(bio.plain_text(), "Born in Paris.\nProducer.");
    }
}
