//! Browsable pages and the navigation stack that holds them.
//!
//! A page only knows how to load its content from the catalog. Loading
//! runs in a background task per pushed page and is raced against the
//! page's cancellation token, so a page popped mid-load never delivers.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::client::models::{Album, Artist, ImageRef, Mix, Playlist, Track};
use crate::client::{ApiResult, Catalog};
use crate::player::{ContextSource, PlaybackContext};

pub mod album;
pub mod artist;
pub mod favorites;
pub mod home;
pub mod playlist;
pub mod radio;
pub mod search;
pub mod stack;

pub use album::AlbumPage;
pub use artist::ArtistPage;
pub use favorites::FavoritesPage;
pub use home::{ExplorePage, HomePage};
pub use playlist::{MixPage, PlaylistPage};
pub use radio::{RadioPage, RadioSeed};
pub use search::SearchPage;
pub use stack::{NavigationStack, PageEntry, PageState};

/// A navigable page.
pub trait Page: Send + Sync {
    /// Title shown in the page header and breadcrumb.
    fn title(&self) -> String;

    /// Tag used to pop back to this page.
    fn tag(&self) -> Option<&'static str> {
        None
    }

    /// Load the page content. Failing sections are left out.
    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent>;

    /// Radio started from this page when no row names a seed.
    fn radio_seed(&self) -> Option<RadioSeed> {
        None
    }
}

/// Loaded content of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub header: Option<PageHeader>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: Option<ImageRef>,
}

/// A titled block of items. Track sections play as a context from `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub items: SectionItems,
    pub source: ContextSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionItems {
    Tracks(Vec<Track>),
    Albums(Vec<Album>),
    Artists(Vec<Artist>),
    Playlists(Vec<Playlist>),
    Mixes(Vec<Mix>),
    Text(String),
}

impl SectionItems {
    /// Number of rows the items take.
    pub fn len(&self) -> usize {
        match self {
            Self::Tracks(v) => v.len(),
            Self::Albums(v) => v.len(),
            Self::Artists(v) => v.len(),
            Self::Playlists(v) => v.len(),
            Self::Mixes(v) => v.len(),
            Self::Text(text) => text.lines().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One selectable row of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Row<'a> {
    Heading(&'a Section),
    Item {
        section: usize,
        index: usize,
        item: Item<'a>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    Track(&'a Track),
    Album(&'a Album),
    Artist(&'a Artist),
    Playlist(&'a Playlist),
    Mix(&'a Mix),
    Text(&'a str),
}

impl PageContent {
    /// Flatten the sections into display rows: a heading, then its items.
    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        for (section_index, section) in self.sections.iter().enumerate() {
            rows.push(Row::Heading(section));
            let item = |index, item| Row::Item {
                section: section_index,
                index,
                item,
            };
            match &section.items {
                SectionItems::Tracks(v) => {
                    rows.extend(v.iter().enumerate().map(|(i, t)| item(i, Item::Track(t))))
                }
                SectionItems::Albums(v) => {
                    rows.extend(v.iter().enumerate().map(|(i, a)| item(i, Item::Album(a))))
                }
                SectionItems::Artists(v) => {
                    rows.extend(v.iter().enumerate().map(|(i, a)| item(i, Item::Artist(a))))
                }
                SectionItems::Playlists(v) => {
                    rows.extend(v.iter().enumerate().map(|(i, p)| item(i, Item::Playlist(p))))
                }
                SectionItems::Mixes(v) => {
                    rows.extend(v.iter().enumerate().map(|(i, m)| item(i, Item::Mix(m))))
                }
                SectionItems::Text(text) => rows.extend(
                    text.lines()
                        .enumerate()
                        .map(|(i, line)| item(i, Item::Text(line))),
                ),
            }
        }
        rows
    }

    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len() + 1).sum()
    }

    /// Section a row belongs to, counting its heading.
    pub fn section_at(&self, row: usize) -> Option<&Section> {
        let mut start = 0;
        for section in &self.sections {
            let end = start + section.items.len() + 1;
            if row < end {
                return Some(section);
            }
            start = end;
        }
        None
    }

    /// Playback context for the tracks of the section at `row`, starting at
    /// the selected track (or the first one when a heading is selected).
    pub fn context_at(&self, row: usize) -> Option<PlaybackContext> {
        let rows = self.rows();
        let start = match rows.get(row)? {
            Row::Item { index, .. } => *index,
            Row::Heading(_) => 0,
        };
        let section = self.section_at(row)?;
        match &section.items {
            SectionItems::Tracks(tracks) if !tracks.is_empty() => Some(
                PlaybackContext::new(section.source.clone(), tracks.clone()).starting_at(start),
            ),
            _ => None,
        }
    }

    /// Context over the first track section, for "play"/"shuffle" of a page.
    pub fn first_track_context(&self) -> Option<PlaybackContext> {
        self.sections.iter().find_map(|section| match &section.items {
            SectionItems::Tracks(tracks) if !tracks.is_empty() => Some(PlaybackContext::new(
                section.source.clone(),
                tracks.clone(),
            )),
            _ => None,
        })
    }
}

/// Build a section from a catalog result, leaving it out when the call
/// failed or returned nothing.
pub(crate) fn section<T>(
    title: &str,
    source: ContextSource,
    result: ApiResult<T>,
    items: impl FnOnce(T) -> SectionItems,
) -> Option<Section> {
    match result {
        Ok(value) => {
            let items = items(value);
            (!items.is_empty()).then(|| Section {
                title: title.to_string(),
                items,
                source,
            })
        }
        Err(e) => {
            tracing::warn!("Section unavailable ({}): {}", title, e);
            None
        }
    }
}

/// Load `page` in the background and report it as `Action::PageLoaded`.
///
/// Nothing is sent once `token` is cancelled.
pub fn spawn_load(
    id: u64,
    page: Arc<dyn Page>,
    catalog: Arc<dyn Catalog>,
    token: CancellationToken,
    action_tx: mpsc::UnboundedSender<Action>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Load of page {} cancelled", id);
            }
            content = page.load(catalog.as_ref()) => {
                if token.is_cancelled() {
                    return;
                }
                let _ = action_tx.send(Action::PageLoaded { id, content });
            }
        }
    })
}
