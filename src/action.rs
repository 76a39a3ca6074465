//! Application actions/events that drive state changes.

use std::path::PathBuf;

use crate::client::auth::{DeviceAuthorization, TokenSet};
use crate::client::models::{FavoriteKind, Lyrics, Playlist, Track};
use crate::pages::PageContent;
use crate::player::PlaybackContext;

/// Actions that can be dispatched to update application state.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Action {
    // Application lifecycle
    Quit,
    Tick,
    Resize(u16, u16),

    // Navigation
    NavigateUp,
    NavigateDown,
    FocusLeft,
    FocusRight,
    Select,
    Back,
    JumpToTop,
    JumpToBottom,
    Sidebar(SidebarDestination),

    // Text entry
    OpenSearch,
    OpenNewPlaylist,
    CloseEntry,
    EntryInput(char),
    EntryBackspace,
    EntrySubmit,

    // Playback controls
    PlayPause,
    NextTrack,
    PreviousTrack,
    SeekForward,
    SeekBackward,
    SeekForwardLarge,
    SeekBackwardLarge,
    VolumeUp,
    VolumeDown,
    ToggleShuffle,
    CycleRepeat,
    /// Play the selected section of the current page from its first track
    PlayPage,
    /// Shuffle-play the selected section of the current page
    ShufflePage,

    // Track rows
    Track(TrackAction),
    OpenSelectedAlbum,
    OpenSelectedArtist,
    OpenPlayingArtist,
    OpenPlayingRadio,

    // Queue management
    ClearQueue,
    RemoveSelectedFromQueue,

    // Lyrics
    ToggleLyrics,
    LyricsLoaded(String, Option<Lyrics>),

    // Account and preferences
    Login,
    Logout,
    LoginPrompt(DeviceAuthorization),
    LoginCompleted(TokenSet),
    LoginFailed(String),
    CycleQuality,
    Download,

    // Background results
    PageLoaded {
        id: u64,
        content: PageContent,
    },
    ImageReady {
        owner: ImageOwner,
        path: PathBuf,
    },
    SidebarPlaylistsLoaded(Vec<Playlist>),
    PlaylistCreated(Playlist),
    PlaybackRestored {
        track: Track,
        context: Option<PlaybackContext>,
    },

    // Overlays
    ShowHelp,
    HideHelp,

    // Messages
    Notice(String),
    Error(String),
    ClearMessage,

    // No-op
    None,
}

/// What the open text entry is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPurpose {
    #[default]
    Search,
    NewPlaylist,
}

/// Current playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Off => "  ",
            Self::All => "󰑖 ",
            Self::One => "󰑘 ",
        }
    }
}

/// Fixed sidebar entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarDestination {
    Home,
    Explore,
    FavoriteTracks,
    FavoriteMixes,
    FavoriteArtists,
    FavoritePlaylists,
    FavoriteAlbums,
}

impl SidebarDestination {
    pub const ALL: [SidebarDestination; 7] = [
        Self::Home,
        Self::Explore,
        Self::FavoriteTracks,
        Self::FavoriteMixes,
        Self::FavoriteArtists,
        Self::FavoritePlaylists,
        Self::FavoriteAlbums,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Explore => "Explore",
            Self::FavoriteTracks => "Tracks",
            Self::FavoriteMixes => "Mixes & Radio",
            Self::FavoriteArtists => "Artists",
            Self::FavoritePlaylists => "Playlists",
            Self::FavoriteAlbums => "Albums",
        }
    }

    /// Favourites list shown by this entry, if it is one.
    pub fn favorite_kind(&self) -> Option<FavoriteKind> {
        match self {
            Self::Home | Self::Explore => None,
            Self::FavoriteTracks => Some(FavoriteKind::Tracks),
            Self::FavoriteMixes => Some(FavoriteKind::Mixes),
            Self::FavoriteArtists => Some(FavoriteKind::Artists),
            Self::FavoritePlaylists => Some(FavoriteKind::Playlists),
            Self::FavoriteAlbums => Some(FavoriteKind::Albums),
        }
    }
}

/// Contextual actions of a track row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    StartRadio,
    PlayNext,
    AddToQueue,
    AddToCollection,
    AddToPlaylist,
}

/// Who asked for an image; the result is dropped if the owner is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOwner {
    /// Header art of a stack entry
    Page(u64),
    /// Cover of the track in the transport bar
    NowPlaying(String),
}

/// Panel with keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Sidebar,
    #[default]
    Page,
    Queue,
}

impl Focus {
    pub fn left(self) -> Self {
        match self {
            Self::Sidebar | Self::Page => Self::Sidebar,
            Self::Queue => Self::Page,
        }
    }

    pub fn right(self, queue_visible: bool) -> Self {
        match self {
            Self::Sidebar => Self::Page,
            Self::Page | Self::Queue if queue_visible => Self::Queue,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_cycles_through_all_modes() {
        let mode = RepeatMode::default();
        assert_eq!(mode.next(), RepeatMode::All);
        assert_eq!(mode.next().next(), RepeatMode::One);
        assert_eq!(mode.next().next().next(), RepeatMode::Off);
    }

    #[test]
    fn test_only_favourite_entries_have_a_kind() {
        assert_eq!(SidebarDestination::Home.favorite_kind(), None);
        assert_eq!(SidebarDestination::Explore.favorite_kind(), None);
        assert_eq!(
            SidebarDestination::FavoriteMixes.favorite_kind(),
            Some(FavoriteKind::Mixes)
        );
    }

    #[test]
    fn test_focus_skips_hidden_queue() {
        assert_eq!(Focus::Page.right(false), Focus::Page);
        assert_eq!(Focus::Page.right(true), Focus::Queue);
        assert_eq!(Focus::Queue.left(), Focus::Page);
        assert_eq!(Focus::Sidebar.left(), Focus::Sidebar);
    }
}
