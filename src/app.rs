//! Main application state and logic.

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::Result;
use ratatui_image::picker::Picker;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::{Action, EntryPurpose, Focus, ImageOwner, SidebarDestination, TrackAction};
use crate::client::auth::{AuthError, DeviceAuthorization};
use crate::client::models::{Album, Artist, ImageRef, Playlist, Track};
use crate::client::{Catalog, TidalClient};
use crate::config::Config;
use crate::download::download_track;
use crate::images::ImageCache;
use crate::pages::home::HOME_TAG;
use crate::pages::{
    spawn_load, AlbumPage, ArtistPage, ExplorePage, FavoritesPage, HomePage, Item, MixPage,
    NavigationStack, Page, PlaylistPage, RadioPage, RadioSeed, Row, SearchPage,
};
use crate::player::{
    CatalogResolver, ContextSource, PipelineEvent, Pipeline, PlaybackContext, PlaybackError,
    Player, PlayerController, PlayerNotification, PollOutcome,
};
use crate::ui::{
    EntryState, LyricsState, NowPlayingState, QueueRow, QueueState, SidebarEntry, SidebarState,
};

/// Seek step of `,` and `.` in seconds.
const SEEK_STEP: f64 = 10.0;

/// Seek step of `[` and `]` in seconds.
const SEEK_STEP_LARGE: f64 = 60.0;

const VOLUME_STEP: f32 = 0.1;

/// Status line shown over the UI until dismissed.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

/// Main application state.
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,

    /// Configuration
    pub config: Config,

    /// API client
    client: Arc<TidalClient>,

    /// The same client behind the catalog seam, for pages and background tasks
    catalog: Arc<dyn Catalog>,

    /// Player controller, created in `init`
    pub controller: Option<PlayerController<Player>>,

    pipeline_rx: Option<mpsc::UnboundedReceiver<PipelineEvent>>,
    notify_tx: mpsc::UnboundedSender<PlayerNotification>,
    notify_rx: mpsc::UnboundedReceiver<PlayerNotification>,

    /// Open pages
    pub pages: NavigationStack,

    pub sidebar: SidebarState,

    /// Queue state
    pub queue: QueueState,

    /// Now playing state
    pub now_playing: NowPlayingState,

    /// Search or new playlist entry
    pub entry: EntryState,

    /// Lyrics state
    pub lyrics: LyricsState,

    /// Pending device login shown to the user
    pub login: Option<DeviceAuthorization>,
    login_cancel: Option<CancellationToken>,

    images: ImageCache,

    /// Terminal graphics, absent when art is disabled or unsupported
    picker: Option<Picker>,

    /// Help overlay visible
    pub show_help: bool,

    pub message: Option<Message>,

    /// Action sender for async operations
    pub action_tx: mpsc::UnboundedSender<Action>,

    pub focus: Focus,

    /// Whether the position is polled on every tick
    position_poll_active: bool,
}

impl App {
    /// Create a new application instance.
    pub fn new(
        config: Config,
        action_tx: mpsc::UnboundedSender<Action>,
        picker: Option<Picker>,
    ) -> Self {
        let client = Arc::new(TidalClient::new(
            config.session.client_id.clone(),
            config.session.client_secret.clone(),
        ));
        client.set_session(config.session());
        let catalog: Arc<dyn Catalog> = client.clone();

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let mut now_playing = NowPlayingState::new();
        now_playing.volume = config.volume();
        now_playing.quality = config.quality();

        Self {
            should_quit: false,
            images: ImageCache::new(config.ui.image_cache_dir.clone()),
            picker: picker.filter(|_| config.ui.show_album_art),
            queue: QueueState::new(config.ui.show_queue),
            config,
            client,
            catalog,
            controller: None,
            pipeline_rx: None,
            notify_tx,
            notify_rx,
            pages: NavigationStack::new(),
            sidebar: SidebarState::new(),
            now_playing,
            entry: EntryState::new(),
            lyrics: LyricsState::new(),
            login: None,
            login_cancel: None,
            show_help: false,
            message: None,
            action_tx,
            focus: Focus::default(),
            position_poll_active: false,
        }
    }

    /// Initialize the application.
    pub async fn init(&mut self) -> Result<()> {
        self.images.reset();

        // Initialize the audio player
        let resolver = Arc::new(CatalogResolver::new(self.catalog.clone(), Handle::current()));
        let (player, pipeline_rx) = Player::new(resolver);
        let mut controller = PlayerController::new(player, self.notify_tx.clone());
        if let Err(e) = controller.change_volume(self.config.volume()) {
            tracing::error!("Failed to set initial volume: {}", e);
        }
        self.controller = Some(controller);
        self.pipeline_rx = Some(pipeline_rx);

        match self.client.restore_session().await {
            Ok(true) => {
                tracing::info!("Session restored");
                self.persist_tokens();
                self.show_home();
                self.load_sidebar_playlists();
                self.restore_last_playing();
            }
            Ok(false) => {
                tracing::info!("No saved session, starting device login");
                self.show_home();
                self.start_login();
            }
            Err(e) if e.is_auth_failure() => {
                tracing::warn!("Saved session rejected: {}", e);
                self.show_home();
                self.start_login();
            }
            Err(e) => {
                tracing::error!("Failed to restore session: {}", e);
                self.show_home();
                self.set_error(format!("Could not reach TIDAL: {e}"));
            }
        }

        Ok(())
    }

    /// Persist playback and settings, stop the audio and clear the scratch directory.
    pub fn shutdown(&mut self) {
        if let Some(cancel) = self.login_cancel.take() {
            cancel.cancel();
        }

        if let Some(controller) = &mut self.controller {
            remember_playing(&mut self.config, controller);
            if let Err(e) = controller.stop() {
                tracing::warn!("Failed to stop playback: {}", e);
            }
        }
        if self.client.is_logged_in() {
            self.persist_tokens();
        }
        self.save_config();
        self.images.reset();
    }

    /// Handle an action and update state.
    pub async fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }

            Action::Tick => self.tick(),

            Action::Resize(_, _) => {}

            // Navigation
            Action::NavigateUp => match self.focus {
                Focus::Sidebar => self.sidebar.select_previous(),
                Focus::Page => {
                    if let Some(entry) = self.pages.top_mut() {
                        entry.select_previous();
                    }
                }
                Focus::Queue => {
                    let len = self.queue_len();
                    self.queue.select_previous(len);
                }
            },

            Action::NavigateDown => match self.focus {
                Focus::Sidebar => self.sidebar.select_next(),
                Focus::Page => {
                    if let Some(entry) = self.pages.top_mut() {
                        entry.select_next();
                    }
                }
                Focus::Queue => {
                    let len = self.queue_len();
                    self.queue.select_next(len);
                }
            },

            Action::JumpToTop => match self.focus {
                Focus::Sidebar => self.sidebar.select_first(),
                Focus::Page => {
                    if let Some(entry) = self.pages.top_mut() {
                        entry.select_first();
                    }
                }
                Focus::Queue => {
                    if self.queue_len() > 0 {
                        self.queue.list_state.select(Some(0));
                    }
                }
            },

            Action::JumpToBottom => match self.focus {
                Focus::Sidebar => self.sidebar.select_last(),
                Focus::Page => {
                    if let Some(entry) = self.pages.top_mut() {
                        entry.select_last();
                    }
                }
                Focus::Queue => {
                    let len = self.queue_len();
                    if len > 0 {
                        self.queue.list_state.select(Some(len - 1));
                    }
                }
            },

            Action::FocusLeft => {
                self.focus = self.focus.left();
            }

            Action::FocusRight => {
                self.focus = self.focus.right(self.queue_panel_visible());
            }

            Action::Select => self.select()?,

            Action::Back => {
                if !self.pages.pop() {
                    tracing::debug!("Already at the root page");
                }
                self.focus = Focus::Page;
            }

            Action::Sidebar(destination) => self.navigate(destination),

            // Text entry
            Action::OpenSearch => self.entry.open(EntryPurpose::Search),

            Action::OpenNewPlaylist => self.entry.open(EntryPurpose::NewPlaylist),

            Action::CloseEntry => self.entry.close(),

            Action::EntryInput(c) => self.entry.push(c),

            Action::EntryBackspace => self.entry.backspace(),

            Action::EntrySubmit => match self.entry.submit() {
                Some((EntryPurpose::Search, query)) => {
                    self.push_page(Arc::new(SearchPage::new(query)));
                }
                Some((EntryPurpose::NewPlaylist, title)) => self.create_playlist(title),
                None => {}
            },

            // Playback
            Action::PlayPause => {
                if let Some(controller) = &mut self.controller {
                    controller.toggle_play_pause()?;
                }
            }

            Action::NextTrack => {
                if let Some(controller) = &mut self.controller {
                    controller.play_next()?;
                }
            }

            Action::PreviousTrack => {
                if let Some(controller) = &mut self.controller {
                    controller.play_previous()?;
                }
            }

            Action::SeekForward => self.seek_relative(SEEK_STEP)?,
            Action::SeekBackward => self.seek_relative(-SEEK_STEP)?,
            Action::SeekForwardLarge => self.seek_relative(SEEK_STEP_LARGE)?,
            Action::SeekBackwardLarge => self.seek_relative(-SEEK_STEP_LARGE)?,

            Action::VolumeUp => self.change_volume(VOLUME_STEP)?,
            Action::VolumeDown => self.change_volume(-VOLUME_STEP)?,

            Action::ToggleShuffle => {
                if let Some(controller) = &mut self.controller {
                    self.now_playing.shuffle = controller.toggle_shuffle();
                }
            }

            Action::CycleRepeat => {
                if let Some(controller) = &mut self.controller {
                    self.now_playing.repeat = controller.cycle_repeat();
                }
            }

            Action::PlayPage => {
                if let (Some(context), Some(controller)) = (self.page_context(), &mut self.controller)
                {
                    controller.play_context(context)?;
                }
            }

            Action::ShufflePage => {
                if let (Some(context), Some(controller)) = (self.page_context(), &mut self.controller)
                {
                    controller.set_context(context);
                    controller.play_shuffle()?;
                    self.now_playing.shuffle = controller.is_shuffle();
                }
            }

            // Track rows
            Action::Track(TrackAction::StartRadio) => self.start_radio(),

            Action::Track(track_action) => self.handle_track_action(track_action),

            Action::OpenSelectedAlbum => match self.selected_item() {
                Some(SelectedItem::Track(track)) => {
                    self.push_page(Arc::new(AlbumPage::new(Album::from(&track.album))));
                }
                Some(SelectedItem::Album(album)) => self.push_page(Arc::new(AlbumPage::new(album))),
                _ => {}
            },

            Action::OpenSelectedArtist => match self.selected_item() {
                Some(SelectedItem::Track(track)) => {
                    self.push_page(Arc::new(ArtistPage::new(track.artist_entity())));
                }
                Some(SelectedItem::Artist(artist)) => {
                    self.push_page(Arc::new(ArtistPage::new(artist)));
                }
                Some(SelectedItem::Album(album)) => {
                    if let Some(artist) = &album.artist {
                        self.push_page(Arc::new(ArtistPage::new(Artist {
                            id: artist.id.clone(),
                            name: artist.name.clone(),
                            picture: artist.picture.clone(),
                        })));
                    }
                }
                _ => {}
            },

            Action::OpenPlayingArtist => {
                if let Some(track) = self.now_playing.track.clone() {
                    self.push_page(Arc::new(ArtistPage::new(track.artist_entity())));
                }
            }

            Action::OpenPlayingRadio => {
                if let Some(track) = self.now_playing.track.clone() {
                    self.push_page(Arc::new(RadioPage::new(RadioSeed::Track(track))));
                }
            }

            // Queue management
            Action::ClearQueue => {
                if let Some(controller) = &mut self.controller {
                    controller.clear_queue();
                    self.set_notice("Queue cleared");
                }
                let len = self.queue_len();
                self.queue.clamp(len);
            }

            Action::RemoveSelectedFromQueue => {
                if self.focus != Focus::Queue {
                    return Ok(());
                }
                if let Some(QueueRow::Queued(index)) = self.selected_queue_row() {
                    if let Some(controller) = &mut self.controller {
                        if let Some(track) = controller.remove_from_queue(index) {
                            tracing::debug!("Removed {} from the queue", track.title);
                        }
                    }
                }
                let len = self.queue_len();
                self.queue.clamp(len);
            }

            // Lyrics
            Action::ToggleLyrics => {
                self.lyrics.toggle();
                if self.lyrics.visible {
                    if self.focus == Focus::Queue {
                        self.focus = Focus::Page;
                    }
                    if let Some(id) = self.now_playing.track_id().map(str::to_string) {
                        if self.lyrics.track_id.as_deref() != Some(id.as_str()) {
                            self.load_lyrics(id);
                        }
                    }
                }
            }

            Action::LyricsLoaded(track_id, lyrics) => {
                if self.now_playing.track_id() == Some(track_id.as_str()) {
                    self.lyrics.set_lyrics(track_id, lyrics);
                }
            }

            // Account and preferences
            Action::Login => self.start_login(),

            Action::Logout => {
                tracing::info!("Logging out");
                self.client.logout();
                self.config.clear_tokens();
                self.save_config();
                if let Some(controller) = &mut self.controller {
                    controller.stop()?;
                    controller.clear_queue();
                    controller.set_context(PlaybackContext::default());
                }
                self.sidebar.set_playlists(Vec::new());
                self.show_home();
                self.start_login();
            }

            Action::LoginPrompt(device) => {
                self.login = Some(device);
            }

            Action::LoginCompleted(tokens) => {
                tracing::info!("Login completed");
                self.login = None;
                self.login_cancel = None;
                self.client.apply_tokens(&tokens);
                if let Err(e) = self.client.restore_session().await {
                    tracing::warn!("Failed to validate new session: {}", e);
                }
                self.persist_tokens();
                self.save_config();
                self.show_home();
                self.load_sidebar_playlists();
                self.set_notice("Logged in");
            }

            Action::LoginFailed(reason) => {
                self.login = None;
                self.login_cancel = None;
                self.set_error(format!("Login failed: {reason}"));
            }

            Action::CycleQuality => {
                let quality = self.config.quality().next();
                self.config.set_quality(quality);
                self.client.set_quality(quality);
                self.now_playing.quality = quality;
                self.save_config();
                self.set_notice(format!("Audio quality: {}", quality.label()));
            }

            Action::Download => self.download_playing(),

            // Background results
            Action::PageLoaded { id, content } => {
                let image = content.header.as_ref().and_then(|h| h.image.clone());
                if self.pages.set_loaded(id, content) {
                    if let Some(image) = image {
                        let token = self.pages.get_mut(id).map(|entry| entry.cancel.clone());
                        self.spawn_image(ImageOwner::Page(id), image, token);
                    }
                }
            }

            Action::ImageReady { owner, path } => self.apply_image(owner, path),

            Action::SidebarPlaylistsLoaded(playlists) => {
                self.sidebar.set_playlists(playlists);
            }

            Action::PlaylistCreated(playlist) => {
                self.set_notice(format!("Created playlist {}", playlist.title));
                let playlists = with_created_playlist(&self.sidebar.playlists, playlist);
                self.sidebar.set_playlists(playlists);
            }

            Action::PlaybackRestored { track, context } => {
                if let Some(controller) = &mut self.controller {
                    if let Some(context) = context {
                        controller.set_context(context);
                    }
                    controller.cue(track);
                }
            }

            // Overlays
            Action::ShowHelp => {
                self.show_help = true;
            }

            Action::HideHelp => {
                self.show_help = false;
            }

            // Messages
            Action::Notice(text) => self.set_notice(text),

            Action::Error(text) => self.set_error(text),

            Action::ClearMessage => {
                self.message = None;
            }

            Action::None => {}
        }

        Ok(())
    }

    /// Drain pipeline failures, poll the position and apply player notifications.
    fn tick(&mut self) {
        let failures: Vec<(Option<String>, String)> = match &mut self.pipeline_rx {
            Some(rx) => {
                let mut failures = Vec::new();
                while let Ok(PipelineEvent::Error { track_id, message }) = rx.try_recv() {
                    failures.push((track_id, message));
                }
                failures
            }
            None => Vec::new(),
        };

        if let Some(controller) = &mut self.controller {
            for (track_id, message) in failures {
                controller.handle_pipeline_failure(track_id.as_deref(), &message);
            }

            if self.position_poll_active {
                match controller.poll_position() {
                    Ok(PollOutcome::Continue) => {}
                    Ok(PollOutcome::Cancel) => self.position_poll_active = false,
                    Err(e) => tracing::warn!("Position poll failed: {}", e),
                }
            }
        }

        while let Ok(notification) = self.notify_rx.try_recv() {
            self.handle_notification(notification);
        }
    }

    fn handle_notification(&mut self, notification: PlayerNotification) {
        match notification {
            PlayerNotification::TrackChanged(track) => {
                let cover = track.cover();
                let track_id = track.id.clone();
                let list_id = self
                    .controller
                    .as_ref()
                    .and_then(|c| c.context().source().list_id());
                self.config.remember_playing(Some(track_id.clone()), list_id);
                self.save_config();
                self.now_playing.set_track(track);

                if let Some(cover) = cover {
                    self.spawn_image(ImageOwner::NowPlaying(track_id.clone()), cover, None);
                }

                if self.lyrics.visible {
                    self.load_lyrics(track_id);
                } else {
                    // Reloaded when the panel opens
                    self.lyrics.clear();
                }

                let len = self.queue_len();
                self.queue.clamp(len);
            }
            PlayerNotification::PlayStateChanged(playing) => {
                if let Some(controller) = &self.controller {
                    self.now_playing.state = controller.state();
                }
                if playing {
                    self.position_poll_active = true;
                }
            }
            PlayerNotification::PositionUpdated { position, duration } => {
                self.now_playing.position = position;
                if duration > 0.0 {
                    self.now_playing.duration = duration;
                }
                self.lyrics.update_position((position * 1000.0) as u64);
            }
            PlayerNotification::PlaybackFailed(reason) => {
                self.set_error(reason);
            }
        }
    }

    /// Activate the selected row of the focused panel.
    fn select(&mut self) -> Result<()> {
        match self.focus {
            Focus::Sidebar => {
                match self.sidebar.selected() {
                    Some(SidebarEntry::Destination(destination)) => self.navigate(destination),
                    Some(SidebarEntry::Playlist(playlist)) => {
                        let page = Arc::new(PlaylistPage::new(playlist.clone()));
                        self.push_page(page);
                        self.focus = Focus::Page;
                    }
                    None => {}
                }
            }
            Focus::Page => {
                let Some(entry) = self.pages.top() else {
                    return Ok(());
                };
                let (Some(content), Some(row)) = (entry.content(), entry.selected()) else {
                    return Ok(());
                };

                let page: Arc<dyn Page> = match content.rows().get(row) {
                    Some(Row::Item { item: Item::Track(_), .. }) => {
                        if let (Some(context), Some(controller)) =
                            (content.context_at(row), &mut self.controller)
                        {
                            controller.play_context(context)?;
                        }
                        return Ok(());
                    }
                    Some(Row::Item { item: Item::Album(album), .. }) => {
                        Arc::new(AlbumPage::new((*album).clone()))
                    }
                    Some(Row::Item { item: Item::Artist(artist), .. }) => {
                        Arc::new(ArtistPage::new((*artist).clone()))
                    }
                    Some(Row::Item { item: Item::Playlist(playlist), .. }) => {
                        Arc::new(PlaylistPage::new((*playlist).clone()))
                    }
                    Some(Row::Item { item: Item::Mix(mix), .. }) => {
                        Arc::new(MixPage::new((*mix).clone()))
                    }
                    _ => return Ok(()),
                };
                self.push_page(page);
            }
            Focus::Queue => {
                let row = self.selected_queue_row();
                let Some(controller) = &mut self.controller else {
                    return Ok(());
                };
                match row {
                    Some(QueueRow::Queued(index)) => {
                        if let Some(track) = controller.remove_from_queue(index) {
                            controller.play_track(track)?;
                        }
                    }
                    Some(QueueRow::Context(index)) => {
                        let context = controller.context().clone().starting_at(index);
                        controller.play_context(context)?;
                    }
                    None => {}
                }
                let len = self.queue_len();
                self.queue.clamp(len);
            }
        }
        Ok(())
    }

    /// Open a sidebar destination.
    fn navigate(&mut self, destination: SidebarDestination) {
        self.focus = Focus::Page;
        match destination {
            SidebarDestination::Home => {
                if !self.pages.pop_to_tag(HOME_TAG) {
                    self.show_home();
                }
            }
            SidebarDestination::Explore => self.push_page(Arc::new(ExplorePage)),
            SidebarDestination::FavoriteTracks
            | SidebarDestination::FavoriteMixes
            | SidebarDestination::FavoriteArtists
            | SidebarDestination::FavoritePlaylists
            | SidebarDestination::FavoriteAlbums => {
                if let Some(kind) = destination.favorite_kind() {
                    self.push_page(Arc::new(FavoritesPage::new(kind)));
                }
            }
        }
    }

    /// Push a page and start loading it.
    fn push_page(&mut self, page: Arc<dyn Page>) {
        let (id, token) = self.pages.push(page.clone());
        spawn_load(id, page, self.catalog.clone(), token, self.action_tx.clone());
    }

    /// Replace the stack with a fresh home page.
    fn show_home(&mut self) {
        let page: Arc<dyn Page> = Arc::new(HomePage);
        let (id, token) = self.pages.reset(page.clone());
        spawn_load(id, page, self.catalog.clone(), token, self.action_tx.clone());
    }

    /// Radio of the selected track or artist, or of the artist page on top.
    fn start_radio(&mut self) {
        let selected = self.selected_item();
        let page = self.pages.top().map(|entry| entry.page.as_ref());
        if let Some(seed) = radio_seed(selected, page) {
            self.push_page(Arc::new(RadioPage::new(seed)));
        }
    }

    fn handle_track_action(&mut self, track_action: TrackAction) {
        let Some(SelectedItem::Track(track)) = self.selected_item() else {
            return;
        };

        match track_action {
            TrackAction::StartRadio => self.start_radio(),
            TrackAction::PlayNext => {
                if let Some(controller) = &mut self.controller {
                    let notice = format!("Playing next: {}", track.title);
                    controller.queue_next(track);
                    self.set_notice(notice);
                }
            }
            TrackAction::AddToQueue => {
                if let Some(controller) = &mut self.controller {
                    let notice = format!("Added to queue: {}", track.title);
                    controller.add_to_queue(track);
                    self.set_notice(notice);
                }
            }
            TrackAction::AddToCollection => {
                self.set_notice("Adding to your collection is not implemented yet");
            }
            TrackAction::AddToPlaylist => {
                self.set_notice("Adding to a playlist is not implemented yet");
            }
        }
    }

    /// Item under the cursor of the focused panel.
    fn selected_item(&self) -> Option<SelectedItem> {
        match self.focus {
            Focus::Sidebar => None,
            Focus::Page => {
                let entry = self.pages.top()?;
                let row = entry.selected()?;
                match entry.content()?.rows().get(row)? {
                    Row::Item { item: Item::Track(track), .. } => {
                        Some(SelectedItem::Track((*track).clone()))
                    }
                    Row::Item { item: Item::Album(album), .. } => {
                        Some(SelectedItem::Album((*album).clone()))
                    }
                    Row::Item { item: Item::Artist(artist), .. } => {
                        Some(SelectedItem::Artist((*artist).clone()))
                    }
                    _ => None,
                }
            }
            Focus::Queue => {
                let controller = self.controller.as_ref()?;
                let track = match self.selected_queue_row()? {
                    QueueRow::Queued(index) => controller.queue().get(index)?,
                    QueueRow::Context(index) => controller.context().tracks().get(index)?,
                };
                Some(SelectedItem::Track(track.clone()))
            }
        }
    }

    /// Tracks of the selected section (or the first track section) of the top page.
    fn page_context(&self) -> Option<PlaybackContext> {
        let content = self.pages.top()?.content()?;
        self.pages
            .top()
            .and_then(|entry| entry.selected())
            .and_then(|row| content.context_at(row))
            .map(|context| context.starting_at(0))
            .or_else(|| content.first_track_context())
    }

    fn queue_panel_visible(&self) -> bool {
        self.queue.visible && !self.lyrics.visible
    }

    /// Rows of the queue panel: queued tracks, then the rest of the context.
    fn queue_len(&self) -> usize {
        self.controller
            .as_ref()
            .map_or(0, |c| c.queue().len() + c.context().upcoming().len())
    }

    fn selected_queue_row(&self) -> Option<QueueRow> {
        let controller = self.controller.as_ref()?;
        self.queue.selected_row(
            controller.queue().len(),
            controller.context().index(),
            controller.context().upcoming().len(),
        )
    }

    fn seek_relative(&mut self, delta_secs: f64) -> Result<()> {
        let duration = self.now_playing.duration;
        if let Some(controller) = &mut self.controller {
            let target = (controller.last_position() + delta_secs).clamp(0.0, duration.max(0.0));
            if controller.seek(target)? {
                self.now_playing.position = target;
            }
        }
        Ok(())
    }

    fn change_volume(&mut self, delta: f32) -> Result<()> {
        if let Some(controller) = &mut self.controller {
            // Stored in tenths, so keep the gain on that grid
            let volume = ((controller.volume() + delta) * 10.0).round() / 10.0;
            apply_volume(controller, &mut self.config, volume)?;
            self.now_playing.volume = controller.volume();
            self.save_config();
        }
        Ok(())
    }

    /// Start the OAuth device login in the background.
    fn start_login(&mut self) {
        if let Some(cancel) = self.login_cancel.take() {
            cancel.cancel();
        }
        let cancel = CancellationToken::new();
        self.login_cancel = Some(cancel.clone());

        let client = self.client.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let device = match client.oauth().start_device_login().await {
                Ok(device) => device,
                Err(e) => {
                    let _ = tx.send(Action::LoginFailed(e.to_string()));
                    return;
                }
            };
            tracing::info!("Waiting for device login at {}", device.link());
            let _ = tx.send(Action::LoginPrompt(device.clone()));

            match client.oauth().wait_for_device_token(&device, &cancel).await {
                Ok(tokens) => {
                    let _ = tx.send(Action::LoginCompleted(tokens));
                }
                Err(AuthError::Cancelled) => {
                    tracing::debug!("Device login cancelled");
                }
                Err(e) => {
                    let _ = tx.send(Action::LoginFailed(e.to_string()));
                }
            }
        });
    }

    fn load_sidebar_playlists(&self) {
        let catalog = self.catalog.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match catalog.favorite_playlists().await {
                Ok(playlists) => {
                    let _ = tx.send(Action::SidebarPlaylistsLoaded(playlists));
                }
                Err(e) => tracing::warn!("Failed to load sidebar playlists: {}", e),
            }
        });
    }

    /// Cue the track that was playing when the app last quit.
    fn restore_last_playing(&self) {
        let Some(song_id) = self.config.playback.last_playing_song_id.clone() else {
            return;
        };
        let list_id = self.config.playback.last_playing_list_id.clone();
        let catalog = self.catalog.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Some((track, context)) =
                restore_playback(catalog.as_ref(), &song_id, list_id.as_deref()).await
            {
                let _ = tx.send(Action::PlaybackRestored { track, context });
            }
        });
    }

    /// Create a playlist in the background and add it to the sidebar.
    fn create_playlist(&mut self, title: String) {
        self.set_notice(format!("Creating playlist {title}..."));
        let catalog = self.catalog.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match catalog.create_playlist(&title, "").await {
                Ok(playlist) => Action::PlaylistCreated(playlist),
                Err(e) => {
                    tracing::warn!("Failed to create playlist {:?}: {}", title, e);
                    Action::Error(format!("Could not create playlist: {e}"))
                }
            };
            let _ = tx.send(action);
        });
    }

    fn load_lyrics(&mut self, track_id: String) {
        self.lyrics.start_loading(&track_id);
        let catalog = self.catalog.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let lyrics = match catalog.lyrics(&track_id).await {
                Ok(lyrics) => Some(lyrics),
                Err(e) => {
                    tracing::warn!("Failed to load lyrics: {}", e);
                    None
                }
            };
            let _ = tx.send(Action::LyricsLoaded(track_id, lyrics));
        });
    }

    fn download_playing(&mut self) {
        let Some(track) = self.now_playing.track.clone() else {
            self.set_notice("Nothing is playing");
            return;
        };
        self.set_notice(format!("Downloading {}...", track.title));

        let catalog = self.catalog.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let notice = match download_track(catalog.as_ref(), &track, &PathBuf::from(".")).await {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => {
                    tracing::warn!("Download of {} failed: {}", track.id, e);
                    format!("Download failed: {e}")
                }
            };
            let _ = tx.send(Action::Notice(notice));
        });
    }

    /// Fetch an image in the background. Skipped without terminal graphics.
    fn spawn_image(&self, owner: ImageOwner, image: ImageRef, token: Option<CancellationToken>) {
        if self.picker.is_none() {
            return;
        }
        let images = self.images.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let alive = || !token.as_ref().is_some_and(|t| t.is_cancelled());
            if !alive() {
                return;
            }
            let ImageRef { entity_id, url } = image;
            if let Some(path) = images.fetch(&entity_id, move || Some(url)).await {
                if alive() {
                    let _ = tx.send(Action::ImageReady { owner, path });
                }
            }
        });
    }

    /// Decode a fetched image for its owner, if the owner is still around.
    fn apply_image(&mut self, owner: ImageOwner, path: PathBuf) {
        let Some(picker) = self.picker.as_ref() else {
            return;
        };

        let live = match &owner {
            ImageOwner::Page(id) => self
                .pages
                .get_mut(*id)
                .is_some_and(|entry| !entry.cancel.is_cancelled()),
            ImageOwner::NowPlaying(track_id) => {
                self.now_playing.track_id() == Some(track_id.as_str())
            }
        };
        if !live {
            tracing::debug!("Dropping image for closed owner {:?}", owner);
            return;
        }

        let image = match image::open(&path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Failed to decode {}: {}", path.display(), e);
                return;
            }
        };
        let protocol = picker.new_resize_protocol(image);

        match owner {
            ImageOwner::Page(id) => {
                if let Some(entry) = self.pages.get_mut(id) {
                    entry.art = Some(protocol);
                }
            }
            ImageOwner::NowPlaying(_) => {
                self.now_playing.album_art = Some(protocol);
            }
        }
    }

    fn persist_tokens(&mut self) {
        self.config.store_tokens(&self.client.session_snapshot());
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!("{}", text);
        self.message = Some(Message {
            text,
            is_error: true,
        });
    }
}

/// What a row action applies to.
enum SelectedItem {
    Track(Track),
    Album(Album),
    Artist(Artist),
}

/// Radio for the selected row, falling back to what the page itself seeds.
fn radio_seed(selected: Option<SelectedItem>, page: Option<&dyn Page>) -> Option<RadioSeed> {
    match selected {
        Some(SelectedItem::Track(track)) => Some(RadioSeed::Track(track)),
        Some(SelectedItem::Artist(artist)) => Some(RadioSeed::Artist(artist)),
        _ => page.and_then(|page| page.radio_seed()),
    }
}

/// Record the playing track and its list for the next start.
fn remember_playing<P: Pipeline>(config: &mut Config, controller: &PlayerController<P>) {
    let song_id = controller.current_track().map(|t| t.id.clone());
    let list_id = controller.context().source().list_id();
    config.remember_playing(song_id, list_id);
}

/// Set the output gain and the saved volume. Returns the saved tenths.
fn apply_volume<P: Pipeline>(
    controller: &mut PlayerController<P>,
    config: &mut Config,
    volume: f32,
) -> Result<i32, PlaybackError> {
    controller.change_volume(volume)?;
    Ok(config.set_volume(controller.volume()))
}

/// Sidebar playlists with a newly created one on top.
fn with_created_playlist(playlists: &[Playlist], created: Playlist) -> Vec<Playlist> {
    let others = playlists.iter().filter(|p| p.id != created.id).cloned();
    std::iter::once(created.clone()).chain(others).collect()
}

/// Look up the last played track and rebuild the list it was played from.
///
/// Returns `None` when the track is gone. An unknown or unloadable list
/// restores the track alone.
pub(crate) async fn restore_playback(
    api: &dyn Catalog,
    song_id: &str,
    list_id: Option<&str>,
) -> Option<(Track, Option<PlaybackContext>)> {
    let track = match api.track(song_id).await {
        Ok(track) => track,
        Err(e) => {
            tracing::warn!("Could not restore track {}: {}", song_id, e);
            return None;
        }
    };

    let source = match list_id.map(str::parse::<ContextSource>) {
        Some(Ok(source)) => source,
        Some(Err(e)) => {
            tracing::warn!("Ignoring saved list: {}", e);
            return Some((track, None));
        }
        None => return Some((track, None)),
    };

    let tracks = match &source {
        ContextSource::Album(id) => api.album_tracks(id).await,
        ContextSource::Playlist(id) => api.playlist_tracks(id).await,
        ContextSource::Mix(id) => api.mix_tracks(id).await,
        ContextSource::Artist(id) => api.artist_top_tracks(id).await,
        ContextSource::TrackRadio(id) => api.track_radio(id).await,
        ContextSource::ArtistRadio(id) => api.artist_radio(id).await,
        ContextSource::Adhoc => return Some((track, None)),
    };

    let context = match tracks {
        Ok(tracks) => {
            let index = tracks.iter().position(|t| t.id == track.id).unwrap_or(0);
            Some(PlaybackContext::new(source, tracks).starting_at(index))
        }
        Err(e) => {
            tracing::warn!("Could not restore list {}: {}", source, e);
            None
        }
    };
    Some((track, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{album, artist, playlist, FakeCatalog};
    use crate::player::context::tests::{track, tracks};
    use crate::player::controller::tests::{context, controller, Call};

    fn catalog() -> FakeCatalog {
        FakeCatalog {
            tracks: tracks(&["a", "b", "c"]),
            ..FakeCatalog::default()
        }
    }

    #[tokio::test]
    async fn test_restore_rebuilds_context_at_track() {
        let (track, context) = restore_playback(&catalog(), "b", Some("album:42"))
            .await
            .unwrap();
        assert_eq!(track.id, "b");

        let context = context.unwrap();
        assert_eq!(context.source(), &ContextSource::Album(String::from("42")));
        assert_eq!(context.index(), 1);
        assert_eq!(context.len(), 3);
    }

    #[tokio::test]
    async fn test_restore_without_list() {
        let (track, context) = restore_playback(&catalog(), "c", None).await.unwrap();
        assert_eq!(track.id, "c");
        assert!(context.is_none());

        let (_, context) = restore_playback(&catalog(), "c", Some("bogus")).await.unwrap();
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn test_restore_keeps_track_when_list_fails() {
        let catalog = FakeCatalog {
            failing: vec!["playlist_tracks"],
            ..catalog()
        };
        let (track, context) = restore_playback(&catalog, "a", Some("playlist:p"))
            .await
            .unwrap();
        assert_eq!(track.id, "a");
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn test_restore_missing_track() {
        assert!(restore_playback(&catalog(), "zzz", Some("album:1")).await.is_none());
    }

    #[test]
    fn test_radio_follows_selected_row() {
        let artist_page = ArtistPage::new(artist("5"));

        assert_eq!(
            radio_seed(Some(SelectedItem::Track(track("1"))), Some(&artist_page)),
            Some(RadioSeed::Track(track("1")))
        );
        assert_eq!(
            radio_seed(Some(SelectedItem::Artist(artist("7"))), Some(&HomePage)),
            Some(RadioSeed::Artist(artist("7")))
        );
    }

    #[test]
    fn test_radio_falls_back_to_artist_page() {
        let artist_page = ArtistPage::new(artist("5"));

        assert_eq!(
            radio_seed(None, Some(&artist_page)),
            Some(RadioSeed::Artist(artist("5")))
        );
        assert_eq!(
            radio_seed(Some(SelectedItem::Album(album("10"))), Some(&artist_page)),
            Some(RadioSeed::Artist(artist("5")))
        );
        assert_eq!(radio_seed(None, Some(&HomePage)), None);
        assert_eq!(radio_seed(None, None), None);
    }

    #[test]
    fn test_remember_playing_records_track_and_list() {
        let (mut player, _rx) = controller();
        player.play_context(context(&["a", "b"])).unwrap();
        player.play_next().unwrap();

        let mut config = Config::default();
        remember_playing(&mut config, &player);
        assert_eq!(config.playback.last_playing_song_id.as_deref(), Some("b"));
        assert_eq!(config.playback.last_playing_list_id.as_deref(), Some("album:1"));
    }

    #[test]
    fn test_track_change_is_saved_right_away() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut config = Config::load(Some(path.as_path())).unwrap();
        config.ui.image_cache_dir = dir.path().join("tmp_img");

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(config, tx, None);
        app.handle_notification(PlayerNotification::TrackChanged(track("a")));

        let saved = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(saved.playback.last_playing_song_id.as_deref(), Some("a"));
        assert_eq!(saved.playback.last_playing_list_id, None);
        assert_eq!(app.now_playing.track_id(), Some("a"));
    }

    #[test]
    fn test_volume_change_persists_tenths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut config = Config::load(Some(path.as_path())).unwrap();
        let (mut player, _rx) = controller();

        assert_eq!(apply_volume(&mut player, &mut config, 0.47).unwrap(), 4);
        assert_eq!(player.pipeline().count(&Call::Volume(0.47)), 1);
        config.save().unwrap();

        let saved = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(saved.player.last_volume, 4);
        assert_eq!(saved.volume(), 0.4);
    }

    #[tokio::test]
    async fn test_created_playlist_goes_on_top_of_sidebar() {
        let created = catalog().create_playlist("Road trip", "").await.unwrap();
        assert_eq!(created.title, "Road trip");
        assert_eq!(created.description, None);

        let sidebar = vec![playlist("p1"), playlist("new")];
        let ids: Vec<_> = with_created_playlist(&sidebar, created)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["new", "p1"]);
    }

    #[tokio::test]
    async fn test_create_playlist_failure_is_reported() {
        let catalog = FakeCatalog {
            failing: vec!["create_playlist"],
            ..FakeCatalog::default()
        };
        assert!(catalog.create_playlist("Road trip", "").await.is_err());
    }
}
