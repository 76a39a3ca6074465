//! UI components module.

pub mod entry;
pub mod lyrics;
pub mod now_playing;
pub mod page_view;
pub mod queue;
pub mod sidebar;

pub use entry::{render_entry, EntryState};
pub use lyrics::{render_lyrics, LyricsState};
pub use now_playing::{render_now_playing, NowPlayingState};
pub use page_view::render_page;
pub use queue::{render_queue, QueueRow, QueueState};
pub use sidebar::{render_sidebar, SidebarEntry, SidebarState};
