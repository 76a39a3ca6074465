//! Transport bar component.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use ratatui_image::{protocol::StatefulProtocol, StatefulImage};

use crate::action::{PlayerState, RepeatMode};
use crate::client::models::{pretty_duration, Quality, Track};

/// Transport bar state, fed by player notifications.
#[derive(Default)]
pub struct NowPlayingState {
    /// Current track
    pub track: Option<Track>,

    pub state: PlayerState,

    /// Current position in seconds
    pub position: f64,

    /// Total duration in seconds
    pub duration: f64,

    /// Linear volume (0.0 to 1.0)
    pub volume: f32,

    pub shuffle: bool,

    pub repeat: RepeatMode,

    pub quality: Quality,

    /// Cover of the current track (for Sixel/Kitty/etc.)
    pub album_art: Option<StatefulProtocol>,
}

impl NowPlayingState {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Self::default()
        }
    }

    /// Get progress as a ratio (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.position / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn position_string(&self) -> String {
        pretty_duration(self.position as u32)
    }

    pub fn duration_string(&self) -> String {
        pretty_duration(self.duration as u32)
    }

    /// Get play/pause symbol.
    pub fn state_symbol(&self) -> &'static str {
        match self.state {
            PlayerState::Playing => " ",
            PlayerState::Paused => " ",
            PlayerState::Stopped => " ",
        }
    }

    pub fn shuffle_symbol(&self) -> &'static str {
        if self.shuffle {
            "󰒟 "
        } else {
            "  "
        }
    }

    /// Get volume symbol based on level.
    pub fn volume_symbol(&self) -> &'static str {
        if self.volume <= 0.0 {
            "󰝟 "
        } else if self.volume < 0.3 {
            "󰕿 "
        } else if self.volume < 0.7 {
            "󰖀 "
        } else {
            "󰕾 "
        }
    }

    /// Show a new track; the old cover is dropped until the new one arrives.
    pub fn set_track(&mut self, track: Track) {
        self.duration = track.duration as f64;
        self.position = 0.0;
        self.album_art = None;
        self.track = Some(track);
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.id.as_str())
    }
}

/// Render the transport bar.
pub fn render_now_playing(frame: &mut Frame, area: Rect, state: &mut NowPlayingState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", state.quality.label()))
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if area.height < 4 {
        return;
    }

    // Layout: [album art] [info + progress]
    let has_album_art = state.album_art.is_some();
    let art_width = (inner.height * 2).min(8);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if has_album_art {
            vec![Constraint::Length(art_width), Constraint::Min(20)]
        } else {
            vec![Constraint::Min(20)]
        })
        .split(inner);

    let info_area = if has_album_art {
        main_chunks[1]
    } else {
        main_chunks[0]
    };

    if let Some(protocol) = state.album_art.as_mut() {
        frame.render_stateful_widget(StatefulImage::default(), main_chunks[0], protocol);
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Track info
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Progress bar
        ])
        .split(info_area);

    let info_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(3),  // Play state
            Constraint::Min(20),    // Track info
            Constraint::Length(36), // Time + modes + volume
        ])
        .split(chunks[0]);

    let state_symbol =
        Paragraph::new(state.state_symbol()).style(Style::default().fg(Color::Green));
    frame.render_widget(state_symbol, info_chunks[0]);

    if let Some(track) = &state.track {
        let info = Line::from(vec![
            Span::styled(
                &track.title,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" - ", Style::default().fg(Color::DarkGray)),
            Span::styled(&track.artist.name, Style::default().fg(Color::Cyan)),
            Span::styled(" • ", Style::default().fg(Color::DarkGray)),
            Span::styled(&track.album.title, Style::default().fg(Color::Yellow)),
        ]);
        frame.render_widget(Paragraph::new(info), info_chunks[1]);
    } else {
        let nothing = Paragraph::new("Nothing playing").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(nothing, info_chunks[1]);
    }

    let time_str = format!(
        "{} / {}  {} {} {}{}",
        state.position_string(),
        state.duration_string(),
        state.shuffle_symbol(),
        state.repeat.symbol(),
        state.volume_symbol(),
        volume_bar(state.volume)
    );
    let time = Paragraph::new(time_str).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(time, info_chunks[2]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::DarkGray))
        .ratio(state.progress())
        .label("");
    frame.render_widget(gauge, chunks[2]);
}

/// Render a small volume bar.
fn volume_bar(volume: f32) -> String {
    let filled = ((volume.clamp(0.0, 1.0) * 10.0).round() as usize).min(10);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(10 - filled))
}
