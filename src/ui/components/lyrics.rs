//! Lyrics display component.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::client::models::Lyrics;

/// One lyric line; `start_ms` is set for synchronised lyrics.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub start_ms: Option<u64>,
    pub text: String,
}

/// Lyrics display state.
#[derive(Debug, Default)]
pub struct LyricsState {
    /// Whether lyrics panel is visible
    pub visible: bool,

    /// Lines of the loaded lyrics
    pub lines: Vec<LyricLine>,

    /// Whether the lines carry timestamps
    pub synced: bool,

    /// Track the lyrics belong to
    pub track_id: Option<String>,

    /// Whether currently loading
    pub loading: bool,

    /// Current line index (for synced lyrics)
    pub current_line: usize,

    pub scroll_state: ListState,
}

impl LyricsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle lyrics visibility.
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Mark lyrics of `track_id` as loading.
    pub fn start_loading(&mut self, track_id: &str) {
        self.clear();
        self.track_id = Some(track_id.to_string());
        self.loading = true;
    }

    /// Set lyrics, preferring timed subtitles over plain text.
    pub fn set_lyrics(&mut self, track_id: String, lyrics: Option<Lyrics>) {
        self.track_id = Some(track_id);
        self.loading = false;
        self.current_line = 0;

        let subtitles = lyrics.as_ref().and_then(|l| l.subtitles.as_deref());
        let synced = subtitles.map(parse_lrc).unwrap_or_default();
        if !synced.is_empty() {
            self.lines = synced;
            self.synced = true;
        } else {
            self.lines = lyrics
                .and_then(|l| l.lyrics)
                .unwrap_or_default()
                .lines()
                .map(|line| LyricLine {
                    start_ms: None,
                    text: line.to_string(),
                })
                .collect();
            self.synced = false;
        }
        self.scroll_state
            .select((!self.lines.is_empty()).then_some(0));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.synced = false;
        self.track_id = None;
        self.loading = false;
        self.current_line = 0;
        self.scroll_state.select(None);
    }

    /// Follow the playback position (in milliseconds) for synced lyrics.
    pub fn update_position(&mut self, position_ms: u64) {
        if !self.synced {
            return;
        }

        let mut new_line = 0;
        for (i, line) in self.lines.iter().enumerate() {
            match line.start_ms {
                Some(start) if start <= position_ms => new_line = i,
                Some(_) => break,
                None => {}
            }
        }

        if new_line != self.current_line {
            self.current_line = new_line;
            self.scroll_state.select(Some(new_line));
        }
    }
}

/// Parse LRC subtitles (`[mm:ss.xx] text`) into timed lines.
///
/// Lines without a valid timestamp are skipped.
pub fn parse_lrc(subtitles: &str) -> Vec<LyricLine> {
    subtitles
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('[')?;
            let (stamp, text) = rest.split_once(']')?;
            let (minutes, seconds) = stamp.split_once(':')?;
            let minutes: u64 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            Some(LyricLine {
                start_ms: Some(minutes * 60_000 + (seconds * 1000.0).round() as u64),
                text: text.trim().to_string(),
            })
        })
        .collect()
}

/// Render the lyrics panel.
pub fn render_lyrics(frame: &mut Frame, area: Rect, state: &mut LyricsState) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Lyrics [L to close]")
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.loading {
        let loading =
            Paragraph::new("Loading lyrics...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, inner);
        return;
    }

    if state.lines.is_empty() {
        let no_lyrics =
            Paragraph::new("No lyrics available").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(no_lyrics, inner);
        return;
    }

    let current = state.current_line;
    let synced = state.synced;
    let items: Vec<ListItem> = state
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let style = if !synced {
                Style::default().fg(Color::White)
            } else if i == current {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else if i < current {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(Span::styled(line.text.as_str(), style)))
        })
        .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, inner, &mut state.scroll_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    const LRC: &str = "[00:01.50] First\n[00:04.00] Second\nnot a line\n[01:02.25] Third";

    #[test]
    fn test_parse_lrc() {
        let lines = parse_lrc(LRC);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].start_ms, Some(1500));
        assert_eq!(lines[2].start_ms, Some(62_250));
        assert_eq!(lines[2].text, "Third");
    }

    #[test]
    fn test_synced_lyrics_follow_position() {
        let mut state = LyricsState::new();
        state.set_lyrics(
            String::from("1"),
            Some(Lyrics {
                lyrics: Some(String::from("First\nSecond\nThird")),
                subtitles: Some(LRC.to_string()),
            }),
        );
        assert!(state.synced);

        state.update_position(4_500);
        assert_eq!(state.current_line, 1);
        state.update_position(100_000);
        assert_eq!(state.current_line, 2);
    }

    #[test]
    fn test_plain_lyrics_fallback() {
        let mut state = LyricsState::new();
        state.set_lyrics(
            String::from("1"),
            Some(Lyrics {
                lyrics: Some(String::from("a\nb")),
                subtitles: None,
            }),
        );
        assert!(!state.synced);
        assert_eq!(state.lines.len(), 2);

        state.update_position(10_000);
        assert_eq!(state.current_line, 0);

        state.set_lyrics(String::from("2"), None);
        assert!(state.lines.is_empty());
        assert_eq!(state.scroll_state.selected(), None);
    }
}
