//! Single-line text entry used for search and new playlist titles.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::action::EntryPurpose;

/// Text entry state.
#[derive(Debug, Default)]
pub struct EntryState {
    /// Whether the entry is open
    pub active: bool,

    pub purpose: EntryPurpose,

    pub text: String,
}

impl EntryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, purpose: EntryPurpose) {
        self.active = true;
        self.purpose = purpose;
        self.text.clear();
    }

    pub fn close(&mut self) {
        self.active = false;
        self.text.clear();
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Close the entry and hand out the trimmed text, if there is any.
    pub fn submit(&mut self) -> Option<(EntryPurpose, String)> {
        let text = self.text.trim().to_string();
        self.close();
        (!text.is_empty()).then_some((self.purpose, text))
    }
}

/// Render the entry at the top of `area`.
pub fn render_entry(frame: &mut Frame, area: Rect, state: &EntryState) {
    let width = area.width.saturating_sub(4).min(60);
    let entry = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + 1,
        width,
        height: 3,
    };
    frame.render_widget(Clear, entry);

    let title = match state.purpose {
        EntryPurpose::Search => "Search [Enter to search, Esc to cancel]",
        EntryPurpose::NewPlaylist => "New playlist [Enter to create, Esc to cancel]",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(entry);
    let paragraph = Paragraph::new(state.text.as_str())
        .style(Style::default().fg(Color::White))
        .block(block);
    frame.render_widget(paragraph, entry);

    let cursor_x = inner.x + (state.text.width() as u16).min(inner.width.saturating_sub(1));
    frame.set_cursor_position((cursor_x, inner.y));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_trims_and_closes() {
        let mut state = EntryState::new();
        state.open(EntryPurpose::Search);
        for c in "  daft punk ".chars() {
            state.push(c);
        }
        assert_eq!(
            state.submit(),
            Some((EntryPurpose::Search, String::from("daft punk")))
        );
        assert!(!state.active);
        assert!(state.text.is_empty());
    }

    #[test]
    fn test_blank_text_is_not_submitted() {
        let mut state = EntryState::new();
        state.open(EntryPurpose::NewPlaylist);
        state.push(' ');
        state.backspace();
        state.backspace();
        assert_eq!(state.submit(), None);
    }

    #[test]
    fn test_reopening_switches_purpose_and_clears() {
        let mut state = EntryState::new();
        state.open(EntryPurpose::Search);
        state.push('x');
        state.open(EntryPurpose::NewPlaylist);
        assert!(state.text.is_empty());
        state.push('y');
        assert_eq!(
            state.submit(),
            Some((EntryPurpose::NewPlaylist, String::from("y")))
        );
    }
}
