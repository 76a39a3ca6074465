//! Up-next panel: queued tracks followed by the rest of the context.

use std::collections::VecDeque;

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::client::models::Track;

/// Queue panel state.
#[derive(Debug, Default)]
pub struct QueueState {
    pub list_state: ListState,

    /// Whether the queue is visible
    pub visible: bool,
}

/// What a queue panel row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRow {
    /// Index into the user queue
    Queued(usize),
    /// Index into the playback context
    Context(usize),
}

impl QueueState {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            ..Default::default()
        }
    }

    /// Resolve the selected row against the current queue and context.
    ///
    /// Context rows start right after the current context index.
    pub fn selected_row(&self, queued: usize, context_index: usize, upcoming: usize) -> Option<QueueRow> {
        let row = self.list_state.selected()?;
        if row < queued {
            Some(QueueRow::Queued(row))
        } else if row < queued + upcoming {
            Some(QueueRow::Context(context_index + 1 + row - queued))
        } else {
            None
        }
    }

    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let next = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i.min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let prev = self.list_state.selected().unwrap_or(0).saturating_sub(1);
        self.list_state.select(Some(prev.min(len - 1)));
    }

    /// Keep the selection inside a list of `len` rows.
    pub fn clamp(&mut self, len: usize) {
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }
}

/// Render the queue panel.
pub fn render_queue(
    frame: &mut Frame,
    area: Rect,
    state: &mut QueueState,
    queued: &VecDeque<Track>,
    upcoming: &[Track],
    focused: bool,
) {
    let title = format!("Up Next ({} queued)", queued.len());
    let border_color = if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(border_color));

    let row = |track: &Track, queued: bool| {
        let style = if queued {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        };
        ListItem::new(Line::from(vec![
            Span::styled(if queued { "+ " } else { "  " }, style),
            Span::styled(track.title.clone(), style),
            Span::styled(
                format!(" {}", track.duration_string()),
                Style::default().fg(Color::DarkGray),
            ),
        ]))
    };

    let items: Vec<ListItem> = queued
        .iter()
        .map(|t| row(t, true))
        .chain(upcoming.iter().map(|t| row(t, false)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut state.list_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_map_to_queue_then_context() {
        let mut state = QueueState::new(true);
        state.list_state.select(Some(1));
        assert_eq!(state.selected_row(2, 4, 3), Some(QueueRow::Queued(1)));

        state.list_state.select(Some(2));
        assert_eq!(state.selected_row(2, 4, 3), Some(QueueRow::Context(5)));

        state.list_state.select(Some(9));
        assert_eq!(state.selected_row(2, 4, 3), None);
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut state = QueueState::new(true);
        state.select_next(2);
        state.select_next(2);
        state.select_next(2);
        assert_eq!(state.list_state.selected(), Some(1));

        state.clamp(1);
        assert_eq!(state.list_state.selected(), Some(0));
        state.clamp(0);
        assert_eq!(state.list_state.selected(), None);
    }
}
