//! Sidebar: fixed destinations followed by the user's playlists.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::action::SidebarDestination;
use crate::client::models::Playlist;

/// What a sidebar row opens.
#[derive(Debug, Clone, PartialEq)]
pub enum SidebarEntry<'a> {
    Destination(SidebarDestination),
    Playlist(&'a Playlist),
}

#[derive(Debug)]
pub struct SidebarState {
    /// Favourite playlists, loaded after startup
    pub playlists: Vec<Playlist>,
    pub list_state: ListState,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            playlists: Vec::new(),
            list_state: ListState::default().with_selected(Some(0)),
        }
    }
}

impl SidebarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        SidebarDestination::ALL.len() + self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, row: usize) -> Option<SidebarEntry<'_>> {
        match SidebarDestination::ALL.get(row) {
            Some(dest) => Some(SidebarEntry::Destination(*dest)),
            None => self
                .playlists
                .get(row - SidebarDestination::ALL.len())
                .map(SidebarEntry::Playlist),
        }
    }

    pub fn selected(&self) -> Option<SidebarEntry<'_>> {
        self.entry(self.list_state.selected()?)
    }

    pub fn set_playlists(&mut self, playlists: Vec<Playlist>) {
        self.playlists = playlists;
        if self.list_state.selected().is_some_and(|i| i >= self.len()) {
            self.list_state.select(Some(self.len() - 1));
        }
    }

    pub fn select_next(&mut self) {
        let next = self
            .list_state
            .selected()
            .map_or(0, |i| (i + 1).min(self.len() - 1));
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let prev = self.list_state.selected().unwrap_or(0).saturating_sub(1);
        self.list_state.select(Some(prev));
    }

    pub fn select_first(&mut self) {
        self.list_state.select(Some(0));
    }

    pub fn select_last(&mut self) {
        self.list_state.select(Some(self.len() - 1));
    }
}

/// Render the sidebar.
pub fn render_sidebar(frame: &mut Frame, area: Rect, state: &mut SidebarState, focused: bool) {
    let border_color = if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title("tide-tui")
        .border_style(Style::default().fg(border_color));

    let mut items: Vec<ListItem> = Vec::with_capacity(state.len() + 1);
    for (i, dest) in SidebarDestination::ALL.iter().enumerate() {
        // Favourites are indented under the editorial pages
        let indent = if dest.favorite_kind().is_some() { "  " } else { "" };
        items.push(ListItem::new(format!("{} {}{}", i + 1, indent, dest.title())));
    }
    items.extend(state.playlists.iter().map(|p| {
        ListItem::new(Line::from(vec![
            Span::styled("♫ ", Style::default().fg(Color::Magenta)),
            Span::raw(p.title.as_str()),
        ]))
    }));

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
    use crate::client::catalog::tests::playlist;

    #[test]
    fn test_playlists_follow_destinations() {
        let mut state = SidebarState::new();
        state.set_playlists(vec![playlist("p1"), playlist("p2")]);
        assert_eq!(state.len(), 9);
        assert_eq!(
            state.entry(0),
            Some(SidebarEntry::Destination(SidebarDestination::Home))
        );
        assert!(matches!(state.entry(8), Some(SidebarEntry::Playlist(p)) if p.id == "p2"));
        assert_eq!(state.entry(9), None);
    }

    #[test]
    fn test_selection_clamped_when_playlists_shrink() {
        let mut state = SidebarState::new();
        state.set_playlists(vec![playlist("p1")]);
        state.select_last();
        assert_eq!(state.list_state.selected(), Some(7));

        state.set_playlists(Vec::new());
        assert_eq!(state.list_state.selected(), Some(6));
        state.select_next();
        assert_eq!(state.list_state.selected(), Some(6));
    }
}
