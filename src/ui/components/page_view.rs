//! The open page: breadcrumb, header and section rows.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState},
    Frame,
};
use ratatui_image::StatefulImage;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::client::models::{pretty_duration, Track};
use crate::pages::{Item, PageEntry, PageHeader, PageState, Row};

/// Width of the duration column.
const DURATION_WIDTH: u16 = 8;

/// Cut `text` to `width` terminal columns, ending in `…` when shortened.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Column widths for title, album and artist in a row of `width` columns.
fn track_columns(width: u16) -> [usize; 3] {
    let rest = width.saturating_sub(DURATION_WIDTH + 5) as usize;
    let title = rest * 2 / 5;
    let album = rest * 3 / 10;
    [title, album, rest - title - album]
}

/// Cells of a track row: title, album, artist, duration.
pub fn track_cells(track: &Track, widths: [usize; 3]) -> [String; 4] {
    let title = if track.explicit {
        format!("{} 🅴", track.title)
    } else {
        track.title.clone()
    };
    [
        fit(&title, widths[0]),
        fit(&track.album.title, widths[1]),
        fit(&track.artist.name, widths[2]),
        track.duration_string(),
    ]
}

fn item_cells(item: &Item, widths: [usize; 3]) -> [String; 4] {
    match item {
        Item::Track(track) => track_cells(track, widths),
        Item::Album(album) => [
            fit(&album.title, widths[0]),
            fit(album.year().unwrap_or(""), widths[1]),
            fit(album.artist_name(), widths[2]),
            pretty_duration(album.duration),
        ],
        Item::Artist(artist) => [
            fit(&artist.name, widths[0]),
            String::new(),
            String::new(),
            String::new(),
        ],
        Item::Playlist(playlist) => [
            fit(&playlist.title, widths[0]),
            fit(
                &playlist
                    .number_of_tracks
                    .map(|n| format!("{n} tracks"))
                    .unwrap_or_default(),
                widths[1],
            ),
            fit(playlist.description.as_deref().unwrap_or(""), widths[2]),
            pretty_duration(playlist.duration),
        ],
        Item::Mix(mix) => [
            fit(&mix.title, widths[0]),
            fit(mix.sub_title.as_deref().unwrap_or(""), widths[1]),
            String::new(),
            String::new(),
        ],
        Item::Text(line) => [line.to_string(), String::new(), String::new(), String::new()],
    }
}

/// Render the top page of the stack.
pub fn render_page(
    frame: &mut Frame,
    area: Rect,
    entry: &mut PageEntry,
    breadcrumb: &str,
    focused: bool,
) {
    let border_color = if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            breadcrumb.to_string(),
            Style::default().fg(Color::Yellow),
        ))
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content = match &entry.state {
        PageState::Loading => {
            let loading = Paragraph::new(format!("Loading {}...", entry.title))
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(loading, inner);
            return;
        }
        PageState::Loaded(content) => content,
    };

    let header_height = if content.header.is_some() { 4 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(header_height), Constraint::Min(1)])
        .split(inner);

    if let Some(header) = &content.header {
        render_header(frame, chunks[0], header, entry.art.as_mut());
    }

    if content.sections.is_empty() {
        let empty = Paragraph::new("Nothing here").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let widths = track_columns(chunks[1].width);
    let rows: Vec<TableRow> = content
        .rows()
        .iter()
        .map(|row| match row {
            Row::Heading(section) => TableRow::new(vec![Cell::from(Span::styled(
                section.title.clone(),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ))]),
            Row::Item { item, .. } => {
                let [first, second, third, fourth] = item_cells(item, widths);
                TableRow::new(vec![
                    Cell::from(first).style(Style::default().fg(Color::White)),
                    Cell::from(second).style(Style::default().fg(Color::Yellow)),
                    Cell::from(third).style(Style::default().fg(Color::Cyan)),
                    Cell::from(fourth).style(Style::default().fg(Color::DarkGray)),
                ])
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(widths[0] as u16),
            Constraint::Length(widths[1] as u16),
            Constraint::Length(widths[2] as u16),
            Constraint::Length(DURATION_WIDTH),
        ],
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    // Table selection mirrors the entry's list state
    let mut table_state = TableState::default()
        .with_selected(entry.list_state.selected())
        .with_offset(entry.list_state.offset());
    frame.render_stateful_widget(table, chunks[1], &mut table_state);
    *entry.list_state.offset_mut() = table_state.offset();
}

fn render_header(
    frame: &mut Frame,
    area: Rect,
    header: &PageHeader,
    art: Option<&mut ratatui_image::protocol::StatefulProtocol>,
) {
    let text_area = match art {
        Some(protocol) => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(8), Constraint::Min(10)])
                .split(area);
            frame.render_stateful_widget(StatefulImage::default(), chunks[0], protocol);
            chunks[1]
        }
        None => area,
    };

    let mut lines = vec![Line::from(Span::styled(
        header.title.as_str(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ))];
    if let Some(subtitle) = &header.subtitle {
        lines.push(Line::from(Span::styled(
            subtitle.as_str(),
            Style::default().fg(Color::Gray),
        )));
    }
    frame.render_widget(Paragraph::new(lines), text_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::context::tests::track;

    #[test]
    fn test_fit_respects_display_width() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a long title", 6), "a lon…");
        assert_eq!(fit("東京事変", 5), "東京…");
        assert_eq!(fit("abc", 0), "");
    }

    #[test]
    fn test_track_cells() {
        let mut t = track("1");
        t.duration = 3725;
        let cells = track_cells(&t, [40, 40, 40]);
        assert_eq!(cells[0], t.title);
        assert_eq!(cells[2], t.artist.name);
        assert_eq!(cells[3], "01:02:05");

        t.duration = 0;
        assert_eq!(track_cells(&t, [40, 40, 40])[3], "00:00");
    }

    #[test]
    fn test_columns_fill_the_row() {
        let [title, album, artist] = track_columns(113);
        assert_eq!(title + album + artist, 100);
        assert_eq!(track_columns(4), [0, 0, 0]);
    }
}
