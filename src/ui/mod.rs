//! Main UI layout and rendering.

use std::collections::VecDeque;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::action::Focus;
use crate::app::{App, Message};
use crate::client::auth::DeviceAuthorization;

pub mod components;

pub use components::*;

/// Width of the sidebar.
const SIDEBAR_WIDTH: u16 = 26;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Main layout: [sidebar + page + side panel] [now playing]
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Content
            Constraint::Length(5), // Now playing
        ])
        .split(area);

    let side_panel = app.lyrics.visible || app.queue.visible;
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if side_panel {
            vec![
                Constraint::Length(SIDEBAR_WIDTH),
                Constraint::Min(30),
                Constraint::Percentage(30),
            ]
        } else {
            vec![Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(30)]
        })
        .split(main_chunks[0]);

    render_sidebar(
        frame,
        content_chunks[0],
        &mut app.sidebar,
        app.focus == Focus::Sidebar,
    );

    let breadcrumb = app.pages.breadcrumb().join(" › ");
    if let Some(entry) = app.pages.top_mut() {
        render_page(
            frame,
            content_chunks[1],
            entry,
            &breadcrumb,
            app.focus == Focus::Page,
        );
    }

    if app.lyrics.visible {
        render_lyrics(frame, content_chunks[2], &mut app.lyrics);
    } else if app.queue.visible {
        let empty = VecDeque::new();
        let (queued, upcoming) = match &app.controller {
            Some(controller) => (controller.queue(), controller.context().upcoming()),
            None => (&empty, &[][..]),
        };
        render_queue(
            frame,
            content_chunks[2],
            &mut app.queue,
            queued,
            upcoming,
            app.focus == Focus::Queue,
        );
    }

    render_now_playing(frame, main_chunks[1], &mut app.now_playing);

    if app.entry.active {
        render_entry(frame, area, &app.entry);
    }

    if let Some(device) = &app.login {
        render_login(frame, area, device);
    }

    if app.show_help {
        render_help(frame, area);
    }

    if let Some(message) = &app.message {
        render_message(frame, area, message);
    }
}

/// Render the pending device login.
fn render_login(frame: &mut Frame, area: Rect, device: &DeviceAuthorization) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from("Open this link in a browser and confirm the login:"),
        Line::from(""),
        Line::from(Span::styled(
            device.link(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("Code: "),
            Span::styled(
                device.user_code.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Log in to TIDAL")
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

fn help_heading(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Render the help overlay.
fn render_help(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(70, 90, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_heading("Navigation"),
        Line::from("  j/k or ↑/↓    Move up/down"),
        Line::from("  h/l or ←/→    Move focus between panels"),
        Line::from("  Enter         Open or play selected item"),
        Line::from("  Esc/Backspace Go back"),
        Line::from("  g/G           Jump to top/bottom"),
        Line::from("  1-7           Home, Explore and your collection"),
        Line::from("  /             Search"),
        Line::from("  w             New playlist"),
        Line::from(""),
        help_heading("Playback"),
        Line::from("  Space         Play/Pause"),
        Line::from("  n/p           Next/Previous track"),
        Line::from("  ,/.           Seek backward/forward (10s)"),
        Line::from("  [/]           Seek backward/forward (60s)"),
        Line::from("  +/-           Volume up/down"),
        Line::from("  s             Toggle shuffle"),
        Line::from("  r             Cycle repeat mode"),
        Line::from("  P/S           Play/Shuffle the selected list"),
        Line::from(""),
        help_heading("Tracks"),
        Line::from("  a             Add to queue"),
        Line::from("  N             Play next"),
        Line::from("  m             Start track or artist radio"),
        Line::from("  f             Add to collection"),
        Line::from("  y             Add to playlist"),
        Line::from("  A/o           Open album/artist"),
        Line::from("  C/T           Artist/Radio of the playing track"),
        Line::from(""),
        help_heading("Queue & Lyrics"),
        Line::from("  c             Clear queue"),
        Line::from("  d/Delete      Remove selected from queue"),
        Line::from("  L             Toggle lyrics panel"),
        Line::from(""),
        help_heading("Account"),
        Line::from("  I/O           Log in/Log out"),
        Line::from("  Q             Cycle audio quality"),
        Line::from("  D             Download playing track"),
        Line::from("  x             Dismiss message"),
        Line::from("  ?             Show this help"),
        Line::from("  q             Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

/// Render a notice or error at the bottom of the content area.
fn render_message(frame: &mut Frame, area: Rect, message: &Message) {
    let (title, color) = if message.is_error {
        ("Error [x to dismiss]", Color::Red)
    } else {
        ("Notice [x to dismiss]", Color::Green)
    };

    let width = area.width.saturating_sub(4).min(80);
    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height.saturating_sub(9),
        width,
        height: 4.min(area.height),
    };
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(color));

    let paragraph = Paragraph::new(message.text.as_str())
        .style(Style::default().fg(color))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, popup_area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 20, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 10);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 20);
    }
}
