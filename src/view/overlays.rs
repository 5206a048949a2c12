//! Overlay rendering (error notification, help popup, lyrics)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::{UiState, ViewSnapshot};
use crate::services::LYRICS_UNAVAILABLE;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

pub fn render_error_notification(frame: &mut Frame, ui_state: &UiState) {
    if let Some(ref error_msg) = ui_state.error_message {
        let area = frame.area();

        // Fixed width popup (responsive to screen size)
        let popup_width = 52.min(area.width.saturating_sub(4));
        let inner_width = popup_width.saturating_sub(4).max(1) as usize; // account for borders

        // Calculate how many lines the error message will take when wrapped
        let error_line_count = error_msg.chars().count().div_ceil(inner_width) as u16;

        // Height: top border (1) + error lines + bottom border (1)
        let popup_height = (2 + error_line_count.max(1)).min(area.height.saturating_sub(4));
        let popup_area = centered(area, popup_width, popup_height);

        // Clear the area behind the popup first
        frame.render_widget(Clear, popup_area);

        let error_widget = Paragraph::new(error_msg.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error (Esc to dismiss) ")
                    .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                    .style(Style::default().bg(Color::Black)),
            );

        frame.render_widget(error_widget, popup_area);
    }
}

pub fn render_lyrics(frame: &mut Frame, view: &ViewSnapshot) {
    let area = frame.area();
    let popup_area = centered(
        area,
        area.width.saturating_sub(10).max(30),
        area.height.saturating_sub(6).max(8),
    );
    frame.render_widget(Clear, popup_area);

    let track_title = view
        .playback
        .track
        .as_ref()
        .map(|t| format!(" {} - {} ", t.title, t.artist))
        .unwrap_or_else(|| " Lyrics ".to_string());

    let lyrics = &view.ui.lyrics;
    let (body, hint, color) = if let Some(buffer) = &lyrics.editor {
        (format!("{buffer}▏"), " Ctrl+S save | Esc cancel ", Color::Yellow)
    } else if lyrics.loading {
        ("Loading lyrics...".to_string(), " Esc close ", Color::DarkGray)
    } else if view.playback.track.is_none() {
        ("Nothing is playing.".to_string(), " Esc close ", Color::DarkGray)
    } else {
        let text = view
            .lyrics
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| LYRICS_UNAVAILABLE.to_string());
        (text, " ↑↓ scroll | E edit | Esc close ", Color::White)
    };

    let scroll = if lyrics.editor.is_some() { 0 } else { lyrics.scroll };
    let widget = Paragraph::new(body)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(track_title)
                .title_bottom(Line::from(hint).right_aligned())
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        );
    frame.render_widget(widget, popup_area);
}

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();

    // Define keybindings organized by category
    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Cycle sections"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Open / Play / Explore genre"),
        ("G", "Focus search"),
        ("l", "Focus playlists"),
        ("U", "Show queue"),
        ("", ""),
        ("", "── Playback ──"),
        ("Space", "Play / Pause"),
        ("N", "Next track"),
        ("P", "Previous track"),
        ("← / →", "Seek backward / forward"),
        ("+ / -", "Volume up / down"),
        ("", ""),
        ("", "── Lyrics ──"),
        ("Y", "Show / hide lyrics"),
        ("E", "Edit lyrics"),
        ("", ""),
        ("", "── General ──"),
        ("Shift+L", "Log in to Spotify"),
        ("Shift+O", "Log out of Spotify"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_area = centered(area, 62, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                // Section header or empty line
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (H or Esc to close) ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(help_text, popup_area);
}
