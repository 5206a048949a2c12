//! Layout rendering (top bar, sidebar)

use ratatui::widgets::Padding;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::model::{ActiveSection, AuthStatus, DeviceStatus, LibraryItem, ViewSnapshot};

fn section_border(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

fn item_style(selected: bool, focused: bool) -> Style {
    if selected && focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn account_label(auth: &AuthStatus, device: &DeviceStatus) -> (String, Color) {
    match (auth, device) {
        (AuthStatus::Unauthenticated, _) => ("Spotify: L to log in".to_string(), Color::DarkGray),
        (AuthStatus::Authenticating, _) => ("Spotify: authorizing...".to_string(), Color::Yellow),
        (AuthStatus::Authenticated { user_id }, DeviceStatus::Ready { .. }) => {
            (format!("{user_id} (ready)"), Color::Cyan)
        }
        (AuthStatus::Authenticated { user_id }, _) => {
            (format!("{user_id} (connecting)"), Color::Yellow)
        }
    }
}

pub fn render_top_bar(frame: &mut Frame, area: Rect, view: &ViewSnapshot) {
    let ui_state = &view.ui;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(32), // Account
        ])
        .split(area);

    let searching = ui_state.active_section == ActiveSection::Search;
    let search_text = if ui_state.is_searching {
        "Searching..."
    } else if ui_state.search_query.is_empty() {
        "Type to search..."
    } else {
        &ui_state.search_query
    };

    let search = Paragraph::new(search_text)
        .style(if searching {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .padding(Padding::horizontal(1))
                .border_style(section_border(searching)),
        );
    frame.render_widget(search, chunks[0]);

    let (label, color) = account_label(&view.auth, &view.device);
    let account = Paragraph::new(label)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title(" Account "));
    frame.render_widget(account, chunks[1]);
}

pub fn render_sidebar(frame: &mut Frame, area: Rect, view: &ViewSnapshot) {
    let ui_state = &view.ui;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(LibraryItem::ALL.len() as u16 + 2),
            Constraint::Min(0), // Playlists (fills remaining space)
        ])
        .split(area);

    let library_focused = ui_state.active_section == ActiveSection::Library;
    let library_items: Vec<ListItem> = LibraryItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ListItem::new(item.name()).style(item_style(i == ui_state.library_selected, library_focused))
        })
        .collect();

    let library = List::new(library_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Library ")
            .padding(Padding::horizontal(1))
            .border_style(section_border(library_focused)),
    );
    frame.render_widget(library, chunks[0]);

    let playlists_focused = ui_state.active_section == ActiveSection::Playlists;
    let mut playlist_items: Vec<ListItem> = view
        .content
        .playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            ListItem::new(playlist.name.clone())
                .style(item_style(i == ui_state.playlist_selected, playlists_focused))
        })
        .collect();
    if playlist_items.is_empty() {
        playlist_items.push(
            ListItem::new("Log in to see playlists").style(Style::default().fg(Color::DarkGray)),
        );
    }

    let playlists = List::new(playlist_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Playlists ")
                .padding(Padding::horizontal(1))
                .border_style(section_border(playlists_focused)),
        )
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(ui_state.playlist_selected));

    frame.render_stateful_widget(playlists, chunks[1], &mut list_state);
}
