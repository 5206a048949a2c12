//! Main content area rendering (home, queue, search results, playlists)

use ratatui::widgets::Padding;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Paragraph},
    Frame,
};

use super::utils::{calculate_track_column_widths, render_scrollable_list, truncate_string};
use crate::controller::AppController;
use crate::model::{ActiveSection, ContentView, SharedTrack, ViewSnapshot, GENRES};

pub fn render_main_content(
    frame: &mut Frame,
    area: Rect,
    view: &ViewSnapshot,
    playing_id: Option<&str>,
) {
    let content = &view.content;
    let is_focused = view.ui.active_section == ActiveSection::MainContent;
    let border_style = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    if content.is_loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Content ")
                    .border_style(border_style),
            );
        frame.render_widget(loading, area);
        return;
    }

    let (title, tracks): (String, &[SharedTrack]) = match content.view {
        ContentView::Home => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Greeting
                    Constraint::Min(0),    // Top tracks or queue
                ])
                .split(area);
            let greeting = Paragraph::new(view.ui.greeting.clone())
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .padding(Padding::horizontal(1))
                        .border_style(border_style),
                );
            frame.render_widget(greeting, chunks[0]);

            if content.shows_genres(view.queue.is_empty()) {
                render_genres(frame, chunks[1], content.selected_index, is_focused);
                return;
            }
            let (title, tracks) = match content.tracks_for(ContentView::Home) {
                Some(tracks) => (" Your Top Tracks ", tracks),
                None => (" Up Next ", view.queue.as_slice()),
            };
            render_track_list(
                frame,
                chunks[1],
                title,
                tracks,
                content.selected_index,
                is_focused,
                playing_id,
            );
            return;
        }
        ContentView::Queue => (" Queue ".to_string(), view.queue.as_slice()),
        ContentView::SearchResults if content.search_results.is_empty() => {
            render_genres(frame, area, content.selected_index, is_focused);
            return;
        }
        ContentView::SearchResults => (
            format!(" Search results ({}) ", content.search_results.len()),
            content.search_results.as_slice(),
        ),
        ContentView::Playlist(index) => match content.playlists.get(index) {
            Some(playlist) => (format!(" {} ", playlist.name), playlist.tracks.as_slice()),
            None => (" Playlist ".to_string(), &[][..]),
        },
    };

    render_track_list(
        frame,
        area,
        &title,
        tracks,
        content.selected_index,
        is_focused,
        playing_id,
    );
}

fn render_genres(frame: &mut Frame, area: Rect, selected_index: usize, is_focused: bool) {
    let border_style = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let mut items = vec![ListItem::new(" Pick a genre and press Enter")
        .style(Style::default().fg(Color::DarkGray))];
    items.extend(GENRES.iter().enumerate().map(|(i, genre)| {
        let style = if i == selected_index && is_focused {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        ListItem::new(format!("   {genre}")).style(style)
    }));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Explore Genres ")
        .padding(Padding::horizontal(1))
        .border_style(border_style);

    render_scrollable_list(frame, area, items, selected_index + 1, block); // +1 for hint
}

fn render_track_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    tracks: &[SharedTrack],
    selected_index: usize,
    is_focused: bool,
    playing_id: Option<&str>,
) {
    let border_style = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let content_width = area.width.saturating_sub(4) as usize;
    let mut items = track_items(tracks, selected_index, is_focused, playing_id, content_width);
    if tracks.is_empty() {
        items.push(ListItem::new("       Nothing here yet").style(Style::default().fg(Color::DarkGray)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .padding(Padding::horizontal(1))
        .border_style(border_style);

    render_scrollable_list(frame, area, items, selected_index + 1, block); // +1 for header
}

fn track_items(
    tracks: &[SharedTrack],
    selected_index: usize,
    is_focused: bool,
    playing_id: Option<&str>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let (num_width, title_width, artist_width, source_width, _) =
        calculate_track_column_widths(content_width, tracks.len());

    // Create header as first item
    let mut items: Vec<ListItem<'static>> = vec![ListItem::new(format!(
        " {:<num_width$}   {:<title_width$}   {:<artist_width$}   {:<source_width$}   {}",
        "#", "Title", "Artist", "Source", "Duration",
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = playing_id == Some(track.id.as_str());
        let style = if i == selected_index && is_focused {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if is_playing {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if i == selected_index {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1);
        let source = format!("{:<source_width$}", AppController::describe_source(track));

        ListItem::new(format!(
            "{}   {}   {}   {}   {}",
            track_num,
            truncate_string(&track.title, title_width),
            truncate_string(&track.artist, artist_width),
            source,
            track.duration
        ))
        .style(style)
    }));
    items
}
