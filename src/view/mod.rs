//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (truncation, column widths)
//! - `layout`: Main layout structure (top bar, sidebar)
//! - `content`: Main content area rendering
//! - `progress`: Player bar rendering
//! - `overlays`: Modal overlays (error, help, lyrics)

mod content;
mod layout;
mod overlays;
mod progress;
mod utils;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::ViewSnapshot;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, view: &ViewSnapshot) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + account
                Constraint::Min(0),    // Main content (sidebar + content)
                Constraint::Length(3), // Player bar
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], view);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Sidebar (Library + Playlists)
                Constraint::Percentage(70), // Main content
            ])
            .split(chunks[1]);

        layout::render_sidebar(frame, main_chunks[0], view);

        let playing_id = view.playback.track.as_ref().map(|t| t.id.as_str());
        content::render_main_content(frame, main_chunks[1], view, playing_id);

        progress::render_progress_bar(frame, chunks[2], &view.playback);

        if view.ui.lyrics.visible {
            overlays::render_lyrics(frame, view);
        }

        if view.ui.show_help_popup {
            overlays::render_help_popup(frame);
        }

        // Error notification goes on top of everything
        if view.ui.error_message.is_some() {
            overlays::render_error_notification(frame, &view.ui);
        }
    }
}
