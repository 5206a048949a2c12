//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::AppController;
use crate::model::{ActiveSection, Direction};

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let mut model = self.model.lock().await;

        // Handle error message first (blocks all other interactions)
        if model.has_error() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_error();
            }
            return Ok(());
        }

        // Handle help popup
        if model.ui.show_help_popup {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')
            ) {
                model.ui.show_help_popup = false;
            }
            return Ok(());
        }

        // Lyrics editor captures every key while open
        if let Some(buffer) = model.ui.lyrics.editor.as_mut() {
            match key.code {
                KeyCode::Esc => model.ui.lyrics.editor = None,
                KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    drop(model);
                    self.save_lyrics_edit().await;
                }
                KeyCode::Enter => buffer.push('\n'),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return Ok(());
        }

        // Lyrics overlay
        if model.ui.lyrics.visible {
            match key.code {
                KeyCode::Up => {
                    model.ui.lyrics.scroll = model.ui.lyrics.scroll.saturating_sub(1);
                    return Ok(());
                }
                KeyCode::Down => {
                    model.ui.lyrics.scroll = model.ui.lyrics.scroll.saturating_add(1);
                    return Ok(());
                }
                KeyCode::Esc | KeyCode::Char('y') | KeyCode::Char('Y') => {
                    drop(model);
                    self.toggle_lyrics().await;
                    return Ok(());
                }
                KeyCode::Char('e') | KeyCode::Char('E') => {
                    drop(model);
                    self.start_lyrics_edit().await;
                    return Ok(());
                }
                _ => {}
            }
        }

        // Handle search input when in search section
        if model.ui.active_section == ActiveSection::Search {
            match key.code {
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        model.cycle_section_backward();
                    } else {
                        model.cycle_section_forward();
                    }
                    return Ok(());
                }
                KeyCode::BackTab => {
                    model.cycle_section_backward();
                    return Ok(());
                }
                KeyCode::Enter => {
                    let query = model.ui.search_query.clone();
                    drop(model);
                    if !query.trim().is_empty() {
                        let controller = self.clone();
                        tokio::spawn(async move {
                            controller.perform_search(&query).await;
                        });
                    }
                    return Ok(());
                }
                KeyCode::Esc => {
                    model.ui.search_query.clear();
                    return Ok(());
                }
                KeyCode::Backspace => {
                    model.ui.search_query.pop();
                    return Ok(());
                }
                KeyCode::Char(c) => {
                    // Q still quits even in search mode when Ctrl is pressed
                    if (c == 'q' || c == 'Q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        model.set_should_quit(true);
                        return Ok(());
                    }
                    model.ui.search_query.push(c);
                    return Ok(());
                }
                _ => {}
            }
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true);
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    model.cycle_section_backward();
                } else {
                    model.cycle_section_forward();
                }
            }
            KeyCode::BackTab => {
                model.cycle_section_backward();
            }
            KeyCode::Up => {
                model.move_selection_up();
            }
            KeyCode::Down => {
                model.move_selection_down();
            }
            KeyCode::Enter => match model.ui.active_section {
                ActiveSection::Library => {
                    let selected = model.ui.library_selected;
                    drop(model);
                    self.open_library_item(selected).await;
                }
                ActiveSection::Playlists => {
                    let selected = model.ui.playlist_selected;
                    drop(model);
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.open_playlist(selected).await;
                    });
                }
                ActiveSection::MainContent => {
                    drop(model);
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.play_selected().await;
                    });
                }
                ActiveSection::Search => {}
            },
            // Play/Pause toggle
            KeyCode::Char(' ') => {
                drop(model);
                self.spawn_transport(|c| async move { c.toggle_play_pause().await });
            }
            // Next track
            KeyCode::Char('n') | KeyCode::Char('N') => {
                drop(model);
                self.spawn_transport(|c| async move { c.advance(Direction::Next).await });
            }
            // Previous track
            KeyCode::Char('p') | KeyCode::Char('P') => {
                drop(model);
                self.spawn_transport(|c| async move { c.advance(Direction::Previous).await });
            }
            KeyCode::Right => {
                drop(model);
                self.spawn_transport(|c| async move { c.seek_forward().await });
            }
            KeyCode::Left => {
                drop(model);
                self.spawn_transport(|c| async move { c.seek_backward().await });
            }
            // Volume up
            KeyCode::Char('+') | KeyCode::Char('=') => {
                drop(model);
                self.volume_up().await;
            }
            // Volume down
            KeyCode::Char('-') => {
                drop(model);
                self.volume_down().await;
            }
            // Lyrics overlay
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                drop(model);
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.toggle_lyrics().await;
                });
            }
            KeyCode::Char('L') => {
                drop(model);
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.login().await;
                });
            }
            KeyCode::Char('O') => {
                drop(model);
                self.logout().await;
            }
            // Focus search
            KeyCode::Char('g') | KeyCode::Char('G') => {
                model.ui.active_section = ActiveSection::Search;
            }
            // Focus playlists
            KeyCode::Char('l') => {
                model.ui.active_section = ActiveSection::Playlists;
            }
            // Show queue
            KeyCode::Char('u') | KeyCode::Char('U') => {
                model.open_library_item(crate::model::LibraryItem::Queue);
            }
            // Show help popup
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.ui.show_help_popup = true;
            }
            _ => {}
        }
        Ok(())
    }

    /// Run a transport command off the input loop; backend switches may wait
    /// on the network.
    fn spawn_transport<F, Fut>(&self, op: F)
    where
        F: FnOnce(AppController) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(op(self.clone()));
    }
}
