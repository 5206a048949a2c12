//! Player bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::{format_duration_ms, PlaybackInfo, TransportStatus};

fn status_text(playback: &PlaybackInfo) -> String {
    let Some(track) = &playback.track else {
        return " No track playing".to_string();
    };
    let icon = match playback.status {
        TransportStatus::Playing => " ▶",
        TransportStatus::Resolving => " …",
        TransportStatus::Paused | TransportStatus::Idle => "⏸ ",
    };
    format!("{} {} | {} ({})", icon, track.title, track.artist, track.album)
}

fn controls_text(playback: &PlaybackInfo) -> String {
    let source = match (playback.status, playback.backend) {
        (TransportStatus::Resolving, _) => "Finding a source...".to_string(),
        (_, Some(kind)) => kind.to_string(),
        (_, None) => "Not playing".to_string(),
    };
    format!(" {} | Vol: {}% ", source, playback.volume)
}

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let time_str = format!(
        "{} / {}",
        format_duration_ms(playback.progress_ms),
        format_duration_ms(playback.duration_ms)
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text(playback)))
                .title_bottom(Line::from(controls_text(playback)).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((playback.progress_percent / 100.0).clamp(0.0, 1.0))
        .label(time_str);

    frame.render_widget(gauge, area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::BackendKind;
    use crate::model::Track;

    #[test]
    fn bar_names_the_active_backend() {
        let playback = PlaybackInfo {
            track: Some(Arc::new(Track::new("1", "Song", "Band", "LP", 60))),
            status: TransportStatus::Playing,
            backend: Some(BackendKind::YouTube),
            volume: 40,
            ..PlaybackInfo::default()
        };
        assert_eq!(status_text(&playback), " ▶ Song | Band (LP)");
        assert_eq!(controls_text(&playback), " YouTube | Vol: 40% ");
    }

    #[test]
    fn resolving_is_shown_instead_of_a_backend() {
        let playback = PlaybackInfo {
            track: Some(Arc::new(Track::new("1", "Song", "Band", "LP", 60))),
            status: TransportStatus::Resolving,
            ..PlaybackInfo::default()
        };
        assert!(controls_text(&playback).contains("Finding a source"));
        assert_eq!(status_text(&PlaybackInfo::default()), " No track playing");
    }
}
