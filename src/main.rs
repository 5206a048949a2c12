mod audio;
mod auth;
mod backend;
mod config;
mod controller;
mod error;
mod logging;
mod model;
mod services;
mod view;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::Mutex;

use backend::{event_channel, LocalAudioBackend, PlaybackBackend, YouTubeBackend};
use config::Settings;
use controller::{AppController, BackendSet, Services};
use model::{AppModel, ResolvedIdCache};
use services::{GeminiClient, VideoResolver, YouTubeSearch};
use view::AppView;

const TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    settings.validate().map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    if let Err(e) = logging::init_logging(&settings.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== StreamAI Starting ===");

    let settings = Arc::new(settings);
    let http = reqwest::Client::new();
    let (events_tx, events_rx) = event_channel();

    let local: Arc<dyn PlaybackBackend> = Arc::new(LocalAudioBackend::new(http.clone(), events_tx.clone()));
    let (youtube, resolver) = if settings.youtube.enabled {
        let youtube: Arc<dyn PlaybackBackend> =
            Arc::new(YouTubeBackend::new(settings.youtube.clone(), events_tx.clone()));
        let resolver: Arc<dyn VideoResolver> = Arc::new(YouTubeSearch::new(http.clone(), &settings.youtube));
        (Some(youtube), Some(resolver))
    } else {
        (None, None)
    };

    let resolved_ids = ResolvedIdCache::persistent(&settings.spotify.cache_dir);
    if let Err(e) = resolved_ids.load_from_disk().await {
        tracing::warn!(error = %e, "Could not load resolved video ids");
    }

    let llm = GeminiClient::new(http.clone(), settings.llm.clone());
    if !llm.is_configured() {
        tracing::info!("No LLM API key configured, search and lyrics use placeholders");
    }

    let model = Arc::new(Mutex::new(AppModel::new(&settings.playback)));
    let services = Services {
        backends: BackendSet {
            local: Some(local),
            youtube,
            spotify: None,
        },
        resolver,
        resolved_ids,
        llm: llm.is_configured().then_some(llm),
    };
    let controller = AppController::new(model.clone(), services, settings.clone(), events_tx);
    let dispatcher = controller.spawn_event_dispatcher(events_rx);

    let controller_for_greeting = controller.clone();
    tokio::spawn(async move {
        controller_for_greeting.load_greeting().await;
    });

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller.clone()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    controller.shutdown().await;
    dispatcher.abort();
    tracing::info!("StreamAI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
) -> io::Result<()> {
    let mut last_token_check = Instant::now();

    loop {
        // Periodically check and refresh token if needed
        if last_token_check.elapsed() >= TOKEN_CHECK_INTERVAL {
            last_token_check = Instant::now();
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.refresh_token_if_needed().await;
            });
        }

        let (view, should_quit) = {
            let mut model_guard = model.lock().await;

            // Auto-clear old errors (after 5 seconds)
            model_guard.auto_clear_old_errors();

            (model_guard.snapshot(), model_guard.should_quit())
        };

        terminal.draw(|f| {
            AppView::render(f, &view);
        })?;

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }

        if should_quit {
            break;
        }
    }

    Ok(())
}
