//! YouTube playback through an mpv sidecar driven over its JSON IPC socket.
//!
//! mpv resolves `watch?v=` URLs with its ytdl hook, so the only thing this
//! backend needs is a video id. The process is started on first use and kept
//! idle between tracks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::YouTubeSettings;
use crate::error::{PlayerError, PlayerResult};

use super::{BackendEvent, BackendKind, EventSender, LoadRequest, PlaybackBackend};

const KIND: BackendKind = BackendKind::YouTube;
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);
const PAUSE_OBSERVER: u64 = 1;

type Pending = Arc<StdMutex<HashMap<u64, oneshot::Sender<Value>>>>;
type IpcReader = Box<dyn AsyncRead + Send + Unpin>;
type IpcWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL}{video_id}")
}

#[cfg(unix)]
async fn connect_socket(path: &Path) -> std::io::Result<(IpcReader, IpcWriter)> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    let (read, write) = stream.into_split();
    Ok((Box::new(read), Box::new(write)))
}

#[cfg(not(unix))]
async fn connect_socket(_path: &Path) -> std::io::Result<(IpcReader, IpcWriter)> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mpv IPC needs unix sockets",
    ))
}

/// Generations shared between the backend and the IPC reader task.
#[derive(Default)]
struct Generations {
    /// Newest `load`; 0 after a release.
    requested: AtomicU64,
    /// Generation whose file mpv reported as loaded.
    loaded: AtomicU64,
}

struct MpvProcess {
    child: Child,
    writer: Mutex<IpcWriter>,
    pending: Pending,
    next_request: AtomicU64,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl MpvProcess {
    async fn spawn(
        settings: &YouTubeSettings,
        socket: &Path,
        volume: u8,
        generations: Arc<Generations>,
        events: EventSender,
    ) -> PlayerResult<Self> {
        let _ = tokio::fs::remove_file(socket).await;

        let mut command = Command::new(&settings.mpv_path);
        command
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg("--keep-open=no")
            .arg(format!("--volume={}", volume.min(100)))
            .arg(format!("--input-ipc-server={}", socket.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if !settings.show_video {
            command.arg("--no-video").arg("--ytdl-format=bestaudio/best");
        }
        let child = command
            .spawn()
            .map_err(|e| PlayerError::backend(KIND, format!("failed to start {}: {e}", settings.mpv_path)))?;
        tracing::info!(mpv = %settings.mpv_path, socket = %socket.display(), "Started mpv sidecar");

        let mut last_error = None;
        let mut connection = None;
        for _ in 0..CONNECT_ATTEMPTS {
            match connect_socket(socket).await {
                Ok(halves) => {
                    connection = Some(halves);
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Unsupported => {
                    return Err(PlayerError::Unsupported("YouTube playback on this platform"));
                }
                Err(e) => {
                    last_error = Some(e);
                    tokio::time::sleep(CONNECT_RETRY).await;
                }
            }
        }
        let Some((read, write)) = connection else {
            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(PlayerError::backend(KIND, format!("mpv IPC not reachable: {reason}")));
        };

        let pending: Pending = Arc::new(StdMutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_events(
            read,
            pending.clone(),
            alive.clone(),
            generations,
            events,
        ));

        let process = Self {
            child,
            writer: Mutex::new(write),
            pending,
            next_request: AtomicU64::new(1),
            alive,
            reader,
        };
        process
            .command(json!(["observe_property", PAUSE_OBSERVER, "pause"]))
            .await?;
        Ok(process)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn command(&self, args: Value) -> PlayerResult<Value> {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id, tx);

        let mut line = json!({ "command": args, "request_id": request_id }).to_string();
        line.push('\n');
        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(|e| PlayerError::backend(KIND, format!("mpv IPC write failed: {e}")))?;
            writer.flush().await.ok();
        }

        let reply = tokio::time::timeout(REPLY_TIMEOUT, rx).await;
        let reply = match reply {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(PlayerError::backend(KIND, "mpv exited")),
            Err(_) => {
                self.pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&request_id);
                return Err(PlayerError::backend(KIND, "mpv did not answer"));
            }
        };
        parse_reply(reply)
    }

    async fn property_f64(&self, name: &str) -> Option<f64> {
        self.command(json!(["get_property", name])).await.ok()?.as_f64()
    }

    async fn terminate(mut self) {
        let _ = self.command(json!(["quit"])).await;
        if tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await.is_err() {
            let _ = self.child.kill().await;
        }
        self.reader.abort();
    }
}

/// Unwrap an IPC reply into its `data` field.
fn parse_reply(reply: Value) -> PlayerResult<Value> {
    match reply.get("error").and_then(Value::as_str) {
        Some("success") | None => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
        Some(error) => Err(PlayerError::backend(KIND, format!("mpv: {error}"))),
    }
}

/// What an unsolicited IPC line means for playback.
#[derive(Debug, PartialEq)]
enum MpvEvent {
    FileLoaded,
    EndOfFile,
    Paused(bool),
    Other,
}

fn classify_event(message: &Value) -> MpvEvent {
    match message.get("event").and_then(Value::as_str) {
        Some("file-loaded") => MpvEvent::FileLoaded,
        Some("end-file") if message.get("reason").and_then(Value::as_str) == Some("eof") => {
            MpvEvent::EndOfFile
        }
        Some("property-change") if message.get("name").and_then(Value::as_str) == Some("pause") => {
            message
                .get("data")
                .and_then(Value::as_bool)
                .map_or(MpvEvent::Other, MpvEvent::Paused)
        }
        _ => MpvEvent::Other,
    }
}

async fn read_events(
    read: IpcReader,
    pending: Pending,
    alive: Arc<AtomicBool>,
    generations: Arc<Generations>,
    events: EventSender,
) {
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            tracing::trace!(line = %line, "Ignoring malformed mpv message");
            continue;
        };

        if let Some(request_id) = message.get("request_id").and_then(Value::as_u64) {
            let waiter = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&request_id);
            if let Some(waiter) = waiter {
                let _ = waiter.send(message);
            }
            continue;
        }

        match classify_event(&message) {
            MpvEvent::FileLoaded => {
                let requested = generations.requested.load(Ordering::SeqCst);
                generations.loaded.store(requested, Ordering::SeqCst);
            }
            MpvEvent::EndOfFile => {
                let generation = generations.loaded.load(Ordering::SeqCst);
                if generation != 0 && generation == generations.requested.load(Ordering::SeqCst) {
                    tracing::debug!(generation, "YouTube video reached end of media");
                    let _ = events.send(BackendEvent::Ended { kind: KIND, generation });
                }
            }
            MpvEvent::Paused(paused) => {
                let generation = generations.loaded.load(Ordering::SeqCst);
                if generation != 0 && generation == generations.requested.load(Ordering::SeqCst) {
                    let _ = events.send(BackendEvent::StateChanged {
                        kind: KIND,
                        generation,
                        playing: !paused,
                        position_ms: None,
                    });
                }
            }
            MpvEvent::Other => {}
        }
    }

    alive.store(false, Ordering::SeqCst);
    pending.lock().unwrap_or_else(PoisonError::into_inner).clear();
    let generation = generations.requested.load(Ordering::SeqCst);
    if generation != 0 {
        let _ = events.send(BackendEvent::PlaybackError {
            kind: KIND,
            generation,
            message: "mpv exited".to_string(),
        });
    }
    tracing::warn!("mpv IPC connection closed");
}

/// Embedded YouTube player.
pub struct YouTubeBackend {
    settings: YouTubeSettings,
    socket: PathBuf,
    events: EventSender,
    generations: Arc<Generations>,
    process: Mutex<Option<MpvProcess>>,
}

impl YouTubeBackend {
    pub fn new(settings: YouTubeSettings, events: EventSender) -> Self {
        let socket = std::env::temp_dir().join(format!("streamai-mpv-{}.sock", std::process::id()));
        Self {
            settings,
            socket,
            events,
            generations: Arc::new(Generations::default()),
            process: Mutex::new(None),
        }
    }

    async fn command(&self, args: Value) -> PlayerResult<Value> {
        let guard = self.process.lock().await;
        match guard.as_ref() {
            Some(process) if process.is_alive() => process.command(args).await,
            _ => Err(PlayerError::Unsupported("transport control before load")),
        }
    }
}

#[async_trait]
impl PlaybackBackend for YouTubeBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    async fn load(&self, request: LoadRequest) -> PlayerResult<()> {
        self.generations
            .requested
            .store(request.generation, Ordering::SeqCst);

        let mut guard = self.process.lock().await;
        if !guard.as_ref().is_some_and(MpvProcess::is_alive) {
            if let Some(dead) = guard.take() {
                dead.terminate().await;
            }
            let process = MpvProcess::spawn(
                &self.settings,
                &self.socket,
                request.volume,
                self.generations.clone(),
                self.events.clone(),
            )
            .await?;
            *guard = Some(process);
        }
        let Some(process) = guard.as_ref() else {
            return Err(PlayerError::backend(KIND, "mpv not running"));
        };

        tracing::info!(video_id = %request.handle, generation = request.generation, "Loading YouTube video");
        process
            .command(json!(["set_property", "volume", request.volume.min(100)]))
            .await?;
        process
            .command(json!(["loadfile", watch_url(&request.handle), "replace"]))
            .await?;
        process.command(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.command(json!(["set_property", "pause", true])).await.map(drop)
    }

    async fn resume(&self) -> PlayerResult<()> {
        self.command(json!(["set_property", "pause", false])).await.map(drop)
    }

    async fn seek(&self, position: Duration) -> PlayerResult<()> {
        self.command(json!(["seek", position.as_secs_f64(), "absolute"]))
            .await
            .map(drop)
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        match self.command(json!(["set_property", "volume", volume.min(100)])).await {
            // Not started yet; the volume goes out with the next load.
            Err(PlayerError::Unsupported(_)) => Ok(()),
            other => other.map(drop),
        }
    }

    async fn release(&self) {
        self.generations.requested.store(0, Ordering::SeqCst);
        self.generations.loaded.store(0, Ordering::SeqCst);
        let _ = self.command(json!(["stop"])).await;
    }

    async fn shutdown(&self) {
        self.generations.requested.store(0, Ordering::SeqCst);
        if let Some(process) = self.process.lock().await.take() {
            process.terminate().await;
        }
        let _ = tokio::fs::remove_file(&self.socket).await;
    }

    async fn poll_position(&self) -> Option<(u32, Option<u32>)> {
        if self.generations.requested.load(Ordering::SeqCst) == 0 {
            return None;
        }
        let guard = self.process.lock().await;
        let process = guard.as_ref().filter(|p| p.is_alive())?;
        let position = process.property_f64("time-pos").await?;
        let duration = process.property_f64("duration").await;
        Some((
            secs_to_ms(position),
            duration.map(secs_to_ms).filter(|d| *d > 0),
        ))
    }
}

fn secs_to_ms(secs: f64) -> u32 {
    (secs.max(0.0) * 1000.0).min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_watch_urls() {
        assert_eq!(watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn replies_unwrap_data_or_fail() {
        let ok = json!({"request_id": 3, "error": "success", "data": 12.5});
        assert_eq!(parse_reply(ok).unwrap(), json!(12.5));

        let err = json!({"request_id": 4, "error": "property unavailable"});
        assert!(matches!(
            parse_reply(err),
            Err(PlayerError::Backend { kind: BackendKind::YouTube, .. })
        ));
    }

    #[test]
    fn only_natural_end_counts_as_end_of_media() {
        assert_eq!(
            classify_event(&json!({"event": "end-file", "reason": "eof"})),
            MpvEvent::EndOfFile
        );
        assert_eq!(
            classify_event(&json!({"event": "end-file", "reason": "stop"})),
            MpvEvent::Other
        );
        assert_eq!(
            classify_event(&json!({"event": "property-change", "id": 1, "name": "pause", "data": true})),
            MpvEvent::Paused(true)
        );
        assert_eq!(classify_event(&json!({"event": "file-loaded"})), MpvEvent::FileLoaded);
    }

    #[test]
    fn seconds_convert_to_clamped_millis() {
        assert_eq!(secs_to_ms(1.5), 1500);
        assert_eq!(secs_to_ms(-3.0), 0);
    }
}
