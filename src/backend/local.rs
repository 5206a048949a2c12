//! Direct audio streams played through rodio.
//!
//! The output stream is not `Send`, so it lives on a dedicated thread that only
//! builds sinks. Sinks themselves are shared, which lets transport commands act
//! on them directly.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tokio::sync::oneshot;

use crate::error::{PlayerError, PlayerResult};

use super::{BackendEvent, BackendKind, EventSender, LoadRequest, PlaybackBackend};

const KIND: BackendKind = BackendKind::LocalAudio;
const END_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Where an audio handle points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// HTTP/HTTPS stream
    Http(String),
    /// Local file on disk
    File(PathBuf),
}

impl AudioSource {
    /// HTTP/HTTPS URLs become `Http`, everything else is treated as a local path.
    pub fn parse(handle: &str) -> Self {
        if handle.starts_with("http://") || handle.starts_with("https://") {
            Self::Http(handle.to_string())
        } else {
            let path = handle.strip_prefix("file://").unwrap_or(handle);
            Self::File(PathBuf::from(path))
        }
    }
}

struct LoadedSink {
    sink: Sink,
    generation: u64,
    duration_ms: Option<u32>,
    ended: bool,
}

type SharedSink = Arc<Mutex<Option<LoadedSink>>>;

enum AudioCmd {
    Open {
        bytes: Vec<u8>,
        generation: u64,
        volume: f32,
        reply: oneshot::Sender<PlayerResult<()>>,
    },
    Quit,
}

fn lock(shared: &SharedSink) -> MutexGuard<'_, Option<LoadedSink>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn volume_gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

fn open_sink(stream: &OutputStream, bytes: Vec<u8>, volume: f32) -> PlayerResult<(Sink, Option<u32>)> {
    let decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| PlayerError::backend(KIND, format!("cannot decode audio: {e}")))?;
    let duration_ms = decoder
        .total_duration()
        .map(|d| d.as_millis().min(u128::from(u32::MAX)) as u32);
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.append(decoder);
    sink.play();
    Ok((sink, duration_ms))
}

fn spawn_audio_thread(rx: Receiver<AudioCmd>, loaded: SharedSink, events: EventSender) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr on drop, which would garble the TUI.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                tracing::error!(error = %e, "No audio output device");
                None
            }
        };

        loop {
            match rx.recv_timeout(END_CHECK_INTERVAL) {
                Ok(AudioCmd::Open {
                    bytes,
                    generation,
                    volume,
                    reply,
                }) => {
                    let result = match &stream {
                        Some(stream) => open_sink(stream, bytes, volume).map(|(sink, duration_ms)| {
                            let previous = lock(&loaded).replace(LoadedSink {
                                sink,
                                generation,
                                duration_ms,
                                ended: false,
                            });
                            if let Some(previous) = previous {
                                previous.sink.stop();
                            }
                        }),
                        None => Err(PlayerError::backend(KIND, "no audio output device")),
                    };
                    let _ = reply.send(result);
                }
                Ok(AudioCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let mut guard = lock(&loaded);
            if let Some(current) = guard.as_mut() {
                if !current.ended && current.sink.empty() {
                    current.ended = true;
                    tracing::debug!(generation = current.generation, "Local audio reached end of media");
                    let _ = events.send(BackendEvent::Ended {
                        kind: KIND,
                        generation: current.generation,
                    });
                }
            }
        }

        if let Some(current) = lock(&loaded).take() {
            current.sink.stop();
        }
        tracing::debug!("Audio thread exited");
    })
}

/// Plays http(s) URLs and local files.
pub struct LocalAudioBackend {
    tx: Mutex<Sender<AudioCmd>>,
    loaded: SharedSink,
    http: reqwest::Client,
    /// Generation of the newest `load`; 0 after a release.
    requested: AtomicU64,
    volume: AtomicU8,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl LocalAudioBackend {
    pub fn new(http: reqwest::Client, events: EventSender) -> Self {
        let (tx, rx) = mpsc::channel();
        let loaded: SharedSink = Arc::new(Mutex::new(None));
        let thread = spawn_audio_thread(rx, loaded.clone(), events);
        Self {
            tx: Mutex::new(tx),
            loaded,
            http,
            requested: AtomicU64::new(0),
            volume: AtomicU8::new(100),
            thread: Mutex::new(Some(thread)),
        }
    }

    async fn fetch(&self, source: &AudioSource) -> PlayerResult<Vec<u8>> {
        match source {
            AudioSource::Http(url) => fetch_http(&self.http, url).await,
            AudioSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| PlayerError::backend(KIND, format!("{}: {e}", path.display()))),
        }
    }

    fn send(&self, cmd: AudioCmd) -> PlayerResult<()> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(cmd)
            .map_err(|_| PlayerError::backend(KIND, "audio thread stopped"))
    }

    fn with_sink<R>(&self, f: impl FnOnce(&mut LoadedSink) -> R) -> PlayerResult<R> {
        let mut guard = lock(&self.loaded);
        guard
            .as_mut()
            .map(f)
            .ok_or(PlayerError::Unsupported("transport control before load"))
    }
}

#[async_trait]
impl PlaybackBackend for LocalAudioBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    async fn load(&self, request: LoadRequest) -> PlayerResult<()> {
        self.requested.store(request.generation, Ordering::SeqCst);
        self.volume.store(request.volume, Ordering::SeqCst);

        let source = AudioSource::parse(&request.handle);
        let bytes = self.fetch(&source).await?;

        // A newer load or a release happened while downloading.
        if self.requested.load(Ordering::SeqCst) != request.generation {
            tracing::debug!(generation = request.generation, "Dropping superseded audio load");
            return Ok(());
        }

        let (reply, done) = oneshot::channel();
        self.send(AudioCmd::Open {
            bytes,
            generation: request.generation,
            volume: volume_gain(self.volume.load(Ordering::SeqCst)),
            reply,
        })?;
        done.await
            .map_err(|_| PlayerError::backend(KIND, "audio thread stopped"))??;
        tracing::info!(generation = request.generation, "Local audio started");
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.with_sink(|loaded| loaded.sink.pause())
    }

    async fn resume(&self) -> PlayerResult<()> {
        self.with_sink(|loaded| loaded.sink.play())
    }

    async fn seek(&self, position: Duration) -> PlayerResult<()> {
        self.with_sink(|loaded| {
            loaded.ended = false;
            loaded
                .sink
                .try_seek(position)
                .map_err(|e| PlayerError::backend(KIND, format!("seek failed: {e}")))
        })?
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        self.volume.store(volume, Ordering::SeqCst);
        if let Some(loaded) = lock(&self.loaded).as_ref() {
            loaded.sink.set_volume(volume_gain(volume));
        }
        Ok(())
    }

    async fn release(&self) {
        self.requested.store(0, Ordering::SeqCst);
        if let Some(loaded) = lock(&self.loaded).take() {
            loaded.sink.stop();
        }
    }

    async fn shutdown(&self) {
        self.release().await;
        let _ = self.send(AudioCmd::Quit);
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }

    async fn poll_position(&self) -> Option<(u32, Option<u32>)> {
        let guard = lock(&self.loaded);
        let loaded = guard.as_ref()?;
        let position_ms = loaded.sink.get_pos().as_millis().min(u128::from(u32::MAX)) as u32;
        Some((position_ms, loaded.duration_ms))
    }
}

/// Download an http audio source. Every failure, including an HTTP status,
/// stays a local backend error.
async fn fetch_http(http: &reqwest::Client, url: &str) -> PlayerResult<Vec<u8>> {
    tracing::debug!(url = %url, "Fetching audio stream");
    let local_error = |e: reqwest::Error| PlayerError::backend(KIND, e.to_string());
    let bytes = http
        .get(url)
        .send()
        .await
        .map_err(local_error)?
        .error_for_status()
        .map_err(local_error)?
        .bytes()
        .await
        .map_err(local_error)?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/track.mp3")
    }

    #[tokio::test]
    async fn rejected_stream_is_a_local_backend_error() {
        let url = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let err = fetch_http(&reqwest::Client::new(), &url).await.unwrap_err();

        assert!(
            matches!(err, PlayerError::Backend { kind: BackendKind::LocalAudio, .. }),
            "{err:?}"
        );
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn stream_body_is_returned_whole() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 4\r\nconnection: close\r\n\r\nRIFF",
        )
        .await;

        let bytes = fetch_http(&reqwest::Client::new(), &url).await.unwrap();

        assert_eq!(bytes, b"RIFF");
    }

    #[test]
    fn http_handles_are_streams_and_the_rest_are_paths() {
        assert_eq!(
            AudioSource::parse("https://example.com/a.mp3"),
            AudioSource::Http("https://example.com/a.mp3".into())
        );
        assert_eq!(
            AudioSource::parse("file:///music/a.flac"),
            AudioSource::File(PathBuf::from("/music/a.flac"))
        );
        assert_eq!(
            AudioSource::parse("songs/a.ogg"),
            AudioSource::File(PathBuf::from("songs/a.ogg"))
        );
    }

    #[test]
    fn volume_maps_to_unit_gain() {
        assert_eq!(volume_gain(0), 0.0);
        assert_eq!(volume_gain(50), 0.5);
        assert_eq!(volume_gain(250), 1.0);
    }
}
