use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{BackendEvent, EventSender, PlaybackBackend};

/// Polls one backend for its position and forwards ticks tagged with the
/// generation it was started for. Dropping the ticker stops it.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
    generation: u64,
}

impl ProgressTicker {
    pub fn spawn(
        backend: Arc<dyn PlaybackBackend>,
        generation: u64,
        interval: Duration,
        events: EventSender,
    ) -> Self {
        let kind = backend.kind();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some((position_ms, duration_ms)) = backend.poll_position().await else {
                    continue;
                };
                let tick = BackendEvent::Tick {
                    kind,
                    generation,
                    position_ms,
                    duration_ms,
                };
                if events.send(tick).is_err() {
                    break;
                }
            }
            tracing::trace!(%kind, generation, "Progress ticker finished");
        });
        Self { handle, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::backend::{event_channel, BackendKind, LoadRequest};
    use crate::error::PlayerResult;

    struct Counter(AtomicU32);

    #[async_trait]
    impl PlaybackBackend for Counter {
        fn kind(&self) -> BackendKind {
            BackendKind::LocalAudio
        }
        async fn load(&self, _request: LoadRequest) -> PlayerResult<()> {
            Ok(())
        }
        async fn pause(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn resume(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn seek(&self, _position: Duration) -> PlayerResult<()> {
            Ok(())
        }
        async fn set_volume(&self, _volume: u8) -> PlayerResult<()> {
            Ok(())
        }
        async fn release(&self) {}
        async fn shutdown(&self) {}
        async fn poll_position(&self) -> Option<(u32, Option<u32>)> {
            Some((self.0.fetch_add(1000, Ordering::SeqCst), Some(10_000)))
        }
    }

    #[tokio::test]
    async fn ticks_carry_generation_and_stop_on_drop() {
        let (tx, mut rx) = event_channel();
        let ticker = ProgressTicker::spawn(
            Arc::new(Counter(AtomicU32::new(0))),
            7,
            Duration::from_millis(20),
            tx,
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            BackendEvent::Tick {
                kind: BackendKind::LocalAudio,
                generation: 7,
                position_ms: 0,
                duration_ms: Some(10_000),
            }
        );
        assert_eq!(ticker.generation(), 7);

        drop(ticker);
        // The task held the only sender, so the channel closes once it is aborted.
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }
}
