use crate::{NowPlayingResolver, PlaybackApi, ResolveError, StatusSource};
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use now_playing_core::PlaybackStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

type Resolution = Result<PlaybackStatus, ResolveError>;
type Flight = Shared<BoxFuture<'static, Resolution>>;

struct CachedStatus {
    status: PlaybackStatus,
    resolved_at: Instant,
}

#[derive(Default)]
struct Slot {
    cached: Option<CachedStatus>,
    in_flight: Option<(u64, Flight)>,
    generation: u64,
}

/// Reuses a successful snapshot for `ttl` and lets at most one resolution
/// run at a time. Every caller arriving while a resolution is running gets
/// that resolution's outcome, error included. Failures are never stored, so
/// the first caller after a failed flight starts a new one.
pub struct CachedResolver<A> {
    inner: Arc<NowPlayingResolver<A>>,
    ttl: Duration,
    slot: Mutex<Slot>,
}

impl<A: PlaybackApi + 'static> CachedResolver<A> {
    pub fn new(inner: NowPlayingResolver<A>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            ttl,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub async fn resolve(&self) -> Resolution {
        let (generation, flight) = {
            let mut slot = self.slot.lock().await;

            if let Some(cached) = slot.cached.as_ref() {
                let age = cached.resolved_at.elapsed();
                if age < self.ttl {
                    debug!(age_ms = age.as_millis() as u64, "serving cached playback status");
                    return Ok(cached.status.clone());
                }
            }

            match slot.in_flight.as_ref() {
                Some((generation, flight)) => {
                    debug!(generation, "joining in-flight resolution");
                    (*generation, flight.clone())
                }
                None => {
                    slot.generation += 1;
                    let generation = slot.generation;
                    let inner = Arc::clone(&self.inner);
                    let flight = async move { inner.resolve().await }.boxed().shared();
                    slot.in_flight = Some((generation, flight.clone()));
                    (generation, flight)
                }
            }
        };

        let result = flight.await;

        let mut slot = self.slot.lock().await;
        if matches!(slot.in_flight, Some((current, _)) if current == generation) {
            slot.in_flight = None;
            if let Ok(status) = &result {
                slot.cached = Some(CachedStatus {
                    status: status.clone(),
                    resolved_at: Instant::now(),
                });
            }
        }
        result
    }
}

#[async_trait]
impl<A: PlaybackApi + 'static> StatusSource for CachedResolver<A> {
    async fn current_status(&self) -> Result<PlaybackStatus, ResolveError> {
        self.resolve().await
    }
}
