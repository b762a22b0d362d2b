use async_trait::async_trait;
use now_playing_core::{AccessToken, Credentials, PlaybackStatus};
use thiserror::Error;
use tracing::{debug, warn};

mod cache;
mod ports;

pub use cache::CachedResolver;
pub use ports::{PlaybackApi, PrimaryResponse, UpstreamError};

#[cfg(test)]
pub(crate) use ports::MockPlaybackApi;

pub const RECENTLY_PLAYED_LIMIT: u32 = 1;

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("access token exchange failed: {0}")]
    AuthExchangeFailed(#[source] UpstreamError),
    #[error("playback query failed: {0}")]
    UpstreamQueryFailed(#[source] UpstreamError),
}

/// Anything that can hand out the current playback snapshot.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn current_status(&self) -> Result<PlaybackStatus, ResolveError>;
}

/// Turns the configured credentials into a playback snapshot: one token
/// exchange, one primary query and at most one fallback query per call.
pub struct NowPlayingResolver<A> {
    api: A,
    credentials: Credentials,
}

impl<A: PlaybackApi> NowPlayingResolver<A> {
    pub fn new(api: A, credentials: Credentials) -> Self {
        Self { api, credentials }
    }

    pub async fn resolve(&self) -> Result<PlaybackStatus, ResolveError> {
        let token = self
            .api
            .exchange_token(&self.credentials)
            .await
            .map_err(ResolveError::AuthExchangeFailed)?;

        let primary = self
            .api
            .currently_playing(&token)
            .await
            .map_err(ResolveError::UpstreamQueryFailed)?;

        match primary {
            PrimaryResponse::Playing(current) => {
                debug!(is_playing = current.is_playing, "currently playing answered");
                Ok(PlaybackStatus::now_playing(current))
            }
            PrimaryResponse::NoContent => {
                debug!("nothing playing; querying recently played");
                self.fallback(&token).await
            }
            PrimaryResponse::Failed(status) => {
                warn!(status, "currently playing query failed; querying recently played");
                self.fallback(&token).await
            }
        }
    }

    async fn fallback(&self, token: &AccessToken) -> Result<PlaybackStatus, ResolveError> {
        let recent = self
            .api
            .recently_played(token, RECENTLY_PLAYED_LIMIT)
            .await
            .map_err(ResolveError::UpstreamQueryFailed)?;

        Ok(PlaybackStatus::recently_played(recent.into_latest_track()))
    }
}

#[async_trait]
impl<A: PlaybackApi> StatusSource for NowPlayingResolver<A> {
    async fn current_status(&self) -> Result<PlaybackStatus, ResolveError> {
        self.resolve().await
    }
}
