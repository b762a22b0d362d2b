use async_trait::async_trait;
use now_playing_core::{AccessToken, Credentials, CurrentlyPlaying, RecentlyPlayed};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("upstream answered with status {0}")]
    Status(u16),
    #[error("token response did not contain an access token")]
    MissingAccessToken,
    #[error("upstream body could not be decoded: {0}")]
    Decode(String),
}

/// Outcome of the "currently playing" query before any fallback decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryResponse {
    Playing(CurrentlyPlaying),
    NoContent,
    Failed(u16),
}

/// Port over the authorization server and the playback endpoints.
///
/// The production implementation lives in `now-playing-spotify`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    async fn exchange_token(&self, credentials: &Credentials)
        -> Result<AccessToken, UpstreamError>;

    async fn currently_playing(&self, token: &AccessToken)
        -> Result<PrimaryResponse, UpstreamError>;

    async fn recently_played(
        &self,
        token: &AccessToken,
        limit: u32,
    ) -> Result<RecentlyPlayed, UpstreamError>;
}
