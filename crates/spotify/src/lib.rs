use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use now_playing_core::{
    AccessToken, Credentials, CurrentlyPlaying, Endpoints, RecentlyPlayed, TokenResponse,
    UpstreamSettings,
};
use now_playing_resolver::{PlaybackApi, PrimaryResponse, UpstreamError};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// reqwest-backed implementation of the playback port.
pub struct SpotifyApi {
    client: Client,
    endpoints: Endpoints,
}

impl SpotifyApi {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("now-playing/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, settings.endpoints.clone()))
    }

    pub fn with_client(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }
}

pub fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_decode() {
        UpstreamError::Decode(err.without_url().to_string())
    } else if err.is_timeout() {
        UpstreamError::Unreachable("request timed out".to_string())
    } else {
        UpstreamError::Unreachable(err.without_url().to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    response.json::<T>().await.map_err(transport_error)
}

#[async_trait]
impl PlaybackApi for SpotifyApi {
    async fn exchange_token(
        &self,
        credentials: &Credentials,
    ) -> Result<AccessToken, UpstreamError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", credentials.refresh_token()),
        ];

        let response = self
            .client
            .post(self.endpoints.token.clone())
            .header(
                AUTHORIZATION,
                basic_authorization(credentials.client_id(), credentials.client_secret()),
            )
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "token endpoint rejected the exchange");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: TokenResponse = decode(response).await?;
        debug!(expires_in = body.expires_in, "token endpoint issued an access token");
        match body.access_token {
            Some(token) if !token.trim().is_empty() => Ok(AccessToken::new(token)),
            _ => Err(UpstreamError::MissingAccessToken),
        }
    }

    async fn currently_playing(
        &self,
        token: &AccessToken,
    ) -> Result<PrimaryResponse, UpstreamError> {
        let response = self
            .client
            .get(self.endpoints.currently_playing.clone())
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(PrimaryResponse::NoContent);
        }
        if status.as_u16() >= 400 {
            return Ok(PrimaryResponse::Failed(status.as_u16()));
        }

        let body: CurrentlyPlaying = decode(response).await?;
        Ok(PrimaryResponse::Playing(body))
    }

    async fn recently_played(
        &self,
        token: &AccessToken,
        limit: u32,
    ) -> Result<RecentlyPlayed, UpstreamError> {
        let response = self
            .client
            .get(self.endpoints.recently_played(limit))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        decode(response).await
    }
}
