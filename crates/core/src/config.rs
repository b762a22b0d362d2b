use crate::urls::Endpoints;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";
pub const ENV_BIND: &str = "NOW_PLAYING_BIND";
pub const ENV_LOG_LEVEL: &str = "NOW_PLAYING_LOG_LEVEL";
pub const ENV_CACHE_TTL_MS: &str = "NOW_PLAYING_CACHE_TTL_MS";

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required credential `{0}` is missing or empty")]
    MissingCredential(&'static str),
    #[error("`{field}` is not a valid http(s) url: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("`server.bind` is not a socket address: {0}")]
    InvalidBind(String),
    #[error("`spotify.timeout_ms` must be greater than zero")]
    InvalidTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
    pub api_base_url: String,
    pub timeout_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com/v1/".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// `s-maxage` handed to the delivery layer, also used as its
    /// `stale-while-revalidate` window. Zero sends `no-store`.
    ///
    /// This stacks on top of `cache.ttl_ms`: a client can see a snapshot up
    /// to `ttl + 2 * cache_max_age_secs` old. See [`AppConfig::max_staleness`].
    pub cache_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            cache_max_age_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub spotify: SpotifyConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            spotify: SpotifyConfig::default(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Overlays environment values on top of the file contents. Blank values
    /// and unparsable numbers leave the current setting alone.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_blank(ENV_CLIENT_ID) {
            self.spotify.client_id = v;
        }
        if let Some(v) = non_blank(ENV_CLIENT_SECRET) {
            self.spotify.client_secret = v;
        }
        if let Some(v) = non_blank(ENV_REFRESH_TOKEN) {
            self.spotify.refresh_token = v;
        }
        if let Some(v) = non_blank(ENV_BIND) {
            self.server.bind = v;
        }
        if let Some(v) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Some(v) = non_blank(ENV_CACHE_TTL_MS) {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.cache.ttl_ms = parsed;
            }
        }
    }

    pub fn upstream_settings(&self) -> Result<UpstreamSettings, ConfigError> {
        let credentials = Credentials::new(
            &self.spotify.client_id,
            &self.spotify.client_secret,
            &self.spotify.refresh_token,
        )?;
        let token_url = parse_http_url("spotify.token_url", &self.spotify.token_url)?;
        let api_base = parse_http_url("spotify.api_base_url", &self.spotify.api_base_url)?;
        let endpoints = Endpoints::from_base(token_url, &api_base).map_err(|err| {
            ConfigError::InvalidUrl {
                field: "spotify.api_base_url",
                reason: err.to_string(),
            }
        })?;
        if self.spotify.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(UpstreamSettings {
            credentials,
            endpoints,
            timeout: Duration::from_millis(self.spotify.timeout_ms),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.server.bind.clone()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    /// Oldest snapshot a client can be handed: the in-process TTL, then the
    /// delivery layer's fresh window, then its stale-while-revalidate window.
    pub fn max_staleness(&self) -> Duration {
        let edge = Duration::from_secs(self.server.cache_max_age_secs.saturating_mul(2));
        self.cache_ttl().saturating_add(edge)
    }
}

fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidUrl {
        field,
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// Long-lived application credentials for one fixed account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl Credentials {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: required("spotify.client_id", client_id)?,
            client_secret: required("spotify.client_secret", client_secret)?,
            refresh_token: required("spotify.refresh_token", refresh_token)?,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingCredential(field));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_CACHE_TTL_MS, ENV_CLIENT_ID, ENV_REFRESH_TOKEN};
    use std::collections::HashMap;
    use std::time::Duration;

    fn configured() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.spotify.client_id = "id".to_string();
        cfg.spotify.client_secret = "secret".to_string();
        cfg.spotify.refresh_token = "refresh".to_string();
        cfg
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            log_level = "debug"

            [spotify]
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.spotify.client_id, "abc");
        assert_eq!(cfg.spotify.timeout_ms, 10_000);
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.cache.ttl_ms, 30_000);
        assert_eq!(cfg.schema_version, 1);
    }

    #[test]
    fn missing_credential_is_a_config_error() {
        let mut cfg = configured();
        cfg.spotify.refresh_token = "   ".to_string();

        let err = cfg.upstream_settings().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential("spotify.refresh_token")
        ));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        let mut cfg = configured();
        cfg.spotify.token_url = "ftp://accounts.example.com/token".to_string();

        let err = cfg.upstream_settings().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                field: "spotify.token_url",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = configured();
        cfg.spotify.timeout_ms = 0;

        assert!(matches!(
            cfg.upstream_settings(),
            Err(ConfigError::InvalidTimeout)
        ));
    }

    #[test]
    fn valid_config_produces_settings() {
        let settings = configured().upstream_settings().unwrap();

        assert_eq!(settings.credentials.client_id(), "id");
        assert_eq!(settings.timeout.as_millis(), 10_000);
        assert_eq!(
            settings.endpoints.currently_playing.as_str(),
            "https://api.spotify.com/v1/me/player/currently-playing"
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let settings = configured().upstream_settings().unwrap();
        let printed = format!("{:?}", settings.credentials);

        assert!(printed.contains("id"));
        assert!(!printed.contains("\"secret\""));
        assert!(!printed.contains("\"refresh\""));
    }

    #[test]
    fn env_overrides_skip_blank_and_garbage_values() {
        let env: HashMap<&str, &str> = [
            (ENV_CLIENT_ID, "from-env"),
            (ENV_REFRESH_TOKEN, "  "),
            (ENV_CACHE_TTL_MS, "soon"),
        ]
        .into_iter()
        .collect();

        let mut cfg = configured();
        cfg.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.spotify.client_id, "from-env");
        assert_eq!(cfg.spotify.refresh_token, "refresh");
        assert_eq!(cfg.cache.ttl_ms, 30_000);
    }

    #[test]
    fn bind_address_is_validated() {
        let mut cfg = configured();
        assert!(cfg.bind_addr().is_ok());

        cfg.server.bind = "localhost".to_string();
        assert!(matches!(cfg.bind_addr(), Err(ConfigError::InvalidBind(_))));
    }

    #[test]
    fn staleness_adds_both_cache_layers() {
        let mut cfg = configured();
        assert_eq!(cfg.max_staleness(), Duration::from_secs(90));

        cfg.server.cache_max_age_secs = 0;
        cfg.cache.ttl_ms = 0;
        assert_eq!(cfg.max_staleness(), Duration::ZERO);
    }
}
