pub mod config;
pub mod model;
pub mod urls;

pub use config::{AppConfig, ConfigError, Credentials, UpstreamSettings};
pub use model::{
    AccessToken, Album, Artist, CurrentlyPlaying, ExternalUrls, Image, PlayHistory,
    PlaybackStatus, RecentlyPlayed, TokenResponse, Track,
};
pub use urls::Endpoints;
