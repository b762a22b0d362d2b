use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ExternalUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
}

impl ExternalUrls {
    fn is_empty(&self) -> bool {
        self.spotify.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Image {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Artist {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "ExternalUrls::is_empty")]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Album {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "ExternalUrls::is_empty")]
    pub external_urls: ExternalUrls,
}

/// The subset of an upstream track (or episode) the display layer reads.
/// Unknown upstream fields are dropped on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Track {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artists: Vec<Artist>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<Album>,
    #[serde(skip_serializing_if = "ExternalUrls::is_empty")]
    pub external_urls: ExternalUrls,
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn album_art_url(&self, target_width: u32) -> Option<&str> {
        self.album
            .as_ref()?
            .images
            .iter()
            .min_by_key(|img| img.width.unwrap_or(0).abs_diff(target_width))
            .map(|img| img.url.as_str())
    }

    pub fn link(&self) -> Option<&str> {
        self.external_urls.spotify.as_deref()
    }
}

/// Normalized playback snapshot returned to callers.
///
/// When `is_playing` is false any track present is the most recently played
/// item, not something playing right now.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlaybackStatus {
    #[serde(rename = "isPlaying")]
    pub is_playing: bool,
    #[serde(flatten)]
    pub track: Option<Track>,
}

impl PlaybackStatus {
    pub fn now_playing(current: CurrentlyPlaying) -> Self {
        Self {
            is_playing: current.is_playing,
            track: current.item,
        }
    }

    pub fn recently_played(track: Option<Track>) -> Self {
        Self {
            is_playing: false,
            track,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    /// Lifetime in seconds. Informational only: every resolution exchanges
    /// a fresh token.
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CurrentlyPlaying {
    pub is_playing: bool,
    pub item: Option<Track>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PlayHistory {
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RecentlyPlayed {
    pub items: Vec<PlayHistory>,
}

impl RecentlyPlayed {
    pub fn into_latest_track(self) -> Option<Track> {
        self.items.into_iter().next().and_then(|h| h.track)
    }
}

/// Short-lived bearer credential. Never cached between resolutions.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Album, Artist, CurrentlyPlaying, Image, PlaybackStatus, RecentlyPlayed, TokenResponse,
        Track,
    };
    use serde_json::json;

    #[test]
    fn playing_status_flattens_track_fields() {
        let current: CurrentlyPlaying =
            serde_json::from_value(json!({ "is_playing": true, "item": { "name": "Song X" } }))
                .unwrap();

        let out = serde_json::to_value(PlaybackStatus::now_playing(current)).unwrap();
        assert_eq!(out, json!({ "isPlaying": true, "name": "Song X" }));
    }

    #[test]
    fn empty_recent_history_serializes_to_bare_flag() {
        let recent: RecentlyPlayed = serde_json::from_value(json!({ "items": [] })).unwrap();

        let out = serde_json::to_value(PlaybackStatus::recently_played(recent.into_latest_track()))
            .unwrap();
        assert_eq!(out, json!({ "isPlaying": false }));
    }

    #[test]
    fn decoder_ignores_unknown_upstream_fields() {
        let body = json!({
            "is_playing": true,
            "progress_ms": 1234,
            "device": { "id": "abc", "volume_percent": 50 },
            "item": {
                "id": "t1",
                "name": "Song",
                "popularity": 77,
                "available_markets": ["US"],
                "artists": [{ "name": "A", "type": "artist" }, { "name": "B" }],
                "album": {
                    "name": "LP",
                    "album_type": "album",
                    "images": [{ "url": "https://i/640", "width": 640, "height": 640 }]
                },
                "external_urls": { "spotify": "https://open.spotify.com/track/t1" }
            }
        });

        let current: CurrentlyPlaying = serde_json::from_value(body).unwrap();
        let track = current.item.unwrap();
        assert_eq!(track.artist_names(), "A, B");
        assert_eq!(track.link(), Some("https://open.spotify.com/track/t1"));

        let out = serde_json::to_value(&track).unwrap();
        assert!(out.get("popularity").is_none());
        assert!(out["album"].get("album_type").is_none());
    }

    #[test]
    fn album_art_picks_closest_width() {
        let track = Track {
            name: Some("Song".to_string()),
            artists: vec![Artist {
                name: "A".to_string(),
                ..Default::default()
            }],
            album: Some(Album {
                images: vec![
                    Image {
                        url: "large".to_string(),
                        width: Some(640),
                        height: Some(640),
                    },
                    Image {
                        url: "medium".to_string(),
                        width: Some(300),
                        height: Some(300),
                    },
                    Image {
                        url: "small".to_string(),
                        width: Some(64),
                        height: Some(64),
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(track.album_art_url(300), Some("medium"));
        assert_eq!(track.album_art_url(1000), Some("large"));
        assert_eq!(Track::default().album_art_url(300), None);
    }

    #[test]
    fn first_history_entry_without_track_yields_none() {
        let recent: RecentlyPlayed =
            serde_json::from_value(json!({ "items": [{ "played_at": "2024-01-01T00:00:00Z" }] }))
                .unwrap();
        assert_eq!(recent.into_latest_track(), None);
    }

    #[test]
    fn token_response_reads_token_and_lifetime() {
        let body: TokenResponse = serde_json::from_value(json!({
            "access_token": "fresh",
            "token_type": "Bearer",
            "scope": "user-read-currently-playing",
            "expires_in": 3600
        }))
        .unwrap();

        assert_eq!(body.access_token.as_deref(), Some("fresh"));
        assert_eq!(body.expires_in, Some(3600));
    }
}
