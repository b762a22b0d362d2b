use url::{ParseError, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token: Url,
    pub currently_playing: Url,
    recently_played: Url,
}

impl Endpoints {
    pub fn from_base(token: Url, api_base: &Url) -> Result<Self, ParseError> {
        let api_base = with_trailing_slash(api_base);
        Ok(Self {
            token,
            currently_playing: api_base.join("me/player/currently-playing")?,
            recently_played: api_base.join("me/player/recently-played")?,
        })
    }

    pub fn recently_played(&self, limit: u32) -> Url {
        let mut url = self.recently_played.clone();
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        url
    }
}

// `join` drops the last segment of a base without a trailing slash.
fn with_trailing_slash(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
