use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use now_playing_core::{AppConfig, PlaybackStatus};
use now_playing_http::{router, serve, AppState};
use now_playing_resolver::{CachedResolver, NowPlayingResolver, PlaybackApi};
use now_playing_spotify::SpotifyApi;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod setup;

/// Album art width printed by `status` and `doctor`.
const ART_WIDTH: u32 = 300;

#[derive(Parser, Debug)]
#[command(
    name = "now-playing",
    about = "Spotify now playing -> recently played fallback -> JSON endpoint"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the now-playing endpoint
    Run,
    /// Check configuration and upstream access
    Doctor,
    /// Resolve the playback status once and print it
    Status,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg_path = cli.config.unwrap_or_else(setup::default_config_path);

    let command = match cli.command.unwrap_or(Commands::Run) {
        Commands::Config {
            action: ConfigAction::Init { force },
        } => {
            setup::write_default_config(&cfg_path, force)?;
            println!("Initialized config at {}", cfg_path.display());
            return Ok(());
        }
        command => command,
    };

    let cfg = setup::load_config(&cfg_path, |key| std::env::var(key).ok())?;
    setup::init_logging(setup::log_filter(&cfg.log_level)?);

    match command {
        Commands::Doctor => doctor(&cfg).await,
        Commands::Status => status(&cfg).await,
        _ => run(cfg).await,
    }
}

async fn run(cfg: AppConfig) -> Result<()> {
    let settings = cfg
        .upstream_settings()
        .context("refusing to start with invalid configuration")?;
    let addr = cfg
        .bind_addr()
        .context("refusing to start with invalid configuration")?;

    let api = SpotifyApi::new(&settings).context("failed to build upstream http client")?;
    let resolver = CachedResolver::new(
        NowPlayingResolver::new(api, settings.credentials),
        cfg.cache_ttl(),
    );
    let state = AppState::new(Arc::new(resolver), cfg.server.cache_max_age_secs);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        cache_ttl_ms = cfg.cache.ttl_ms,
        edge_max_age_secs = cfg.server.cache_max_age_secs,
        max_staleness_secs = cfg.max_staleness().as_secs(),
        timeout_ms = cfg.spotify.timeout_ms,
        "now-playing started"
    );

    serve(listener, router(state), shutdown_signal())
        .await
        .context("http server failed")?;

    info!("now-playing stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c; shutting down"),
        Err(err) => {
            warn!(error=%err, "unable to listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn doctor(cfg: &AppConfig) -> Result<()> {
    println!("== now-playing doctor ==");

    let settings = match cfg.upstream_settings() {
        Ok(settings) => {
            println!("Configuration: ok");
            settings
        }
        Err(err) => {
            println!("Configuration: {err}");
            return Ok(());
        }
    };
    match cfg.bind_addr() {
        Ok(addr) => println!("Bind address: {addr}"),
        Err(err) => println!("Bind address: {err}"),
    }
    println!("Worst-case staleness: {}s", cfg.max_staleness().as_secs());
    println!("Token endpoint: {}", settings.endpoints.token);
    println!(
        "Currently playing endpoint: {}",
        settings.endpoints.currently_playing
    );

    let api = SpotifyApi::new(&settings).context("failed to build upstream http client")?;
    match api.exchange_token(&settings.credentials).await {
        Ok(_) => println!("Token exchange: ok"),
        Err(err) => {
            println!("Token exchange: {err}");
            return Ok(());
        }
    }

    let resolver = NowPlayingResolver::new(api, settings.credentials);
    match resolver.resolve().await {
        Ok(status) => {
            println!("Resolution: ok");
            write_status(&mut io::stdout().lock(), &status)?;
        }
        Err(err) => println!("Resolution: {err}"),
    }

    Ok(())
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let settings = cfg.upstream_settings()?;
    let api = SpotifyApi::new(&settings).context("failed to build upstream http client")?;
    let status = NowPlayingResolver::new(api, settings.credentials)
        .resolve()
        .await
        .context("failed to resolve playback status")?;

    write_status(&mut io::stdout().lock(), &status)?;
    Ok(())
}

fn write_status(out: &mut impl Write, status: &PlaybackStatus) -> io::Result<()> {
    let state = if status.is_playing {
        "playing"
    } else {
        "not playing"
    };
    writeln!(out, "state: {state}")?;

    let Some(track) = &status.track else {
        return writeln!(out, "track: <none>");
    };
    let label = if status.is_playing { "track" } else { "last played" };
    writeln!(
        out,
        "{label}: {} - {}",
        track.artist_names(),
        track.name.as_deref().unwrap_or("<untitled>")
    )?;
    if let Some(album) = track.album.as_ref().and_then(|a| a.name.as_deref()) {
        writeln!(out, "album: {album}")?;
    }
    if let Some(art) = track.album_art_url(ART_WIDTH) {
        writeln!(out, "art: {art}")?;
    }
    if let Some(link) = track.link() {
        writeln!(out, "link: {link}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_status;
    use now_playing_core::{Album, Artist, ExternalUrls, Image, PlaybackStatus, Track};

    fn rendered(status: &PlaybackStatus) -> String {
        let mut out = Vec::new();
        write_status(&mut out, status).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn last_played_track_is_labelled_with_art() {
        let track = Track {
            name: Some("Song".to_string()),
            artists: vec![Artist {
                name: "A".to_string(),
                ..Default::default()
            }],
            album: Some(Album {
                name: Some("LP".to_string()),
                images: vec![
                    Image {
                        url: "https://i/640".to_string(),
                        width: Some(640),
                        height: Some(640),
                    },
                    Image {
                        url: "https://i/300".to_string(),
                        width: Some(300),
                        height: Some(300),
                    },
                ],
                ..Default::default()
            }),
            external_urls: ExternalUrls {
                spotify: Some("https://open.spotify.com/track/t1".to_string()),
            },
            ..Default::default()
        };

        let text = rendered(&PlaybackStatus::recently_played(Some(track)));

        assert_eq!(
            text,
            "state: not playing\n\
             last played: A - Song\n\
             album: LP\n\
             art: https://i/300\n\
             link: https://open.spotify.com/track/t1\n"
        );
    }

    #[test]
    fn missing_track_prints_placeholder() {
        let text = rendered(&PlaybackStatus::recently_played(None));
        assert_eq!(text, "state: not playing\ntrack: <none>\n");
    }
}
