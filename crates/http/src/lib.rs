use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use now_playing_resolver::{ResolveError, StatusSource};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::error;

pub const NOW_PLAYING_PATH: &str = "/api/spotify/now-playing";

const UNAVAILABLE: &str = "now playing status unavailable";

#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn StatusSource>,
    cache_control: HeaderValue,
}

impl AppState {
    pub fn new(source: Arc<dyn StatusSource>, cache_max_age_secs: u64) -> Self {
        Self {
            source,
            cache_control: cache_control_value(cache_max_age_secs),
        }
    }
}

pub fn cache_control_value(max_age_secs: u64) -> HeaderValue {
    if max_age_secs == 0 {
        return HeaderValue::from_static("no-store");
    }
    let value = format!("public, s-maxage={max_age_secs}, stale-while-revalidate={max_age_secs}");
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("no-store"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(NOW_PLAYING_PATH, get(now_playing))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn now_playing(State(state): State<AppState>) -> Result<Response, ApiError> {
    let status = state.source.current_status().await?;
    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(status),
    )
        .into_response())
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Maps any resolution failure to one opaque gateway error. Details only go
/// to the log.
pub struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "now playing resolution failed");
        (
            StatusCode::BAD_GATEWAY,
            [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
            Json(ErrorBody { error: UNAVAILABLE }),
        )
            .into_response()
    }
}
