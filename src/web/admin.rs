//! Admin-only log viewer: recent captured lines and a live SSE stream

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::info;

use super::auth::require_admin;
use super::error::ApiError;
use super::server::WebState;

const DEFAULT_LOG_COUNT: usize = 200;
const MAX_LOG_COUNT: usize = 1000;

pub fn routes() -> Router<WebState> {
    Router::new()
        .route("/api/admin/logs", get(recent_logs))
        .route("/api/admin/logs/download", get(download_logs))
        .route("/api/admin/logs/stream", get(logs_stream))
}

#[derive(Deserialize)]
struct LogQuery {
    count: Option<usize>,
    level: Option<String>,
}

impl LogQuery {
    fn count(&self) -> usize {
        self.count.unwrap_or(DEFAULT_LOG_COUNT).clamp(1, MAX_LOG_COUNT)
    }
}

/// GET /api/admin/logs?count=&level=
async fn recent_logs(
    headers: HeaderMap,
    State(state): State<WebState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&headers, &state).await?;
    let logs = state
        .log_buffer
        .recent(query.count(), query.level.as_deref());
    Ok(Json(json!({
        "logs": logs,
        "buffered": state.log_buffer.len(),
    })))
}

/// GET /api/admin/logs/download - plain text, one entry per line
async fn download_logs(
    headers: HeaderMap,
    State(state): State<WebState>,
    Query(query): Query<LogQuery>,
) -> Result<Response, ApiError> {
    let session = require_admin(&headers, &state).await?;
    info!("{} downloaded the server log", session.discord.id);

    let text: String = state
        .log_buffer
        .recent(MAX_LOG_COUNT, query.level.as_deref())
        .iter()
        .map(|entry| entry.format() + "\n")
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"pitchside.log\"",
            ),
        ],
        text,
    )
        .into_response())
}

/// GET /api/admin/logs/stream?level= - SSE of new entries
async fn logs_stream(
    headers: HeaderMap,
    State(state): State<WebState>,
    Query(query): Query<LogQuery>,
) -> Result<Response, ApiError> {
    let session = require_admin(&headers, &state).await?;
    info!("{} opened the live log stream", session.discord.id);

    let min_level = query.level;
    let rx = state.log_buffer.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(entry) => {
            if min_level.as_deref().map_or(true, |level| entry.at_least(level)) {
                let data = serde_json::to_string(&entry).ok()?;
                Some(Ok::<_, Infallible>(Event::default().data(data)))
            } else {
                None
            }
        }
        // Lagged: the client missed entries, keep streaming
        Err(_) => None,
    });

    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        )
        .into_response())
}
