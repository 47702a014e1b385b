//! Status dashboard.
//!
//! Serves the configured directory as static files, with `index.html` at `/`
//! (or a small built-in page when it is missing), and the live counters as
//! JSON under `/api/stats`.

use anyhow::{Context, Result};
use axum::{extract::State, response::Html, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::dispatch::Pipeline;

const FALLBACK_INDEX_HTML: &str = "<!doctype html>
<html>
<head><title>cmdbot</title></head>
<body>
<h1>cmdbot</h1>
<pre id=\"stats\">loading...</pre>
<script>
fetch('/api/stats').then(r => r.json()).then(s => {
  document.getElementById('stats').textContent = JSON.stringify(s, null, 2);
});
</script>
</body>
</html>
";

#[derive(Clone)]
struct DashboardState {
    pipeline: Arc<Pipeline>,
    directory: PathBuf,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total_users: u64,
    total_messages: u64,
    uptime_secs: i64,
}

fn router(state: DashboardState) -> Router {
    let assets = ServeDir::new(&state.directory);
    Router::new()
        .route("/", get(serve_index))
        .route("/api/stats", get(stats))
        .fallback_service(assets)
        .with_state(state)
}

async fn serve_index(State(state): State<DashboardState>) -> Html<String> {
    let path = state.directory.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html),
        Err(_) => Html(FALLBACK_INDEX_HTML.to_string()),
    }
}

async fn stats(State(state): State<DashboardState>) -> Json<StatsResponse> {
    Json(stats_response(&state.pipeline))
}

fn stats_response(pipeline: &Pipeline) -> StatsResponse {
    let snapshot = pipeline.stats().snapshot();
    StatsResponse {
        total_users: snapshot.total_users,
        total_messages: snapshot.total_messages,
        uptime_secs: (Utc::now() - pipeline.start_time()).num_seconds(),
    }
}

/// Serve until the process exits
pub async fn serve(config: &DashboardConfig, pipeline: Arc<Pipeline>) -> Result<()> {
    let state = DashboardState {
        pipeline,
        directory: config.directory.clone(),
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind dashboard to {}", config.bind))?;
    info!("Dashboard running on http://{}", config.bind);

    axum::serve(listener, router(state))
        .await
        .context("Dashboard server error")?;
    Ok(())
}

/// Run the dashboard in the background; a failure is logged and the bot keeps going
pub fn spawn(config: &DashboardConfig, pipeline: Arc<Pipeline>) {
    if !config.enabled {
        info!("Dashboard disabled");
        return;
    }
    let config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(&config, pipeline).await {
            warn!("Dashboard stopped: {:#}", e);
        }
    });
}
