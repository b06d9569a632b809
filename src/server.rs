// SYNOID Story Server - Form & Run API
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt; // For oneshot
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::story::{StoryRequest, Tone};
use crate::state::{KernelState, RunRecorder, RunState, RunStatus};

pub type AppState = Arc<KernelState>;

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub theme: String,
    pub main_character: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub run_id: String,
    pub status_url: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/generate", post(generate))
        .route("/api/runs/:id", get(run_status))
        .route("/api/runs/:id/video", get(run_video))
        .route("/api/runs/:id/narration", get(run_narration))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(index))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let display_addr = if addr.ip().is_unspecified() {
        format!("127.0.0.1:{}", port)
    } else {
        addr.to_string()
    };
    info!("🚀 SYNOID Story Server running on http://{}", display_addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Accepts the key from `X-API-Key`, or from `?api_key=` so `<video>` and
/// `<audio>` elements can stream without custom headers.
async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let header = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());
    let query = req.uri().query().and_then(query_api_key);

    if header == Some(expected) || query.as_deref() == Some(expected) {
        next.run(req).await
    } else {
        warn!("[SERVER] Rejected request to {} without a valid API key", req.uri().path());
        error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

/// The `api_key` query parameter, percent-decoded the way the form encodes it.
fn query_api_key(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "api_key")
        .map(|(_, value)| value.into_owned())
}

async fn index() -> Html<String> {
    Html(render_form())
}

async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Response {
    let tone = match payload.tone.as_deref().map(str::trim) {
        None | Some("") => Tone::default(),
        Some(raw) => match raw.parse::<Tone>() {
            Ok(tone) => tone,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        },
    };

    let request = StoryRequest::new(&payload.theme, &payload.main_character, tone);
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let run_id = Uuid::new_v4().to_string();
    state.register(&run_id, request.clone());
    info!(
        "[SERVER] Run {} accepted: theme='{}', tone={} ({} active)",
        run_id,
        request.theme,
        request.tone,
        state.active_runs()
    );

    let task_state = state.clone();
    let task_id = run_id.clone();
    tokio::spawn(async move {
        let recorder = RunRecorder::new(task_state.clone(), &task_id);
        match task_state.pipeline.run(&task_id, &request, &recorder).await {
            Ok(output) => info!("[SERVER] Run {} produced {:?}", task_id, output.video.path),
            Err(e) => warn!("[SERVER] Run {} ended with error: {}", task_id, e),
        }
    });

    let status_url = format!("/api/runs/{}", run_id);
    (StatusCode::ACCEPTED, Json(GenerateResponse { run_id, status_url })).into_response()
}

async fn run_status(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.snapshot(&id) {
        Some(run) => Json(run).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("unknown run '{}'", id)),
    }
}

async fn run_video(
    Path(id): Path<String>,
    State(state): State<AppState>,
    req: Request,
) -> Response {
    let path = state
        .snapshot(&id)
        .filter(|run| run.status == RunStatus::Finished)
        .and_then(|run| run.video_path);
    serve_artifact(path, req).await
}

async fn run_narration(
    Path(id): Path<String>,
    State(state): State<AppState>,
    req: Request,
) -> Response {
    let path = state.snapshot(&id).and_then(|run: RunState| run.narration_path);
    serve_artifact(path, req).await
}

/// Streams a file the pipeline itself recorded; request input never names a path.
async fn serve_artifact(path: Option<PathBuf>, req: Request) -> Response {
    let Some(path) = path else {
        return error_response(StatusCode::NOT_FOUND, "artifact not ready");
    };
    if !path.exists() {
        return error_response(StatusCode::NOT_FOUND, "artifact missing on disk");
    }

    let service = tower_http::services::ServeFile::new(path);
    match service.oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(err) => {
            error!("ServeFile error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn render_form() -> String {
    let options: String = Tone::ALL
        .iter()
        .map(|t| format!(r#"<option value="{0}">{0}</option>"#, t.as_str()))
        .collect();
    FORM_TEMPLATE.replace("{{TONE_OPTIONS}}", &options)
}

const FORM_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>🎬 Story Video Generator</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; }
  label { display: block; margin-top: 1rem; }
  input, textarea, select { width: 100%; }
  pre { background: #111; color: #ddd; padding: 1rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>🎬 Story Video Generator</h1>
<form id="story-form">
  <label>Story Theme <input name="theme" placeholder="Sci-Fi, Horror, Romance..."></label>
  <label>Main Character <textarea name="main_character" placeholder="Who is the story about?"></textarea></label>
  <label>Tone <select name="tone">{{TONE_OPTIONS}}</select></label>
  <label>API Key <input name="api_key" type="password" placeholder="only if the server requires one"></label>
  <button type="submit">✨ Generate Story Video</button>
</form>
<p id="status"></p>
<pre id="log"></pre>
<div id="media"></div>
<script>
const form = document.getElementById('story-form');
form.addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const data = new FormData(form);
  const key = data.get('api_key');
  const headers = { 'Content-Type': 'application/json' };
  if (key) headers['X-API-Key'] = key;
  const res = await fetch('/api/generate', {
    method: 'POST',
    headers,
    body: JSON.stringify({
      theme: data.get('theme'),
      main_character: data.get('main_character'),
      tone: data.get('tone'),
    }),
  });
  const body = await res.json();
  if (!res.ok) { document.getElementById('status').textContent = '⚠️ ' + body.error; return; }
  poll(body.run_id, key, headers);
});

async function poll(id, key, headers) {
  const suffix = key ? '?api_key=' + encodeURIComponent(key) : '';
  const res = await fetch('/api/runs/' + id, { headers });
  const run = await res.json();
  document.getElementById('status').textContent = run.status + ' (' + run.scenes_ready + ' scenes ready)';
  document.getElementById('log').textContent = (run.script ? run.script + '\n\n' : '') + run.logs.join('\n');
  if (run.status === 'finished') {
    document.getElementById('media').innerHTML =
      '<audio controls src="/api/runs/' + id + '/narration' + suffix + '"></audio>' +
      '<video controls width="100%" src="/api/runs/' + id + '/video' + suffix + '"></video>';
  } else if (run.status !== 'failed') {
    setTimeout(() => poll(id, key, headers), 2000);
  }
}
</script>
</body>
</html>
"#;
