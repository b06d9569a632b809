mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{Fakes, SCRIPT};
use std::sync::Arc;
use std::time::Duration;
use synoid_story::server;
use synoid_story::state::{KernelState, RunStatus};
use tower::ServiceExt;

fn app(output: &std::path::Path, api_key: Option<&str>) -> (Router, Arc<KernelState>) {
    let pipeline = Arc::new(Fakes::new(SCRIPT).pipeline(output));
    let state = Arc::new(KernelState::new(pipeline, api_key.map(str::to_string)));
    (server::create_router(state.clone()), state)
}

fn generate_request(body: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("Content-Type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_form_page_is_public() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), Some("test_key"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_authenticated_access() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), Some("test_key"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/runs/unknown")
                .header("X-API-Key", "test_key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Past the guard; the run simply does not exist.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_unauthorized_access() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), Some("test_key"));

    let response = app
        .oneshot(generate_request(
            r#"{"theme":"Horror","main_character":"A lighthouse keeper"}"#,
            Some("wrong_key"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_stream_query_param_auth() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), Some("test_key"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/runs/unknown/video?api_key=test_key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_query_key_is_percent_decoded() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), Some("a+b/c"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/runs/unknown?api_key=a%2Bb%2Fc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unencoded, `+` reads as a space and must not match.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/runs/unknown?api_key=a+b/c")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settled_runs_beyond_retention_are_dropped() {
    let output = tempfile::tempdir().unwrap();
    let pipeline = Arc::new(Fakes::new(SCRIPT).pipeline(output.path()));
    let state = Arc::new(KernelState::new(pipeline, None).with_retention(1));
    let app = server::create_router(state.clone());

    let mut ids = Vec::new();
    for theme in ["Sci-Fi", "Horror"] {
        let response = app
            .clone()
            .oneshot(generate_request(
                &format!(r#"{{"theme":"{}","main_character":"A pilot"}}"#, theme),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let run_id = json_body(response).await["run_id"].as_str().unwrap().to_string();
        wait_until_settled(&state, &run_id).await;
        ids.push(run_id);
    }

    assert!(state.snapshot(&ids[0]).is_none(), "oldest settled run still held");
    assert_eq!(state.snapshot(&ids[1]).map(|r| r.status), Some(RunStatus::Finished));
    assert_eq!(state.active_runs(), 0);
}

async fn wait_until_settled(state: &KernelState, run_id: &str) {
    for _ in 0..100 {
        match state.snapshot(run_id) {
            Some(run) if run.status == RunStatus::Finished => return,
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    panic!("run did not finish: {:?}", state.snapshot(run_id));
}

#[tokio::test]
async fn test_generate_rejects_blank_fields() {
    let output = tempfile::tempdir().unwrap();
    let (app, state) = app(output.path(), None);

    let response = app
        .oneshot(generate_request(r#"{"theme":"  ","main_character":"A pilot"}"#, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.active_runs(), 0);
}

#[tokio::test]
async fn test_generate_rejects_unknown_tone() {
    let output = tempfile::tempdir().unwrap();
    let (app, _) = app(output.path(), None);

    let response = app
        .oneshot(generate_request(
            r#"{"theme":"Sci-Fi","main_character":"A pilot","tone":"Sarcastic"}"#,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_runs_to_completion() {
    let output = tempfile::tempdir().unwrap();
    let (app, state) = app(output.path(), None);

    let response = app
        .clone()
        .oneshot(generate_request(
            r#"{"theme":"Sci-Fi","main_character":"A pilot","tone":"epic"}"#,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    let run_id = body["run_id"].as_str().unwrap().to_string();
    assert_eq!(body["status_url"], format!("/api/runs/{}", run_id));

    let mut finished = false;
    for _ in 0..100 {
        if let Some(run) = state.snapshot(&run_id) {
            if run.status == RunStatus::Finished {
                finished = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(finished, "run did not finish: {:?}", state.snapshot(&run_id));

    let status = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/runs/{}", run_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let run = json_body(status).await;
    assert_eq!(run["status"], "finished");
    assert_eq!(run["scenes_ready"], 4);
    assert_eq!(run["request"]["tone"], "Epic");

    let video = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/runs/{}/video", run_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(video.status(), StatusCode::OK);
}
