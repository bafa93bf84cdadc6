//! REST surface tests driven through the router with `tower::ServiceExt`,
//! no listening socket required.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use dialog_gateway::agent::EchoAgent;
use dialog_gateway::{AppState, ServerConfig, routes};

fn test_app(config: ServerConfig) -> (Router, Arc<AppState>) {
    let state = AppState::new(config, Arc::new(EchoAgent));
    (routes::create_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_session(app: &Router, query: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions{query}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app(ServerConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "dialog-gateway");
}

#[tokio::test]
async fn test_create_session_defaults_to_audio() {
    let (app, state) = test_app(ServerConfig::default());

    let (status, body) = create_session(&app, "").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["modality"], "audio");

    let session_id = body["session_id"].as_str().unwrap().parse().unwrap();
    assert!(state.sessions.get(&session_id).is_ok());
}

#[tokio::test]
async fn test_create_session_text_modality() {
    let (app, _) = test_app(ServerConfig::default());

    let (status, body) = create_session(&app, "?modality=text").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["modality"], "text");
}

#[tokio::test]
async fn test_respond_queues_action_through_gate() {
    let (app, state) = test_app(ServerConfig::default());
    let (_, created) = create_session(&app, "").await;
    let session_id_str = created["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id_str}/respond"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "type": "click_response", "clicked_image": "cat.jpg" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // no driver is attached, so the input is waiting in the gate
    let session_id = session_id_str.parse().unwrap();
    let session = state.sessions.get(&session_id).unwrap();
    assert_eq!(session.gate().pending_len(), 1);
}

#[tokio::test]
async fn test_respond_without_type_field_is_rejected() {
    let (app, _) = test_app(ServerConfig::default());
    let (_, created) = create_session(&app, "").await;
    let session_id = created["session_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/respond"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "clicked_image": "cat.jpg" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("type"));
}

#[tokio::test]
async fn test_respond_unknown_session_is_404() {
    let (app, _) = test_app(ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{}/respond", uuid::Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "type": "ping" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_audio_rejects_empty_body() {
    let (app, _) = test_app(ServerConfig::default());
    let (_, created) = create_session(&app, "").await;
    let session_id = created["session_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/audio"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_audio_queues_input() {
    let (app, state) = test_app(ServerConfig::default());
    let (_, created) = create_session(&app, "").await;
    let session_id_str = created["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id_str}/audio"))
                .body(Body::from(vec![0u8; 320]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let session_id = session_id_str.parse().unwrap();
    let session = state.sessions.get(&session_id).unwrap();
    assert_eq!(session.gate().pending_len(), 1);
}

#[tokio::test]
async fn test_pending_input_bound_returns_429() {
    let config = ServerConfig {
        max_pending_inputs: Some(1),
        ..ServerConfig::default()
    };
    let (app, _) = test_app(config);
    let (_, created) = create_session(&app, "").await;
    let session_id = created["session_id"].as_str().unwrap().to_string();

    for expected in [StatusCode::ACCEPTED, StatusCode::TOO_MANY_REQUESTS] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/sessions/{session_id}/respond"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "type": "ping" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn test_stop_session_removes_it() {
    let (app, state) = test_app(ServerConfig::default());
    let (_, created) = create_session(&app, "").await;
    let session_id_str = created["session_id"].as_str().unwrap().to_string();

    let delete = |uri: String| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
        }
    };

    assert_eq!(
        delete(format!("/sessions/{session_id_str}")).await,
        StatusCode::OK
    );
    let session_id = session_id_str.parse().unwrap();
    assert!(state.sessions.get(&session_id).is_err());

    // a second stop reports not-found
    assert_eq!(
        delete(format!("/sessions/{session_id_str}")).await,
        StatusCode::NOT_FOUND
    );
}
