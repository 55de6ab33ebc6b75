mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{cat_transcoder, ScriptedFactory};
use live_interpreter::{create_router, AppState, SessionConfig, SessionController};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

fn app_state() -> AppState {
    let config = SessionConfig {
        transcoder: cat_transcoder(),
        ..SessionConfig::default()
    };
    AppState::new(SessionController::new(
        config,
        Arc::new(ScriptedFactory::default()),
        None,
    ))
}

#[tokio::test]
async fn test_health_check() {
    let state = app_state();
    state.active_sessions.fetch_add(2, Ordering::SeqCst);
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["active_sessions"], 2);
}

#[tokio::test]
async fn test_plain_get_on_session_route_is_rejected() {
    let app = create_router(app_state());

    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Not a WebSocket upgrade request
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router(app_state());

    let response = app
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_guard_tracks_active_count() {
    let state = app_state();

    let first = state.track_session();
    let second = state.track_session();
    assert_eq!(state.active_session_count(), 2);

    drop(first);
    assert_eq!(state.active_session_count(), 1);
    drop(second);
    assert_eq!(state.active_session_count(), 0);
}

#[tokio::test]
async fn test_active_count_released_when_session_task_fails() {
    let state = app_state();

    let panicking = {
        let state = state.clone();
        tokio::spawn(async move {
            let _active = state.track_session();
            panic!("session handler blew up");
        })
    };
    assert!(panicking.await.is_err());
    assert_eq!(state.active_session_count(), 0);

    let cancelled = {
        let state = state.clone();
        tokio::spawn(async move {
            let _active = state.track_session();
            std::future::pending::<()>().await;
        })
    };
    let counted = state.clone();
    assert!(common::wait_until(move || counted.active_session_count() == 1).await);

    cancelled.abort();
    assert!(cancelled.await.unwrap_err().is_cancelled());
    assert_eq!(state.active_session_count(), 0);
}
