use super::*;
use axum::{
    body::{self, Body},
    http::Request,
};
use tower::ServiceExt;

async fn test_app() -> Router {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    build_router(Arc::new(AppState {
        api: ApiContext { storage },
    }))
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let app = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn create_then_fetch_and_list_todo() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/todos",
            serde_json::json!({ "title": "Buy milk", "description": "" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Todo = read_json(response).await;
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.description.as_deref(), Some(""));

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/todos/{}", created.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Todo = read_json(response).await;
    assert_eq!(fetched, created);

    let response = app
        .oneshot(
            Request::get("/todos?status=open&limit=5")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed: serde_json::Value = read_json(response).await;
    assert_eq!(listed["items"].as_array().map(Vec::len), Some(1));
    assert!(listed["nextCursor"].is_null());
}

#[tokio::test]
async fn blank_title_and_bad_json_are_bad_requests() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/todos",
            serde_json::json!({ "title": "" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);

    let response = app
        .oneshot(
            Request::post("/todos")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_updates_status_and_delete_removes() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/todos",
            serde_json::json!({ "title": "Ship it" }),
        ))
        .await
        .expect("response");
    let created: Todo = read_json(response).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/todos/{}", created.id),
            serde_json::json!({ "status": "done" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Todo = read_json(response).await;
    assert_eq!(updated.status, shared::domain::TodoStatus::Done);
    assert_eq!(updated.title, "Ship it");

    let delete = || {
        Request::delete(format!("/todos/{}", created.id))
            .body(Body::empty())
            .expect("request")
    };
    let response = app.clone().oneshot(delete()).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(delete()).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_todo_is_not_found() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::get("/todos/does-not-exist")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::NotFound);
}
