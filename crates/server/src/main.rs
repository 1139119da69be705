use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use server_api::{create_todo, delete_todo, get_todo, list_todos, update_todo, ApiContext};
use shared::{
    domain::{Todo, TodoCreateInput, TodoId, TodoUpdateInput},
    error::{ApiError, ErrorCode},
    protocol::{ListTodosQuery, ListTodosResponse},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/todos", get(http_list_todos).post(http_create_todo))
        .route(
            "/todos/:id",
            get(http_get_todo)
                .patch(http_update_todo)
                .delete(http_delete_todo),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_list_todos(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListTodosQuery>,
) -> Result<Json<ListTodosResponse>, HttpError> {
    let items = list_todos(&state.api, q.status, q.limit)
        .await
        .map_err(into_http)?;
    Ok(Json(ListTodosResponse {
        items,
        next_cursor: None,
    }))
}

async fn http_create_todo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TodoCreateInput>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(input) = payload.map_err(invalid_json)?;
    let todo = create_todo(&state.api, input).await.map_err(into_http)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn http_get_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, HttpError> {
    let todo = get_todo(&state.api, &TodoId(id)).await.map_err(into_http)?;
    Ok(Json(todo))
}

async fn http_update_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TodoUpdateInput>, JsonRejection>,
) -> Result<Json<Todo>, HttpError> {
    let Json(input) = payload.map_err(invalid_json)?;
    let todo = update_todo(&state.api, &TodoId(id), input)
        .await
        .map_err(into_http)?;
    Ok(Json(todo))
}

async fn http_delete_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    delete_todo(&state.api, &TodoId(id))
        .await
        .map_err(into_http)?;
    Ok(StatusCode::NO_CONTENT)
}

fn into_http(err: ApiError) -> HttpError {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

fn invalid_json(rejection: JsonRejection) -> HttpError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(
            ErrorCode::Validation,
            format!("invalid JSON: {}", rejection.body_text()),
        )),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
