use shared::{
    domain::{Todo, TodoCreateInput, TodoId, TodoStatus, TodoUpdateInput},
    error::{ApiError, ErrorCode},
    protocol::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT},
};
use storage::{NewTodo, Storage, TodoChanges};
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

/// A missing or zero limit falls back to the default page size.
pub fn effective_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_LIST_LIMIT,
        Some(limit) => limit.min(MAX_LIST_LIMIT),
    }
}

pub async fn list_todos(
    ctx: &ApiContext,
    status: Option<TodoStatus>,
    limit: Option<u32>,
) -> Result<Vec<Todo>, ApiError> {
    ctx.storage
        .list_todos(status, effective_limit(limit))
        .await
        .map_err(internal)
}

pub async fn get_todo(ctx: &ApiContext, id: &TodoId) -> Result<Todo, ApiError> {
    ctx.storage
        .get_todo(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(id))
}

pub async fn create_todo(ctx: &ApiContext, input: TodoCreateInput) -> Result<Todo, ApiError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("title is required"));
    }

    let id = TodoId::generate();
    let todo = ctx
        .storage
        .create_todo(NewTodo {
            id: &id,
            title,
            description: input.description.as_deref(),
            due_date: input.due_date,
        })
        .await
        .map_err(internal)?;
    info!(todo_id = %todo.id, "todo created");
    Ok(todo)
}

/// Fields absent from `input` keep their stored values.
pub async fn update_todo(
    ctx: &ApiContext,
    id: &TodoId,
    input: TodoUpdateInput,
) -> Result<Todo, ApiError> {
    let current = get_todo(ctx, id).await?;

    let title = match input.title.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::validation("title must not be empty")),
        Some(title) => title.to_string(),
        None => current.title,
    };
    let description = input.description.or(current.description);
    let status = input.status.unwrap_or(current.status);
    let due_date = input.due_date.or(current.due_date);

    ctx.storage
        .update_todo(
            id,
            TodoChanges {
                title: &title,
                description: description.as_deref(),
                status,
                due_date,
            },
        )
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(id))
}

pub async fn delete_todo(ctx: &ApiContext, id: &TodoId) -> Result<(), ApiError> {
    let removed = ctx.storage.delete_todo(id).await.map_err(internal)?;
    if !removed {
        return Err(not_found(id));
    }
    info!(todo_id = %id, "todo deleted");
    Ok(())
}

fn not_found(id: &TodoId) -> ApiError {
    ApiError::not_found(format!("todo {id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %format!("{err:#}"), "storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}
