use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Todo, TodoId, TodoStatus};

const TODO_COLUMNS: &str = "id, title, description, status, due_date, created_at, updated_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Column values for a todo row, independent of who generated the id.
#[derive(Debug, Clone)]
pub struct NewTodo<'a> {
    pub id: &'a TodoId,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct TodoChanges<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: TodoStatus,
    pub due_date: Option<DateTime<Utc>>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // In-memory databases are per-connection, so a single connection keeps the schema visible.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run todo migrations")?;
        debug!(%database_url, "storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Newest first. `status = None` lists every status.
    pub async fn list_todos(&self, status: Option<TodoStatus>, limit: u32) -> Result<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))
        .bind(status.map(TodoStatus::as_str))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to list todos")?;

        rows.iter().map(todo_from_row).collect()
    }

    pub async fn get_todo(&self, id: &TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load todo {id}"))?;
        row.as_ref().map(todo_from_row).transpose()
    }

    pub async fn create_todo(&self, todo: NewTodo<'_>) -> Result<Todo> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO todos (id, title, description, status, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(todo.id.as_str())
        .bind(todo.title)
        .bind(todo.description)
        .bind(TodoStatus::Open.as_str())
        .bind(todo.due_date)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert todo {}", todo.id))?;
        todo_from_row(&row)
    }

    /// Returns `None` when no todo has `id`.
    pub async fn update_todo(&self, id: &TodoId, changes: TodoChanges<'_>) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos
             SET title = ?, description = ?, status = ?, due_date = ?, updated_at = ?
             WHERE id = ?
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status.as_str())
        .bind(changes.due_date)
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update todo {id}"))?;
        row.as_ref().map(todo_from_row).transpose()
    }

    /// Returns whether a row was removed.
    pub async fn delete_todo(&self, id: &TodoId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete todo {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn todo_from_row(row: &SqliteRow) -> Result<Todo> {
    let status: String = row.try_get("status")?;
    Ok(Todo {
        id: TodoId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: status.parse()?,
        due_date: row.try_get("due_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
