//! The "add todo" form: its fields, schema, and bound action.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::TodoCreateInput;
use tracing::info;

use crate::{
    action::{execute, ActionState},
    form::FormData,
    schema::{field, RecordSchema, TypedSchema},
    submission::FormAction,
    todo_api::TodoApi,
};

pub const ADD_TODO_FIELDS: &[&str] = &["title", "description", "dueDate"];
pub const TITLE_REQUIRED_MESSAGE: &str = "Please enter a title";
pub const TITLE_TOO_LONG_MESSAGE: &str = "Title must be at most 200 characters";
pub const DUE_DATE_MESSAGE: &str = "Due date must be an RFC 3339 timestamp";
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create todo";
pub const TITLE_MAX_CHARS: usize = 200;

pub fn todo_schema() -> TypedSchema<TodoCreateInput> {
    TypedSchema::new(
        RecordSchema::new()
            .with(
                field("title")
                    .trim()
                    .min_length(1, TITLE_REQUIRED_MESSAGE)
                    .max_length(TITLE_MAX_CHARS, TITLE_TOO_LONG_MESSAGE),
            )
            .with(field("description").optional())
            .with(field("dueDate").omit_blank().trim().rfc3339(DUE_DATE_MESSAGE)),
    )
}

pub struct AddTodoAction<A> {
    api: A,
    schema: TypedSchema<TodoCreateInput>,
}

impl<A: TodoApi> AddTodoAction<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            schema: todo_schema(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: TodoApi + 'static> FormAction for AddTodoAction<A> {
    fn declared_keys(&self) -> &[&str] {
        ADD_TODO_FIELDS
    }

    async fn call(&self, _previous: Arc<ActionState>, form: FormData) -> ActionState {
        execute(
            &form,
            ADD_TODO_FIELDS,
            &self.schema,
            |input| async move {
                let todo = self.api.create_todo(&input).await?;
                info!(todo_id = %todo.id, "todo created");
                Ok::<_, anyhow::Error>(todo)
            },
            CREATE_FAILED_MESSAGE,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/todo_form_tests.rs"]
mod tests;
