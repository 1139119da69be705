use async_trait::async_trait;
use reqwest::Method;
use shared::{
    domain::{Todo, TodoCreateInput, TodoId, TodoUpdateInput},
    protocol::{ListTodosQuery, ListTodosResponse},
};

use crate::{error::TransportError, transport::ApiTransport};

#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list_todos(&self, query: &ListTodosQuery) -> Result<ListTodosResponse, TransportError>;
    async fn get_todo(&self, id: &TodoId) -> Result<Todo, TransportError>;
    async fn create_todo(&self, input: &TodoCreateInput) -> Result<Todo, TransportError>;
    async fn update_todo(
        &self,
        id: &TodoId,
        input: &TodoUpdateInput,
    ) -> Result<Todo, TransportError>;
    async fn delete_todo(&self, id: &TodoId) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    transport: ApiTransport,
}

impl HttpTodoApi {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }

    pub fn connect(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self::new(ApiTransport::new(base_url)?))
    }

    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }
}

fn todo_path(id: &TodoId) -> String {
    format!("todos/{id}")
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list_todos(&self, query: &ListTodosQuery) -> Result<ListTodosResponse, TransportError> {
        let request = self.transport.request(Method::GET, "todos")?.query(query);
        ApiTransport::expect_json(request).await
    }

    async fn get_todo(&self, id: &TodoId) -> Result<Todo, TransportError> {
        self.transport
            .call::<(), _>(Method::GET, &todo_path(id), None)
            .await
    }

    async fn create_todo(&self, input: &TodoCreateInput) -> Result<Todo, TransportError> {
        self.transport
            .call(Method::POST, "todos", Some(input))
            .await
    }

    async fn update_todo(
        &self,
        id: &TodoId,
        input: &TodoUpdateInput,
    ) -> Result<Todo, TransportError> {
        self.transport
            .call(Method::PATCH, &todo_path(id), Some(input))
            .await
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), TransportError> {
        self.transport
            .call_empty(Method::DELETE, &todo_path(id))
            .await
    }
}

#[cfg(test)]
#[path = "tests/todo_api_tests.rs"]
mod tests;
