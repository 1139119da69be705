//! JSON-over-HTTP calls against the todo API base URL.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct ApiTransport {
    http: Client,
    base_url: Url,
}

impl ApiTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, TransportError> {
        let mut parsed = Url::parse(base_url).map_err(|source| TransportError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        // Without a trailing slash `join` would replace the last path segment.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| TransportError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, TransportError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "api request");
        Ok(self.http.request(method, url))
    }

    /// Sends `body` as JSON (if any) and decodes a JSON response.
    pub async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::expect_json(request).await
    }

    /// Like [`call`](Self::call) for endpoints that answer without a body.
    pub async fn call_empty(&self, method: Method, path: &str) -> Result<(), TransportError> {
        let request = self.request(method, path)?;
        Self::send(request).await?;
        Ok(())
    }

    pub async fn expect_json<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = Self::send(request).await?;
        Ok(response.json().await?)
    }

    async fn send(request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "api request rejected");
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let transport = ApiTransport::new("http://localhost:8080/api").expect("transport");
        assert_eq!(
            transport.endpoint("/todos").expect("url").as_str(),
            "http://localhost:8080/api/todos"
        );
        assert_eq!(
            transport.endpoint("todos/abc").expect("url").as_str(),
            "http://localhost:8080/api/todos/abc"
        );
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(matches!(
            ApiTransport::new("not a url"),
            Err(TransportError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn status_errors_render_like_api_failures() {
        let err = TransportError::Status {
            status: 404,
            body: "todo missing".into(),
        };
        assert_eq!(err.to_string(), "API 404: todo missing");
        assert_eq!(err.status(), Some(404));
    }
}
