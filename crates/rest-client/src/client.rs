//! Thin reqwest wrapper with typed errors.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;

use crate::error::RestError;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Generic REST client bound to one base URL.
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_default_timeout(base_url: &str) -> Result<Self, RestError> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path[?query]` and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        let response = self.send(Method::GET, path, query, headers, None).await?;
        self.read_json(path, response).await
    }

    /// POST a JSON body to `path` and deserialize the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        let response = self
            .send(Method::POST, path, None, headers, Some(body))
            .await?;
        self.read_json(path, response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response, RestError> {
        let url = self.build_url(path, query);
        tracing::debug!(method = %method, url = %url, "request");

        let mut request = self.client.request(method, &url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        if let Some(b) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(b.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::from_reqwest(path, e))?;
        self.check_status(path, response).await
    }

    async fn check_status(&self, endpoint: &str, response: Response) -> Result<Response, RestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            return Err(RestError::RateLimited {
                endpoint: endpoint.to_string(),
            });
        }
        if status.is_server_error() {
            return Err(RestError::ServerFault {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                message,
            });
        }
        Err(RestError::BadRequest {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: Response,
    ) -> Result<T, RestError> {
        let body = response
            .text()
            .await
            .map_err(|e| RestError::from_reqwest(endpoint, e))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "unparseable response body");
            RestError::Parse {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })
    }

    fn build_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_building() {
        let client = RestClient::with_default_timeout("https://clob.example.com/").unwrap();
        assert_eq!(
            client.build_url("/time", None),
            "https://clob.example.com/time"
        );
        assert_eq!(
            client.build_url("/book", Some("token_id=123")),
            "https://clob.example.com/book?token_id=123"
        );
        assert_eq!(client.build_url("/price", Some("")), "https://clob.example.com/price");
    }
}
