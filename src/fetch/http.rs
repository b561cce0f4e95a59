//! JSON-over-HTTP fetch operations for the AutoApplyPro API
//!
//! Turns HTTP responses into [`FetchError`]s carrying the right retry
//! classification, so they can be handed straight to the cached fetcher.

use futures::future::BoxFuture;
use reqwest::{Client, Response};
use serde_json::Value;

use super::FetchError;

/// Client that GETs JSON documents, optionally with a bearer token
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: Client,
    bearer_token: Option<String>,
}

impl Default for HttpJsonSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpJsonSource {
    /// Create a source with a default HTTP client
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a source around a preconfigured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Fetch and parse the JSON document at `url`
    ///
    /// # Returns
    /// * `Ok(Value)` - The parsed response body
    /// * `Err(FetchError)` - Permanent for 401/404, transient for other
    ///   statuses, network failures and unparseable bodies
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let response = check_status(response).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            FetchError::transient(format!("Invalid JSON from {}", url)).with_source(e)
        })
    }

    /// Returns a fetch operation that GETs `url` each time it is called
    pub fn operation<'a>(
        &'a self,
        url: &'a str,
    ) -> impl FnMut() -> BoxFuture<'a, Result<Value, FetchError>> + 'a {
        move || -> BoxFuture<'a, Result<Value, FetchError>> { Box::pin(self.get_json(url)) }
    }
}

/// Converts a non-success response into a classified error
async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let mut message = format!("GET {} returned {}", url, status);
    if !body.is_empty() {
        message.push_str(": ");
        message.push_str(body.trim());
    }
    Err(FetchError::from_status(status.as_u16(), message))
}
