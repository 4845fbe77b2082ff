//! Shared HTTP plumbing for the repository clients.
//!
//! One `HttpClient` per backend: owns the base URL, the request timeout,
//! and the bearer token attached to every outgoing request. All transport
//! and status failures are classified into [`ApiError`] kinds here so the
//! repository clients and the workflow never see raw `reqwest` errors.

use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::ApiError;

pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            timeout_secs: config.timeout_secs,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the credential attached as `Authorization: Bearer <token>` to
    /// every subsequent request. `None` clears it (logout).
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().ok().and_then(|t| t.clone()) {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let req = self.authorize(self.client.get(self.url(path)).query(query));
        self.execute(req).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.authorize(self.client.post(self.url(path)).json(body));
        self.execute(req).await
    }

    pub(crate) async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.authorize(self.client.put(self.url(path)).json(body));
        self.execute(req).await
    }

    /// PUT with no body — the cancel/complete action endpoints.
    pub(crate) async fn put_action<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.authorize(self.client.put(self.url(path)));
        self.execute(req).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let req = self.authorize(self.client.delete(self.url(path)));
        let response = req.send().await.map_err(|e| self.classify_transport(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = req.send().await.map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn classify_transport(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ApiError::Timeout { seconds: self.timeout_secs }
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Map a non-success status to an error kind, pulling the backend's
/// `message` field out of the JSON body when present.
fn classify_status(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = extract_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    match status.as_u16() {
        400 => ApiError::Validation(message),
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound(message),
        409 => ApiError::Conflict(message),
        code => ApiError::Backend { status: code, message },
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .or_else(|| (!body.is_empty()).then(|| body.to_string()))
}
