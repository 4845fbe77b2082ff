//! Token-based login against `POST /auth/login`.
//!
//! On success the token is stored on the shared [`HttpClient`], which
//! attaches it as a bearer credential to every subsequent request.
//! Authorization *enforcement* stays on the backend; this module is only
//! the credential plumbing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::http::HttpClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

pub struct AuthClient {
    http: Arc<HttpClient>,
}

impl AuthClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Exchange credentials for a token and attach it to the shared client.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let request = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let response: LoginResponse = self.http.post_json("/auth/login", &request).await?;
        self.http.set_token(Some(response.token.clone()));
        tracing::info!(email, "Logged in");
        Ok(response.token)
    }

    /// Drop the stored credential. Subsequent requests go out unauthenticated.
    pub fn logout(&self) {
        self.http.set_token(None);
        tracing::info!("Logged out");
    }

    pub fn is_logged_in(&self) -> bool {
        self.http.has_token()
    }
}
