//! User repository client — list/create/update/delete over the remote
//! user API. Same shape as the appointment client, no status concept.
//!
//! Required fields are validated locally before any request goes out,
//! mirroring the backend's own DTO validation; an empty name or a
//! malformed email is rejected as [`ApiError::Validation`] without a
//! round trip.

use std::sync::Arc;

use crate::api::http::HttpClient;
use crate::error::ApiError;
use crate::models::{User, UserPayload};

#[allow(async_fn_in_trait)]
pub trait UserApi {
    async fn get_all(&self) -> Result<Vec<User>, ApiError>;
    async fn create(&self, payload: &UserPayload) -> Result<User, ApiError>;
    async fn update(&self, id: i64, payload: &UserPayload) -> Result<User, ApiError>;
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

/// Local pre-check for user payloads. The backend validates again.
pub fn validate_payload(payload: &UserPayload) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if payload.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("Phone number is required".into()));
    }
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation(format!("Invalid email: {email}")));
    }
    Ok(())
}

pub struct UserClient {
    http: Arc<HttpClient>,
}

impl UserClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl UserApi for UserClient {
    async fn get_all(&self) -> Result<Vec<User>, ApiError> {
        self.http.get_json("/users", &[]).await
    }

    async fn create(&self, payload: &UserPayload) -> Result<User, ApiError> {
        validate_payload(payload)?;
        tracing::info!(name = %payload.name, "Creating user");
        self.http.post_json("/users", payload).await
    }

    async fn update(&self, id: i64, payload: &UserPayload) -> Result<User, ApiError> {
        validate_payload(payload)?;
        self.http.put_json(&format!("/users/{id}"), payload).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        tracing::warn!(id, "Deleting user");
        self.http.delete(&format!("/users/{id}")).await
    }
}
