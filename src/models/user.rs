use serde::{Deserialize, Serialize};

/// A user as returned by the backend. Identity is backend-assigned and
/// immutable once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    pub email: String,
}

/// Body for `POST /users` and `PUT /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: String,
    pub phone_number: String,
    pub email: String,
}
