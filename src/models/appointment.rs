use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::user::User;

/// Appointment lifecycle status.
///
/// `Scheduled` is the only mutable state. `Cancelled` and `Completed` are
/// terminal — the transition policy in [`crate::policy`] permits no further
/// changes from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Wire form, used both in JSON bodies and in URL path segments
    /// (`/appointments/status/{status}`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(ApiError::InvalidStatus { value: s.into() }),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An appointment as returned by the backend.
///
/// The owning user is denormalized into the record. `id`, `created_at` and
/// `updated_at` are backend-assigned and read-only to this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub user: User,
    /// Scheduled time, minute granularity. Expected to align to an hourly
    /// slot boundary (see [`crate::availability::time_slots`]).
    pub appointment_date_time: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Body for `POST /appointments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub user_id: i64,
    pub appointment_date_time: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body for `PUT /appointments/{id}` — partial update, absent fields are
/// left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

impl UpdateAppointmentRequest {
    /// Does this patch touch fields that are only editable while SCHEDULED?
    pub fn edits_fields(&self) -> bool {
        self.user_id.is_some() || self.appointment_date_time.is_some() || self.notes.is_some()
    }
}
