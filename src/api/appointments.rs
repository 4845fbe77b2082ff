//! Appointment repository client — typed façade over the remote
//! appointment API, one operation per access pattern.
//!
//! The operations are defined on the [`AppointmentApi`] trait so the
//! booking workflow can run against [`MockAppointmentApi`] in tests.
//! `AppointmentClient` is the production `reqwest` implementation; it
//! retains no state between calls and every mutation is a single remote
//! request.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::api::http::HttpClient;
use crate::error::ApiError;
use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};

/// Remote appointment operations.
#[allow(async_fn_in_trait)]
pub trait AppointmentApi {
    async fn get_all(&self) -> Result<Vec<Appointment>, ApiError>;
    async fn get_by_id(&self, id: i64) -> Result<Appointment, ApiError>;
    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Appointment>, ApiError>;
    async fn get_by_status(&self, status: AppointmentStatus)
        -> Result<Vec<Appointment>, ApiError>;
    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, ApiError>;
    /// `start <= end` is not validated locally; a violated range surfaces
    /// as a backend error.
    async fn get_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, ApiError>;
    /// Authoritative availability check. Overrides any local pre-check.
    async fn check_availability(&self, date_time: NaiveDateTime) -> Result<bool, ApiError>;
    async fn create(&self, request: &CreateAppointmentRequest) -> Result<Appointment, ApiError>;
    async fn update(
        &self,
        id: i64,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ApiError>;
    async fn cancel(&self, id: i64) -> Result<Appointment, ApiError>;
    async fn complete(&self, id: i64) -> Result<Appointment, ApiError>;
    /// Hard delete, allowed regardless of status (administrative override).
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

const DATE_TIME_WIRE: &str = "%Y-%m-%dT%H:%M:%S";

pub struct AppointmentClient {
    http: Arc<HttpClient>,
}

impl AppointmentClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl AppointmentApi for AppointmentClient {
    async fn get_all(&self) -> Result<Vec<Appointment>, ApiError> {
        self.http.get_json("/appointments", &[]).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Appointment, ApiError> {
        self.http.get_json(&format!("/appointments/{id}"), &[]).await
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Appointment>, ApiError> {
        self.http
            .get_json(&format!("/appointments/user/{user_id}"), &[])
            .await
    }

    async fn get_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, ApiError> {
        self.http
            .get_json(&format!("/appointments/status/{}", status.as_str()), &[])
            .await
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, ApiError> {
        self.http
            .get_json(&format!("/appointments/date/{date}"), &[])
            .await
    }

    async fn get_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, ApiError> {
        let query = [
            ("startDate", start.format(DATE_TIME_WIRE).to_string()),
            ("endDate", end.format(DATE_TIME_WIRE).to_string()),
        ];
        self.http.get_json("/appointments/range", &query).await
    }

    async fn check_availability(&self, date_time: NaiveDateTime) -> Result<bool, ApiError> {
        let query = [("dateTime", date_time.format(DATE_TIME_WIRE).to_string())];
        self.http.get_json("/appointments/availability", &query).await
    }

    async fn create(&self, request: &CreateAppointmentRequest) -> Result<Appointment, ApiError> {
        tracing::info!(
            user_id = request.user_id,
            date_time = %request.appointment_date_time,
            "Creating appointment"
        );
        self.http.post_json("/appointments", request).await
    }

    async fn update(
        &self,
        id: i64,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        self.http.put_json(&format!("/appointments/{id}"), request).await
    }

    async fn cancel(&self, id: i64) -> Result<Appointment, ApiError> {
        tracing::info!(id, "Cancelling appointment");
        self.http.put_action(&format!("/appointments/{id}/cancel")).await
    }

    async fn complete(&self, id: i64) -> Result<Appointment, ApiError> {
        tracing::info!(id, "Completing appointment");
        self.http.put_action(&format!("/appointments/{id}/complete")).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        tracing::warn!(id, "Deleting appointment");
        self.http.delete(&format!("/appointments/{id}")).await
    }
}

// ─── Mock implementation ──────────────────────────────────────────────────

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::models::User;

/// In-memory appointment backend for tests.
///
/// Enforces the same slot-uniqueness rule as the real backend: `create`
/// rejects a second SCHEDULED appointment at the same minute with
/// [`ApiError::Conflict`]. Clones share state, so two workflow instances
/// can race against one mock.
#[derive(Clone)]
pub struct MockAppointmentApi {
    inner: Arc<MockInner>,
}

struct MockInner {
    appointments: Mutex<Vec<Appointment>>,
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
    remote_calls: AtomicU32,
    /// When set, `check_availability` reports every slot free regardless of
    /// stored appointments — used to reproduce the check-then-create race.
    force_available: AtomicBool,
}

impl MockAppointmentApi {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                appointments: Mutex::new(Vec::new()),
                users: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
                remote_calls: AtomicU32::new(0),
                force_available: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_user(self, user: User) -> Self {
        self.inner.users.lock().unwrap().push(user);
        self
    }

    pub fn with_appointment(self, appointment: Appointment) -> Self {
        self.inner.appointments.lock().unwrap().push(appointment);
        self
    }

    /// Make the authoritative availability check lie so the TOCTOU window
    /// between check and create can be exercised deterministically.
    pub fn force_available(&self, forced: bool) {
        self.inner.force_available.store(forced, Ordering::SeqCst);
    }

    /// How many remote operations have been issued against this mock.
    pub fn remote_calls(&self) -> u32 {
        self.inner.remote_calls.load(Ordering::SeqCst)
    }

    fn count_call(&self) {
        self.inner.remote_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn slot_taken(&self, date_time: NaiveDateTime) -> bool {
        self.inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.status == AppointmentStatus::Scheduled && a.appointment_date_time == date_time)
    }

    fn transition(
        &self,
        id: i64,
        to: AppointmentStatus,
    ) -> Result<Appointment, ApiError> {
        let mut appointments = self.inner.appointments.lock().unwrap();
        let appt = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Appointment {id}")))?;
        if appt.status != AppointmentStatus::Scheduled {
            return Err(ApiError::Validation(format!(
                "Appointment is already {}",
                appt.status
            )));
        }
        appt.status = to;
        Ok(appt.clone())
    }
}

impl Default for MockAppointmentApi {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentApi for MockAppointmentApi {
    async fn get_all(&self) -> Result<Vec<Appointment>, ApiError> {
        self.count_call();
        Ok(self.inner.appointments.lock().unwrap().clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Appointment, ApiError> {
        self.count_call();
        self.inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Appointment {id}")))
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Appointment>, ApiError> {
        self.count_call();
        Ok(self
            .inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user.id == user_id)
            .cloned()
            .collect())
    }

    async fn get_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, ApiError> {
        self.count_call();
        Ok(self
            .inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, ApiError> {
        self.count_call();
        Ok(self
            .inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.appointment_date_time.date() == date)
            .cloned()
            .collect())
    }

    async fn get_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, ApiError> {
        self.count_call();
        if start > end {
            return Err(ApiError::Validation("startDate must not be after endDate".into()));
        }
        Ok(self
            .inner
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.appointment_date_time >= start && a.appointment_date_time <= end)
            .cloned()
            .collect())
    }

    async fn check_availability(&self, date_time: NaiveDateTime) -> Result<bool, ApiError> {
        self.count_call();
        if self.inner.force_available.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(!self.slot_taken(date_time))
    }

    async fn create(&self, request: &CreateAppointmentRequest) -> Result<Appointment, ApiError> {
        self.count_call();
        let user = self
            .inner
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == request.user_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("User {}", request.user_id)))?;

        // Slot uniqueness is enforced here even when force_available made
        // the check lie — that is the race under test.
        if self.slot_taken(request.appointment_date_time) {
            return Err(ApiError::Conflict(
                "Time slot is already booked. Please select another time.".into(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let appointment = Appointment {
            id: self.inner.next_id.fetch_add(1, Ordering::SeqCst),
            user,
            appointment_date_time: request.appointment_date_time,
            notes: request.notes.clone(),
            status: AppointmentStatus::Scheduled,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.inner.appointments.lock().unwrap().push(appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &self,
        id: i64,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        self.count_call();
        let mut appointments = self.inner.appointments.lock().unwrap();
        let appt = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Appointment {id}")))?;
        if let Some(date_time) = request.appointment_date_time {
            appt.appointment_date_time = date_time;
        }
        if let Some(notes) = &request.notes {
            appt.notes = Some(notes.clone());
        }
        if let Some(status) = request.status {
            appt.status = status;
        }
        appt.updated_at = Some(chrono::Utc::now().naive_utc());
        Ok(appt.clone())
    }

    async fn cancel(&self, id: i64) -> Result<Appointment, ApiError> {
        self.count_call();
        self.transition(id, AppointmentStatus::Cancelled)
    }

    async fn complete(&self, id: i64) -> Result<Appointment, ApiError> {
        self.count_call();
        self.transition(id, AppointmentStatus::Completed)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.count_call();
        let mut appointments = self.inner.appointments.lock().unwrap();
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Err(ApiError::NotFound(format!("Appointment {id}")));
        }
        Ok(())
    }
}
