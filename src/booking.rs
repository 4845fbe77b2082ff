//! Booking workflow controller.
//!
//! One state machine per booking attempt: Idle → Validating → Submitting →
//! Succeeded/Failed. The controller owns the input form, the versioned
//! appointment snapshot, and the repository client; it is independent of
//! any rendering mechanism and is driven by discrete commands (`submit`,
//! `retry`, `acknowledge`).
//!
//! Ordering guarantee: within one attempt the authoritative availability
//! check strictly precedes the create call. That narrows but does not
//! eliminate the booking race — a create can still be rejected with a
//! conflict after the check passed, and the controller surfaces that as a
//! Conflict failure rather than treating it as success.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::api::appointments::AppointmentApi;
use crate::availability::{first_slot, Snapshot};
use crate::error::ApiError;
use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::policy::{self, PermittedActions};

const SLOT_TAKEN: &str = "This time slot is already booked. Please select another time.";

/// Where the current booking attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl BookingState {
    fn in_flight(self) -> bool {
        matches!(self, Self::Validating | Self::Submitting)
    }
}

/// The booking input form. Defaults: today, first slot, no user, no notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingForm {
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub slot: NaiveTime,
    pub notes: String,
}

impl BookingForm {
    fn new() -> Self {
        Self {
            user_id: None,
            date: Local::now().date_naive(),
            slot: first_slot(),
            notes: String::new(),
        }
    }

    pub fn date_time(&self) -> NaiveDateTime {
        self.date.and_time(self.slot)
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Result of a `submit` command.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A previous attempt is still in flight; this submit was a no-op.
    Ignored,
    Booked(Appointment),
}

pub struct BookingWorkflow<A: AppointmentApi> {
    api: A,
    state: BookingState,
    form: BookingForm,
    snapshot: Snapshot,
    /// Rendered message of the last failure. Persists through
    /// `acknowledge` and is cleared by the next submit attempt.
    last_error: Option<String>,
}

impl<A: AppointmentApi> BookingWorkflow<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: BookingState::Idle,
            form: BookingForm::new(),
            snapshot: Snapshot::new(),
            last_error: None,
        }
    }

    /// Start from a pre-fetched appointment set (fixtures in tests).
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Form commands ───────────────────────────────────────

    pub fn select_user(&mut self, user_id: Option<i64>) {
        self.form.user_id = user_id;
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.form.date = date;
    }

    pub fn select_slot(&mut self, slot: NaiveTime) {
        self.form.slot = slot;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.form.notes = notes.to_string();
    }

    /// Abandon the current input (the cancel-edit command).
    pub fn reset_form(&mut self) {
        self.form.reset();
    }

    /// Which controls to expose for a listed appointment, per the
    /// transition policy. `None` when the id is not in the snapshot.
    pub fn actions_for(&self, id: i64) -> Option<PermittedActions> {
        self.snapshot.find(id).map(|a| policy::permitted_actions(a.status))
    }

    // ── Snapshot ────────────────────────────────────────────

    /// Full-replace reload of the appointment snapshot. Late responses to
    /// superseded reloads are discarded via the generation token.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let token = self.snapshot.begin_reload();
        let appointments = self.api.get_all().await?;
        self.snapshot.apply(token, appointments);
        Ok(())
    }

    /// Reload after a successful mutation. The mutation already succeeded,
    /// so a failed reload only leaves the advisory snapshot stale.
    async fn refresh_after_mutation(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Snapshot reload after mutation failed");
        }
    }

    // ── Booking attempt ─────────────────────────────────────

    /// Run one booking attempt: validate the form, pre-check the local
    /// snapshot, re-validate against the backend, then create.
    ///
    /// A submit while a previous attempt is in flight is an explicit no-op.
    /// A missing user selection is rejected synchronously with zero remote
    /// calls and no state transition. On success the form resets to its
    /// defaults and the snapshot is fully reloaded; on failure the form is
    /// left as-is so the user may retry.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ApiError> {
        if self.state.in_flight() {
            tracing::debug!("Submit ignored: attempt already in flight");
            return Ok(SubmitOutcome::Ignored);
        }

        // A new attempt supersedes the previous outcome.
        self.state = BookingState::Idle;
        self.last_error = None;

        let Some(user_id) = self.form.user_id else {
            let err = ApiError::Validation("Please select a user".into());
            self.last_error = Some(err.to_string());
            return Err(err);
        };
        let date_time = self.form.date_time();

        // Advisory pre-check on the local snapshot: skip the round trip
        // when the slot is already visibly taken.
        if self.snapshot.slot_booked(date_time) {
            return Err(self.fail(ApiError::Conflict(SLOT_TAKEN.into())));
        }

        self.state = BookingState::Validating;
        let available = match self.api.check_availability(date_time).await {
            Ok(available) => available,
            Err(e) => return Err(self.fail(e)),
        };
        if !available {
            return Err(self.fail(ApiError::Conflict(SLOT_TAKEN.into())));
        }

        self.state = BookingState::Submitting;
        let notes = self.form.notes.trim();
        let request = CreateAppointmentRequest {
            user_id,
            appointment_date_time: date_time,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        };
        match self.api.create(&request).await {
            Ok(appointment) => {
                tracing::info!(id = appointment.id, "Appointment booked");
                self.form.reset();
                self.refresh_after_mutation().await;
                self.state = BookingState::Succeeded;
                Ok(SubmitOutcome::Booked(appointment))
            }
            // Includes the conflict the availability check did not catch.
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Resubmit the preserved form after a failure.
    pub async fn retry(&mut self) -> Result<SubmitOutcome, ApiError> {
        self.submit().await
    }

    /// Dismiss a Succeeded/Failed outcome and return to Idle. The caller
    /// owns the success display window; failure messages stay readable via
    /// [`Self::last_error`] until the next submit.
    pub fn acknowledge(&mut self) {
        if matches!(self.state, BookingState::Succeeded | BookingState::Failed) {
            self.state = BookingState::Idle;
        }
    }

    // ── Guarded mutations ───────────────────────────────────

    /// Cancel a scheduled appointment. Rejected by the transition policy
    /// before any request when the snapshot already shows it terminal.
    pub async fn cancel(&mut self, id: i64) -> Result<Appointment, ApiError> {
        self.guard_transition(id, AppointmentStatus::Cancelled)?;
        let appointment = self.api.cancel(id).await?;
        self.refresh_after_mutation().await;
        Ok(appointment)
    }

    /// Mark a scheduled appointment completed. Same policy guard as cancel.
    pub async fn complete(&mut self, id: i64) -> Result<Appointment, ApiError> {
        self.guard_transition(id, AppointmentStatus::Completed)?;
        let appointment = self.api.complete(id).await?;
        self.refresh_after_mutation().await;
        Ok(appointment)
    }

    /// Apply a partial update. Field edits require an editable (SCHEDULED)
    /// status; a status change must be a legal transition.
    pub async fn update_appointment(
        &mut self,
        id: i64,
        patch: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        if let Some(current) = self.snapshot.find(id) {
            if patch.edits_fields() && !policy::can_edit(current.status) {
                return Err(ApiError::Validation(format!(
                    "Appointment is {} and can no longer be edited",
                    current.status
                )));
            }
            if let Some(to) = patch.status {
                policy::check_transition(current.status, to)?;
            }
        }
        let appointment = self.api.update(id, patch).await?;
        self.refresh_after_mutation().await;
        Ok(appointment)
    }

    /// Hard delete — administrative override, no policy guard.
    pub async fn delete(&mut self, id: i64) -> Result<(), ApiError> {
        self.api.delete(id).await?;
        self.refresh_after_mutation().await;
        Ok(())
    }

    fn guard_transition(&self, id: i64, to: AppointmentStatus) -> Result<(), ApiError> {
        // Unknown ids pass through; the backend is the authority.
        if let Some(current) = self.snapshot.find(id) {
            policy::check_transition(current.status, to)?;
        }
        Ok(())
    }

    fn fail(&mut self, err: ApiError) -> ApiError {
        tracing::warn!(error = %err, "Booking attempt failed");
        self.last_error = Some(err.to_string());
        self.state = BookingState::Failed;
        err
    }
}
