//! Local availability evaluator.
//!
//! Advisory pre-check over an explicitly owned, versioned snapshot of the
//! last fetched appointment set. A slot is booked iff some appointment
//! matches the candidate on calendar day, hour and minute AND is still
//! SCHEDULED — cancelled and completed appointments never block reuse.
//! Matching is exact component equality on typed timestamps, not interval
//! overlap: the system assumes fixed hourly slot boundaries (09:00–17:00).
//!
//! The snapshot can be stale; the authoritative decision is always the
//! backend availability endpoint, re-checked immediately before create.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::{Appointment, AppointmentStatus};

/// First bookable slot of the day, the form's default selection.
pub fn first_slot() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

/// The nine hourly slot start times, 09:00 through 17:00.
pub fn time_slots() -> Vec<NaiveTime> {
    (9..=17)
        .map(|hour| NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
        .collect()
}

/// Versioned, full-replace snapshot of the appointment collection.
///
/// Reloads are tagged with a generation token so a response arriving after
/// a newer reload was issued is discarded instead of resurrecting stale
/// state. The snapshot is never patched in place.
#[derive(Debug, Default)]
pub struct Snapshot {
    appointments: Vec<Appointment>,
    /// Token of the most recently issued reload.
    issued: u64,
    /// Token of the reload currently applied.
    applied: u64,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixture constructor for tests and for seeding from a prior fetch.
    pub fn from_appointments(appointments: Vec<Appointment>) -> Self {
        Self { appointments, issued: 1, applied: 1 }
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn generation(&self) -> u64 {
        self.applied
    }

    /// Hand out a token for a reload about to start.
    pub fn begin_reload(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Apply a completed reload. Returns `false` (and discards the data)
    /// when a newer reload has been issued since `token` was handed out.
    pub fn apply(&mut self, token: u64, appointments: Vec<Appointment>) -> bool {
        if token < self.issued || token <= self.applied {
            tracing::debug!(token, issued = self.issued, "Discarding superseded snapshot reload");
            return false;
        }
        self.appointments = appointments;
        self.applied = token;
        true
    }

    /// Is the candidate slot booked according to this snapshot?
    pub fn slot_booked(&self, candidate: NaiveDateTime) -> bool {
        self.appointments.iter().any(|a| {
            a.status == AppointmentStatus::Scheduled
                && a.appointment_date_time.date() == candidate.date()
                && a.appointment_date_time.hour() == candidate.hour()
                && a.appointment_date_time.minute() == candidate.minute()
        })
    }

    /// Slot start times booked on the given day — the calendar view's
    /// disabled buttons.
    pub fn booked_slots(&self, date: NaiveDate) -> Vec<NaiveTime> {
        time_slots()
            .into_iter()
            .filter(|slot| self.slot_booked(date.and_time(*slot)))
            .collect()
    }

    pub fn find(&self, id: i64) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }
}
