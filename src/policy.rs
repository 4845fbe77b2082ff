//! Status transition policy.
//!
//! Pure functions over [`AppointmentStatus`]: which transitions are legal
//! and which edits are still permitted. Transitions are one-directional
//! from SCHEDULED; CANCELLED and COMPLETED are terminal and permit no
//! transitions and no edits, only display. The workflow consults this
//! policy before issuing any mutation so illegal operations never reach
//! the wire.

use serde::Serialize;

use crate::error::ApiError;
use crate::models::AppointmentStatus;

/// Legal next statuses from the given status.
pub fn legal_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Scheduled => {
            &[AppointmentStatus::Cancelled, AppointmentStatus::Completed]
        }
        AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
    }
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    legal_transitions(status).is_empty()
}

/// Notes and date-time are editable only while SCHEDULED.
pub fn can_edit(status: AppointmentStatus) -> bool {
    status == AppointmentStatus::Scheduled
}

/// Which controls the presentation layer may expose for an appointment in
/// the given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermittedActions {
    pub can_cancel: bool,
    pub can_complete: bool,
    pub can_edit: bool,
}

pub fn permitted_actions(status: AppointmentStatus) -> PermittedActions {
    let transitions = legal_transitions(status);
    PermittedActions {
        can_cancel: transitions.contains(&AppointmentStatus::Cancelled),
        can_complete: transitions.contains(&AppointmentStatus::Completed),
        can_edit: can_edit(status),
    }
}

/// Reject an illegal transition before any request is sent.
pub fn check_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), ApiError> {
    if legal_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "No transition from {from} to {to}"
        )))
    }
}
