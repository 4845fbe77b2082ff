//! slotbook — typed client and booking workflow for an
//! appointment-scheduling REST API.
//!
//! The interesting part is the booking workflow: an explicit state machine
//! ([`booking::BookingWorkflow`]) that pre-checks a versioned local
//! snapshot ([`availability::Snapshot`]), re-validates against the
//! backend's authoritative availability endpoint, submits, and fully
//! reloads local state after every mutation. Status lifecycle rules live
//! in [`policy`]; the repository clients in [`api`] are thin typed façades
//! over the REST surface with a structured error taxonomy ([`error`]).

pub mod api;
pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;

use tracing_subscriber::EnvFilter;

pub use api::{AppointmentApi, AppointmentClient, AuthClient, HttpClient, UserApi, UserClient};
pub use availability::Snapshot;
pub use booking::{BookingState, BookingWorkflow, SubmitOutcome};
pub use config::ApiConfig;
pub use error::ApiError;
pub use models::{Appointment, AppointmentStatus, User};

/// Initialize tracing for binaries and integration tests. Honors
/// `RUST_LOG`, falling back to the crate default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
