pub mod appointment;
pub mod user;

pub use appointment::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
pub use user::{User, UserPayload};
