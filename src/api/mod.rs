pub mod appointments;
pub mod auth;
pub mod http;
pub mod users;

pub use appointments::{AppointmentApi, AppointmentClient, MockAppointmentApi};
pub use auth::{AuthClient, LoginRequest, LoginResponse};
pub use http::HttpClient;
pub use users::{UserApi, UserClient};
