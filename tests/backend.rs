//! Integration tests against a loopback backend.
//!
//! Stands up a small axum server on an ephemeral port that mirrors the
//! real backend's REST surface and error bodies (JSON `message` field,
//! 409 on double booking, 400 on illegal status actions, bearer-token
//! auth), then drives the production `reqwest` clients and the booking
//! workflow against it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::json;

use slotbook::api::auth::LoginRequest;
use slotbook::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest, User,
    UserPayload,
};
use slotbook::{
    ApiConfig, ApiError, AppointmentApi, AppointmentClient, AuthClient, BookingState,
    BookingWorkflow, HttpClient, SubmitOutcome, UserApi, UserClient,
};

const TOKEN: &str = "test-token";
const WIRE: &str = "%Y-%m-%dT%H:%M:%S";

// ─── Backend fixture ──────────────────────────────────────────────────────

#[derive(Default)]
struct Db {
    users: Vec<User>,
    appointments: Vec<Appointment>,
    next_id: i64,
}

type AppState = Arc<Mutex<Db>>;

fn seeded_state() -> AppState {
    Arc::new(Mutex::new(Db {
        users: vec![
            User {
                id: 1,
                name: "Ana Silva".into(),
                phone_number: "555-0101".into(),
                email: "ana@example.com".into(),
            },
            User {
                id: 2,
                name: "Bruno Costa".into(),
                phone_number: "555-0102".into(),
                email: "bruno@example.com".into(),
            },
        ],
        appointments: Vec::new(),
        next_id: 1,
    }))
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn slot_taken(db: &Db, date_time: NaiveDateTime) -> bool {
    db.appointments
        .iter()
        .any(|a| a.status == AppointmentStatus::Scheduled && a.appointment_date_time == date_time)
}

async fn require_bearer(req: Request, next: Next) -> Response {
    let ok = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false);
    if !ok {
        return error_body(StatusCode::UNAUTHORIZED, "Authentication required");
    }
    next.run(req).await
}

async fn login(Json(body): Json<LoginRequest>) -> Response {
    if body.email == "admin@slotbook.test" && body.password == "admin123" {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        error_body(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn list_appointments(State(state): State<AppState>) -> Json<Vec<Appointment>> {
    Json(state.lock().unwrap().appointments.clone())
}

async fn get_appointment(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let db = state.lock().unwrap();
    match db.appointments.iter().find(|a| a.id == id) {
        Some(a) => Json(a.clone()).into_response(),
        None => error_body(StatusCode::NOT_FOUND, "Appointment not found"),
    }
}

async fn appointments_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<Vec<Appointment>> {
    let db = state.lock().unwrap();
    Json(db.appointments.iter().filter(|a| a.user.id == user_id).cloned().collect())
}

async fn appointments_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Response {
    let status: AppointmentStatus = match status.parse() {
        Ok(s) => s,
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "Invalid status"),
    };
    let db = state.lock().unwrap();
    Json(
        db.appointments
            .iter()
            .filter(|a| a.status == status)
            .cloned()
            .collect::<Vec<_>>(),
    )
    .into_response()
}

async fn appointments_by_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Json<Vec<Appointment>> {
    let db = state.lock().unwrap();
    Json(
        db.appointments
            .iter()
            .filter(|a| a.appointment_date_time.date() == date)
            .cloned()
            .collect(),
    )
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: String,
    end_date: String,
}

async fn appointments_in_range(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let (Ok(start), Ok(end)) = (
        NaiveDateTime::parse_from_str(&range.start_date, WIRE),
        NaiveDateTime::parse_from_str(&range.end_date, WIRE),
    ) else {
        return error_body(StatusCode::BAD_REQUEST, "Invalid date format");
    };
    if start > end {
        return error_body(StatusCode::BAD_REQUEST, "startDate must not be after endDate");
    }
    let db = state.lock().unwrap();
    Json(
        db.appointments
            .iter()
            .filter(|a| a.appointment_date_time >= start && a.appointment_date_time <= end)
            .cloned()
            .collect::<Vec<_>>(),
    )
    .into_response()
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityQuery {
    date_time: String,
}

async fn availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Response {
    let Ok(date_time) = NaiveDateTime::parse_from_str(&query.date_time, WIRE) else {
        return error_body(StatusCode::BAD_REQUEST, "Invalid dateTime format");
    };
    let db = state.lock().unwrap();
    Json(!slot_taken(&db, date_time)).into_response()
}

async fn create_appointment(
    State(state): State<AppState>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Response {
    let mut db = state.lock().unwrap();
    let Some(user) = db.users.iter().find(|u| u.id == body.user_id).cloned() else {
        return error_body(StatusCode::NOT_FOUND, "User not found");
    };
    if slot_taken(&db, body.appointment_date_time) {
        return error_body(
            StatusCode::CONFLICT,
            "Time slot is already booked. Please select another time.",
        );
    }
    let now = Utc::now().naive_utc();
    let id = db.next_id;
    db.next_id += 1;
    let appointment = Appointment {
        id,
        user,
        appointment_date_time: body.appointment_date_time,
        notes: body.notes,
        status: AppointmentStatus::Scheduled,
        created_at: Some(now),
        updated_at: Some(now),
    };
    db.appointments.push(appointment.clone());
    (StatusCode::CREATED, Json(appointment)).into_response()
}

async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> Response {
    let mut db = state.lock().unwrap();
    let Some(index) = db.appointments.iter().position(|a| a.id == id) else {
        return error_body(StatusCode::NOT_FOUND, "Appointment not found");
    };
    if let Some(date_time) = body.appointment_date_time {
        if db.appointments[index].appointment_date_time != date_time && slot_taken(&db, date_time) {
            return error_body(
                StatusCode::CONFLICT,
                "Time slot is already booked. Please select another time.",
            );
        }
        db.appointments[index].appointment_date_time = date_time;
    }
    if let Some(notes) = body.notes {
        db.appointments[index].notes = Some(notes);
    }
    if let Some(status) = body.status {
        db.appointments[index].status = status;
    }
    db.appointments[index].updated_at = Some(Utc::now().naive_utc());
    Json(db.appointments[index].clone()).into_response()
}

async fn cancel_appointment(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    transition(state, id, AppointmentStatus::Cancelled)
}

async fn complete_appointment(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    transition(state, id, AppointmentStatus::Completed)
}

fn transition(state: AppState, id: i64, to: AppointmentStatus) -> Response {
    let mut db = state.lock().unwrap();
    let Some(appointment) = db.appointments.iter_mut().find(|a| a.id == id) else {
        return error_body(StatusCode::NOT_FOUND, "Appointment not found");
    };
    if appointment.status != AppointmentStatus::Scheduled {
        return error_body(
            StatusCode::BAD_REQUEST,
            &format!("Appointment is already {}", appointment.status.as_str().to_lowercase()),
        );
    }
    appointment.status = to;
    appointment.updated_at = Some(Utc::now().naive_utc());
    Json(appointment.clone()).into_response()
}

async fn delete_appointment(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut db = state.lock().unwrap();
    let before = db.appointments.len();
    db.appointments.retain(|a| a.id != id);
    if db.appointments.len() == before {
        return error_body(StatusCode::NOT_FOUND, "Appointment not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.lock().unwrap().users.clone())
}

async fn create_user(State(state): State<AppState>, Json(body): Json<UserPayload>) -> Response {
    let mut db = state.lock().unwrap();
    let id = db.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
    let user = User {
        id,
        name: body.name,
        phone_number: body.phone_number,
        email: body.email,
    };
    db.users.push(user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/availability", get(availability))
        .route("/appointments/range", get(appointments_in_range))
        .route(
            "/appointments/:id",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/appointments/:id/cancel", put(cancel_appointment))
        .route("/appointments/:id/complete", put(complete_appointment))
        .route("/appointments/user/:userId", get(appointments_by_user))
        .route("/appointments/status/:status", get(appointments_by_status))
        .route("/appointments/date/:date", get(appointments_by_date))
        .route("/users", get(list_users).post(create_user))
        .layer(middleware::from_fn(require_bearer));

    Router::new()
        .nest(
            "/api",
            Router::new().route("/auth/login", post(login)).merge(protected),
        )
        .with_state(state)
}

/// Bind an ephemeral loopback port and serve the fixture backend.
async fn spawn_backend() -> String {
    let state = seeded_state();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn logged_in_client(base_url: &str) -> Arc<HttpClient> {
    let http = Arc::new(HttpClient::new(&ApiConfig::new(base_url, 5)).unwrap());
    AuthClient::new(http.clone())
        .login("admin@slotbook.test", "admin123")
        .await
        .unwrap();
    http
}

fn dt(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_by_id_round_trips() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);

    let created = client
        .create(&CreateAppointmentRequest {
            user_id: 1,
            appointment_date_time: dt(2, 10),
            notes: Some("intake".into()),
        })
        .await
        .unwrap();

    assert!(created.id >= 1);
    assert_eq!(created.status, AppointmentStatus::Scheduled);
    assert!(created.created_at.is_some());
    assert!(created.updated_at.is_some());

    let fetched = client.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.user.id, 1);
    assert_eq!(fetched.appointment_date_time, dt(2, 10));
    assert_eq!(fetched.notes.as_deref(), Some("intake"));
}

#[tokio::test]
async fn unauthenticated_requests_map_to_unauthorized() {
    let base = spawn_backend().await;
    let http = Arc::new(HttpClient::new(&ApiConfig::new(&base, 5)).unwrap());
    let client = AppointmentClient::new(http);

    let err = client.get_all().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn bad_credentials_rejected() {
    let base = spawn_backend().await;
    let http = Arc::new(HttpClient::new(&ApiConfig::new(&base, 5)).unwrap());
    let auth = AuthClient::new(http);

    let err = auth.login("admin@slotbook.test", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!auth.is_logged_in());
}

#[tokio::test]
async fn double_booking_surfaces_conflict() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);
    let request = CreateAppointmentRequest {
        user_id: 1,
        appointment_date_time: dt(2, 10),
        notes: None,
    };
    client.create(&request).await.unwrap();

    assert!(!client.check_availability(dt(2, 10)).await.unwrap());
    assert!(client.check_availability(dt(2, 11)).await.unwrap());

    let err = client
        .create(&CreateAppointmentRequest { user_id: 2, ..request })
        .await
        .unwrap_err();
    match err {
        ApiError::Conflict(msg) => assert!(msg.contains("already booked")),
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_frees_slot_and_second_cancel_is_validation() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);
    let created = client
        .create(&CreateAppointmentRequest {
            user_id: 1,
            appointment_date_time: dt(2, 10),
            notes: None,
        })
        .await
        .unwrap();

    let cancelled = client.cancel(created.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(client.check_availability(dt(2, 10)).await.unwrap());

    let err = client.cancel(created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = client.complete(created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn missing_appointment_maps_to_not_found() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);

    let err = client.get_by_id(999).await.unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert!(msg.contains("not found")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn filter_queries_return_matching_subsets() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);

    let first = client
        .create(&CreateAppointmentRequest {
            user_id: 1,
            appointment_date_time: dt(2, 9),
            notes: None,
        })
        .await
        .unwrap();
    client
        .create(&CreateAppointmentRequest {
            user_id: 2,
            appointment_date_time: dt(3, 11),
            notes: None,
        })
        .await
        .unwrap();
    client.complete(first.id).await.unwrap();

    let by_user = client.get_by_user(2).await.unwrap();
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].user.name, "Bruno Costa");

    let completed = client.get_by_status(AppointmentStatus::Completed).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first.id);

    let by_date = client
        .get_by_date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(by_date.len(), 1);

    let in_range = client.get_in_range(dt(2, 0), dt(3, 23)).await.unwrap();
    assert_eq!(in_range.len(), 2);

    let err = client.get_in_range(dt(3, 0), dt(2, 0)).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn workflow_books_against_live_backend() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);

    let mut wf = BookingWorkflow::new(client);
    wf.refresh().await.unwrap();
    wf.select_user(Some(1));
    wf.select_date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    wf.select_slot(chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());

    let outcome = wf.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Booked(_)));
    assert_eq!(wf.state(), BookingState::Succeeded);
    assert!(wf.snapshot().slot_booked(dt(2, 10)));

    // Second workflow instance, same slot: the authoritative check fails
    // the attempt before any create is issued.
    let client2 = AppointmentClient::new(logged_in_client(&base).await);
    let mut second = BookingWorkflow::new(client2);
    second.select_user(Some(2));
    second.select_date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    second.select_slot(chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());

    let err = second.submit().await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(second.state(), BookingState::Failed);
}

#[tokio::test]
async fn update_patches_only_provided_fields() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);
    let created = client
        .create(&CreateAppointmentRequest {
            user_id: 1,
            appointment_date_time: dt(2, 10),
            notes: Some("original".into()),
        })
        .await
        .unwrap();

    let patch = UpdateAppointmentRequest {
        notes: Some("amended".into()),
        ..Default::default()
    };
    let updated = client.update(created.id, &patch).await.unwrap();
    assert_eq!(updated.notes.as_deref(), Some("amended"));
    assert_eq!(updated.appointment_date_time, dt(2, 10));
    assert_eq!(updated.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn delete_removes_appointment() {
    let base = spawn_backend().await;
    let client = AppointmentClient::new(logged_in_client(&base).await);
    let created = client
        .create(&CreateAppointmentRequest {
            user_id: 1,
            appointment_date_time: dt(2, 10),
            notes: None,
        })
        .await
        .unwrap();

    client.delete(created.id).await.unwrap();
    let err = client.get_by_id(created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn user_client_lists_and_creates() {
    let base = spawn_backend().await;
    let client = UserClient::new(logged_in_client(&base).await);

    let users = client.get_all().await.unwrap();
    assert_eq!(users.len(), 2);

    let created = client
        .create(&UserPayload {
            name: "Carla Dias".into(),
            phone_number: "555-0103".into(),
            email: "carla@example.com".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, 3);

    let users = client.get_all().await.unwrap();
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn unreachable_backend_maps_to_connection_error() {
    // Discard port on loopback: nothing listens there.
    let http = Arc::new(HttpClient::new(&ApiConfig::new("http://127.0.0.1:9/api", 2)).unwrap());
    let client = AppointmentClient::new(http);
    let err = client.get_all().await.unwrap_err();
    assert!(err.is_retryable());
}
