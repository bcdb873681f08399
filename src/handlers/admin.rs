use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AppointmentStatus, WeeklySchedule};
use crate::services::availability;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {s}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| AppError::Validation(format!("invalid time: {s}")))
}

fn parse_status(s: &str) -> Result<AppointmentStatus, AppError> {
    AppointmentStatus::parse(s).ok_or_else(|| AppError::Validation(format!("invalid status: {s}")))
}

// ── Appointments ──

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub date: String,
    pub worker_id: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    id: i64,
    customer_phone: String,
    customer_name: Option<String>,
    worker_id: i64,
    worker_name: String,
    date: String,
    time: String,
    duration_minutes: u32,
    status: String,
    service_type: Option<String>,
    notes: Option<String>,
}

pub async fn get_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&query.date)?;
    if let Some(status) = query.status.as_deref() {
        parse_status(status)?;
    }

    let listings = {
        let db = state.db.lock().unwrap();
        queries::list_appointments_for_day(
            &db,
            date,
            query.worker_id,
            query.status.as_deref(),
            query.search.as_deref(),
        )?
    };

    let response = listings
        .into_iter()
        .map(|l| AppointmentResponse {
            id: l.appointment.id,
            customer_phone: l.customer_phone,
            customer_name: l.customer_name,
            worker_id: l.appointment.worker_id,
            worker_name: l.worker_name,
            date: l.appointment.date.format("%Y-%m-%d").to_string(),
            time: l.appointment.time.format("%H:%M").to_string(),
            duration_minutes: l.appointment.duration_minutes,
            status: l.appointment.status.as_str().to_string(),
            service_type: l.appointment.service_type,
            notes: l.appointment.notes,
        })
        .collect();

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub phone_number: String,
    pub customer_name: Option<String>,
    pub worker_id: i64,
    pub date: String,
    pub time: String,
    pub duration_minutes: Option<u32>,
    pub status: Option<String>,
    pub service_type: Option<String>,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&req.date)?;
    let time = parse_time(&req.time)?;
    let status = req.status.as_deref().map(parse_status).transpose()?;

    let phone = req.phone_number.trim();
    if phone.is_empty() {
        return Err(AppError::Validation("phone_number is required".to_string()));
    }
    if req.duration_minutes == Some(0) {
        return Err(AppError::Validation(
            "duration_minutes must be greater than zero".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();

    if queries::get_worker(&db, req.worker_id)?.is_none() {
        return Err(AppError::NotFound(format!("worker {}", req.worker_id)));
    }

    let customer = queries::get_or_create_customer(&db, phone, req.customer_name.as_deref())?;
    let duration = req
        .duration_minutes
        .unwrap_or_else(|| queries::slot_duration_minutes(&db));

    let outcome = queries::insert_appointment(
        &db,
        customer.id,
        req.worker_id,
        date,
        time,
        duration,
        status.unwrap_or(AppointmentStatus::Pending),
        req.service_type.as_deref(),
        req.notes.as_deref(),
    )?;

    match outcome {
        queries::InsertOutcome::Inserted(id) => Ok(Json(serde_json::json!({ "id": id }))),
        queries::InsertOutcome::SlotTaken => Err(AppError::Conflict(format!(
            "slot {} {} already booked for worker {}",
            req.date, req.time, req.worker_id
        ))),
    }
}

#[derive(Deserialize)]
pub struct UpdateAppointmentRequest {
    pub worker_id: i64,
    pub date: String,
    pub time: String,
    pub duration_minutes: u32,
    pub status: String,
    pub service_type: Option<String>,
    pub notes: Option<String>,
}

pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&req.date)?;
    let time = parse_time(&req.time)?;
    let status = parse_status(&req.status)?;
    if req.duration_minutes == 0 {
        return Err(AppError::Validation(
            "duration_minutes must be greater than zero".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();

    if queries::get_appointment(&db, id)?.is_none() {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }
    if queries::get_worker(&db, req.worker_id)?.is_none() {
        return Err(AppError::NotFound(format!("worker {}", req.worker_id)));
    }

    // The conflict probe excludes the row being edited so an appointment can
    // keep its own slot.
    if status != AppointmentStatus::Cancelled
        && queries::has_slot_conflict(&db, req.worker_id, date, time, Some(id))?
    {
        return Err(AppError::Conflict(format!(
            "slot {} {} already booked for worker {}",
            req.date, req.time, req.worker_id
        )));
    }

    queries::update_appointment(
        &db,
        id,
        req.worker_id,
        date,
        time,
        req.duration_minutes,
        status,
        req.service_type.as_deref(),
        req.notes.as_deref(),
    )?;

    Ok(Json(serde_json::json!({ "updated": true })))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Inline status edit. Any of the four known statuses is accepted; transition
/// legality is not checked, the admin surface is trusted.
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = parse_status(&req.status)?;

    let db = state.db.lock().unwrap();
    if !queries::update_appointment_status(&db, id, status)? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}

#[derive(Deserialize)]
pub struct NotesUpdateRequest {
    pub notes: Option<String>,
}

/// Inline notes edit; `null` clears the field.
pub async fn update_appointment_notes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<NotesUpdateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    if !queries::update_appointment_notes(&db, id, req.notes.as_deref())? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    if !queries::delete_appointment(&db, id)? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ── Workers ──

#[derive(Serialize)]
pub struct WorkerResponse {
    id: i64,
    name: String,
    specialty: Option<String>,
    is_active: bool,
    schedules: Vec<ScheduleResponse>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    day_of_week: u32,
    start_time: String,
    end_time: String,
    is_working: bool,
}

impl From<WeeklySchedule> for ScheduleResponse {
    fn from(s: WeeklySchedule) -> Self {
        Self {
            day_of_week: s.day_of_week,
            start_time: s.start_time.format("%H:%M").to_string(),
            end_time: s.end_time.format("%H:%M").to_string(),
            is_working: s.is_working,
        }
    }
}

pub async fn get_workers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkerResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let workers = queries::list_workers(&db, false)?;

    let mut response = vec![];
    for worker in workers {
        let schedules = queries::get_schedules(&db, worker.id)?;
        response.push(WorkerResponse {
            id: worker.id,
            name: worker.name,
            specialty: worker.specialty,
            is_active: worker.is_active,
            schedules: schedules.into_iter().map(Into::into).collect(),
        });
    }

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub day_of_week: u32,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_working: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CreateWorkerRequest {
    pub name: String,
    pub specialty: Option<String>,
    #[serde(default)]
    pub schedules: Vec<ScheduleRequest>,
}

fn validate_schedules(schedules: &[ScheduleRequest]) -> Result<(), AppError> {
    for schedule in schedules {
        if schedule.day_of_week > 6 {
            return Err(AppError::Validation(format!(
                "invalid day_of_week: {}",
                schedule.day_of_week
            )));
        }
        let start = parse_time(&schedule.start_time)?;
        let end = parse_time(&schedule.end_time)?;
        if schedule.is_working && start >= end {
            return Err(AppError::Validation(format!(
                "start_time must be before end_time on day {}",
                schedule.day_of_week
            )));
        }
    }
    Ok(())
}

pub async fn create_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateWorkerRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    validate_schedules(&req.schedules)?;

    let db = state.db.lock().unwrap();
    let worker_id = queries::create_worker(&db, name, req.specialty.as_deref())?;

    for schedule in &req.schedules {
        queries::upsert_schedule(
            &db,
            worker_id,
            schedule.day_of_week,
            parse_time(&schedule.start_time)?,
            parse_time(&schedule.end_time)?,
            schedule.is_working,
        )?;
    }

    Ok(Json(serde_json::json!({ "id": worker_id })))
}

/// Flips a worker's active flag. Deactivation removes the worker from slot
/// generation while keeping historical appointments.
pub async fn toggle_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let worker = queries::get_worker(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("worker {id}")))?;

    queries::set_worker_active(&db, id, !worker.is_active)?;
    Ok(Json(serde_json::json!({ "is_active": !worker.is_active })))
}

#[derive(Deserialize)]
pub struct UpdateWorkerRequest {
    pub name: String,
    pub specialty: Option<String>,
    #[serde(default)]
    pub schedules: Vec<ScheduleRequest>,
}

/// Edits name, specialty and any listed weekday windows. Days absent from
/// `schedules` keep their stored window.
pub async fn update_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateWorkerRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    validate_schedules(&req.schedules)?;

    let db = state.db.lock().unwrap();
    if !queries::update_worker(&db, id, name, req.specialty.as_deref())? {
        return Err(AppError::NotFound(format!("worker {id}")));
    }

    for schedule in &req.schedules {
        queries::upsert_schedule(
            &db,
            id,
            schedule.day_of_week,
            parse_time(&schedule.start_time)?,
            parse_time(&schedule.end_time)?,
            schedule.is_working,
        )?;
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}

/// Removes a worker and their weekly windows. Workers referenced by any
/// appointment cannot be deleted; deactivate them instead.
pub async fn delete_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    if queries::get_worker(&db, id)?.is_none() {
        return Err(AppError::NotFound(format!("worker {id}")));
    }
    if queries::worker_has_appointments(&db, id)? {
        return Err(AppError::Conflict(format!(
            "worker {id} has appointments; deactivate instead of deleting"
        )));
    }

    queries::delete_worker(&db, id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

pub async fn get_worker_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&query.date)?;

    let slots = {
        let db = state.db.lock().unwrap();
        availability::available_slots(&db, id, date, state.clock.now())?
    };

    Ok(Json(
        slots.iter().map(|t| t.format("%H:%M").to_string()).collect(),
    ))
}
