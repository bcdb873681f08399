use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::config::DEFAULT_SLOT_DURATION_MINUTES;
use crate::models::{Appointment, AppointmentStatus, Customer, WeeklySchedule, Worker};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(DATETIME_FMT).to_string()
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Workers ──

pub fn create_worker(
    conn: &Connection,
    name: &str,
    specialty: Option<&str>,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO workers (name, specialty) VALUES (?1, ?2)",
        params![name, specialty],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_workers(conn: &Connection, only_active: bool) -> anyhow::Result<Vec<Worker>> {
    let sql = if only_active {
        "SELECT id, name, specialty, is_active, created_at FROM workers WHERE is_active = 1 ORDER BY name ASC"
    } else {
        "SELECT id, name, specialty, is_active, created_at FROM workers ORDER BY name ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_worker_row(row)))?;

    let mut workers = vec![];
    for row in rows {
        workers.push(row??);
    }
    Ok(workers)
}

pub fn get_worker(conn: &Connection, id: i64) -> anyhow::Result<Option<Worker>> {
    let result = conn.query_row(
        "SELECT id, name, specialty, is_active, created_at FROM workers WHERE id = ?1",
        params![id],
        |row| Ok(parse_worker_row(row)),
    );

    match result {
        Ok(worker) => Ok(Some(worker?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Default worker for conversations that never ask the customer to pick one.
pub fn first_active_worker(conn: &Connection) -> anyhow::Result<Option<Worker>> {
    let result = conn.query_row(
        "SELECT id, name, specialty, is_active, created_at FROM workers
         WHERE is_active = 1 ORDER BY name ASC LIMIT 1",
        [],
        |row| Ok(parse_worker_row(row)),
    );

    match result {
        Ok(worker) => Ok(Some(worker?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_worker(
    conn: &Connection,
    id: i64,
    name: &str,
    specialty: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE workers SET name = ?1, specialty = ?2 WHERE id = ?3",
        params![name, specialty, id],
    )?;
    Ok(count > 0)
}

pub fn set_worker_active(conn: &Connection, id: i64, active: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE workers SET is_active = ?1 WHERE id = ?2",
        params![active as i32, id],
    )?;
    Ok(count > 0)
}

pub fn delete_worker(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM workers WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Appointment rows (any status) still reference the worker; deletion is
/// blocked while any exist.
pub fn worker_has_appointments(conn: &Connection, worker_id: i64) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE worker_id = ?1",
        params![worker_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_worker_row(row: &rusqlite::Row) -> anyhow::Result<Worker> {
    let created_at_str: String = row.get(4)?;
    Ok(Worker {
        id: row.get(0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        is_active: row.get::<_, i32>(3)? != 0,
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Weekly schedules ──

pub fn upsert_schedule(
    conn: &Connection,
    worker_id: i64,
    day_of_week: u32,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_working: bool,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO worker_schedules (worker_id, day_of_week, start_time, end_time, is_working)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(worker_id, day_of_week) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           is_working = excluded.is_working",
        params![
            worker_id,
            day_of_week,
            start_time.format(TIME_FMT).to_string(),
            end_time.format(TIME_FMT).to_string(),
            is_working as i32,
        ],
    )?;
    Ok(())
}

/// Working window for an active worker on a weekday (0 = Sunday). Rows for
/// non-working days or deactivated workers are filtered out here.
pub fn get_working_schedule(
    conn: &Connection,
    worker_id: i64,
    day_of_week: u32,
) -> anyhow::Result<Option<WeeklySchedule>> {
    let result = conn.query_row(
        "SELECT s.id, s.worker_id, s.day_of_week, s.start_time, s.end_time, s.is_working
         FROM worker_schedules s
         JOIN workers w ON w.id = s.worker_id
         WHERE s.worker_id = ?1 AND s.day_of_week = ?2 AND s.is_working = 1 AND w.is_active = 1",
        params![worker_id, day_of_week],
        |row| Ok(parse_schedule_row(row)),
    );

    match result {
        Ok(schedule) => Ok(Some(schedule?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_schedules(conn: &Connection, worker_id: i64) -> anyhow::Result<Vec<WeeklySchedule>> {
    let mut stmt = conn.prepare(
        "SELECT id, worker_id, day_of_week, start_time, end_time, is_working
         FROM worker_schedules WHERE worker_id = ?1 ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map(params![worker_id], |row| Ok(parse_schedule_row(row)))?;

    let mut schedules = vec![];
    for row in rows {
        schedules.push(row??);
    }
    Ok(schedules)
}

fn parse_schedule_row(row: &rusqlite::Row) -> anyhow::Result<WeeklySchedule> {
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;
    Ok(WeeklySchedule {
        id: row.get(0)?,
        worker_id: row.get(1)?,
        day_of_week: row.get(2)?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FMT)
            .map_err(|e| anyhow::anyhow!("bad start_time in schedule: {e}"))?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FMT)
            .map_err(|e| anyhow::anyhow!("bad end_time in schedule: {e}"))?,
        is_working: row.get::<_, i32>(5)? != 0,
    })
}

// ── Customers ──

/// Lazy customer creation on first contact. The name is set once and never
/// overwritten; `last_contact` is refreshed on every inbound event.
pub fn get_or_create_customer(
    conn: &Connection,
    phone_number: &str,
    name: Option<&str>,
) -> anyhow::Result<Customer> {
    let now = now_str();
    conn.execute(
        "INSERT INTO customers (phone_number, name, created_at, last_contact)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(phone_number) DO UPDATE SET
           last_contact = excluded.last_contact,
           name = COALESCE(customers.name, excluded.name)",
        params![phone_number, name, now],
    )?;

    get_customer_by_phone(conn, phone_number)?
        .ok_or_else(|| anyhow::anyhow!("customer vanished after upsert: {phone_number}"))
}

pub fn get_customer_by_phone(
    conn: &Connection,
    phone_number: &str,
) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, phone_number, name, created_at, last_contact FROM customers WHERE phone_number = ?1",
        params![phone_number],
        |row| Ok(parse_customer_row(row)),
    );

    match result {
        Ok(customer) => Ok(Some(customer?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_customer_row(row: &rusqlite::Row) -> anyhow::Result<Customer> {
    let created_at_str: String = row.get(3)?;
    let last_contact_str: String = row.get(4)?;
    Ok(Customer {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
        last_contact: parse_datetime(&last_contact_str),
    })
}

// ── Appointments ──

/// Outcome of an insert attempt against the partial unique slot index.
pub enum InsertOutcome {
    Inserted(i64),
    SlotTaken,
}

#[allow(clippy::too_many_arguments)]
pub fn insert_appointment(
    conn: &Connection,
    customer_id: i64,
    worker_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
    status: AppointmentStatus,
    service_type: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<InsertOutcome> {
    let now = now_str();
    let result = conn.execute(
        "INSERT INTO appointments
           (customer_id, worker_id, appointment_date, appointment_time, duration_minutes,
            status, service_type, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            customer_id,
            worker_id,
            date.format(DATE_FMT).to_string(),
            time.format(TIME_FMT).to_string(),
            duration_minutes,
            status.as_str(),
            service_type,
            notes,
            now,
        ],
    );

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(InsertOutcome::SlotTaken)
        }
        Err(e) => Err(e.into()),
    }
}

/// Occupied start times for a worker on a date. Cancelled rows do not occupy
/// a slot.
pub fn booked_times(
    conn: &Connection,
    worker_id: i64,
    date: NaiveDate,
) -> anyhow::Result<Vec<NaiveTime>> {
    let mut stmt = conn.prepare(
        "SELECT appointment_time FROM appointments
         WHERE worker_id = ?1 AND appointment_date = ?2 AND status != 'cancelled'",
    )?;
    let rows = stmt.query_map(
        params![worker_id, date.format(DATE_FMT).to_string()],
        |row| row.get::<_, String>(0),
    )?;

    let mut times = vec![];
    for row in rows {
        let s = row?;
        if let Ok(t) = NaiveTime::parse_from_str(&s, TIME_FMT) {
            times.push(t);
        }
    }
    Ok(times)
}

pub fn appointments_for_customer(
    conn: &Connection,
    customer_id: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT id, customer_id, worker_id, appointment_date, appointment_time, duration_minutes,
                status, service_type, notes, created_at, updated_at
         FROM appointments
         WHERE customer_id = ?1 AND status != 'cancelled'
         ORDER BY appointment_date ASC, appointment_time ASC",
    )?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT id, customer_id, worker_id, appointment_date, appointment_time, duration_minutes,
                status, service_type, notes, created_at, updated_at
         FROM appointments WHERE id = ?1",
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

#[allow(clippy::too_many_arguments)]
pub fn update_appointment(
    conn: &Connection,
    id: i64,
    worker_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
    status: AppointmentStatus,
    service_type: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET
           worker_id = ?1, appointment_date = ?2, appointment_time = ?3,
           duration_minutes = ?4, status = ?5, service_type = ?6, notes = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            worker_id,
            date.format(DATE_FMT).to_string(),
            time.format(TIME_FMT).to_string(),
            duration_minutes,
            status.as_str(),
            service_type,
            notes,
            now_str(),
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_appointment_notes(
    conn: &Connection,
    id: i64,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET notes = ?1, updated_at = ?2 WHERE id = ?3",
        params![notes, now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_appointment(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn has_slot_conflict(
    conn: &Connection,
    worker_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    exclude_appointment_id: Option<i64>,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE worker_id = ?1 AND appointment_date = ?2 AND appointment_time = ?3
           AND status != 'cancelled' AND id != ?4",
        params![
            worker_id,
            date.format(DATE_FMT).to_string(),
            time.format(TIME_FMT).to_string(),
            exclude_appointment_id.unwrap_or(-1),
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Day listing for the admin screen, joined with customer and worker names.
pub struct AppointmentListing {
    pub appointment: Appointment,
    pub customer_phone: String,
    pub customer_name: Option<String>,
    pub worker_name: String,
}

pub fn list_appointments_for_day(
    conn: &Connection,
    date: NaiveDate,
    worker_id: Option<i64>,
    status: Option<&str>,
    search: Option<&str>,
) -> anyhow::Result<Vec<AppointmentListing>> {
    let mut sql = String::from(
        "SELECT a.id, a.customer_id, a.worker_id, a.appointment_date, a.appointment_time,
                a.duration_minutes, a.status, a.service_type, a.notes, a.created_at, a.updated_at,
                c.phone_number, c.name, w.name
         FROM appointments a
         JOIN customers c ON c.id = a.customer_id
         JOIN workers w ON w.id = a.worker_id
         WHERE a.appointment_date = ?1",
    );

    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(date.format(DATE_FMT).to_string())];

    if let Some(worker_id) = worker_id {
        sql.push_str(&format!(" AND a.worker_id = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(worker_id));
    }
    if let Some(status) = status {
        sql.push_str(&format!(" AND a.status = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(status.to_string()));
    }
    if let Some(search) = search {
        let n = params_vec.len() + 1;
        sql.push_str(&format!(
            " AND (c.phone_number LIKE ?{n} OR lower(c.name) LIKE lower(?{n}) OR lower(a.service_type) LIKE lower(?{n}))"
        ));
        params_vec.push(Box::new(format!("%{}%", search.trim())));
    }

    sql.push_str(" ORDER BY a.appointment_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let customer_phone: String = row.get(11)?;
        let customer_name: Option<String> = row.get(12)?;
        let worker_name: String = row.get(13)?;
        Ok((parse_appointment_row(row), customer_phone, customer_name, worker_name))
    })?;

    let mut listings = vec![];
    for row in rows {
        let (appointment, customer_phone, customer_name, worker_name) = row?;
        listings.push(AppointmentListing {
            appointment: appointment?,
            customer_phone,
            customer_name,
            worker_name,
        });
    }
    Ok(listings)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(3)?;
    let time_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    Ok(Appointment {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        worker_id: row.get(2)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .map_err(|e| anyhow::anyhow!("bad appointment_date: {e}"))?,
        time: NaiveTime::parse_from_str(&time_str, TIME_FMT)
            .map_err(|e| anyhow::anyhow!("bad appointment_time: {e}"))?,
        duration_minutes: row.get(5)?,
        status: AppointmentStatus::parse_or_pending(&status_str),
        service_type: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ── Business config ──

pub fn get_config(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let result = conn.query_row(
        "SELECT config_value FROM business_config WHERE config_key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO business_config (config_key, config_value) VALUES (?1, ?2)
         ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
        params![key, value],
    )?;
    Ok(())
}

/// Slot length in minutes; missing or unparseable config falls back to the
/// documented default instead of failing the caller.
pub fn slot_duration_minutes(conn: &Connection) -> u32 {
    get_config(conn, "slot_duration_minutes")
        .ok()
        .flatten()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&d| d > 0)
        .unwrap_or(DEFAULT_SLOT_DURATION_MINUTES)
}
