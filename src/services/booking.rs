use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Appointment, AppointmentStatus};

/// Outcome of a create attempt. Rejections are expected flow, presented to
/// the customer as "pick another slot", never raised as errors.
#[derive(Debug)]
pub enum CreateResult {
    Booked(Appointment),
    SlotTaken,
    InPast,
}

/// Atomic check-then-create. The partial unique index on
/// (worker, date, time, non-cancelled) backs the conflict check, so only one
/// of any number of concurrent callers can win a slot.
#[allow(clippy::too_many_arguments)]
pub fn create_appointment(
    conn: &Connection,
    customer_id: i64,
    worker_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
    service_type: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<CreateResult> {
    if date.and_time(time) < now {
        tracing::info!(customer_id, worker_id, %date, %time, "rejected booking in the past");
        return Ok(CreateResult::InPast);
    }

    let outcome = queries::insert_appointment(
        conn,
        customer_id,
        worker_id,
        date,
        time,
        duration_minutes,
        AppointmentStatus::Pending,
        service_type,
        None,
    )?;

    match outcome {
        queries::InsertOutcome::Inserted(id) => {
            let appointment = queries::get_appointment(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("appointment vanished after insert: {id}"))?;
            tracing::info!(
                appointment_id = id,
                customer_id,
                worker_id,
                %date,
                %time,
                "created appointment"
            );
            Ok(CreateResult::Booked(appointment))
        }
        queries::InsertOutcome::SlotTaken => {
            tracing::info!(customer_id, worker_id, %date, %time, "slot already booked");
            Ok(CreateResult::SlotTaken)
        }
    }
}

/// Customer-initiated cancellation. Succeeds only for the customer's own
/// appointment; cancelling an already-cancelled one is a no-op success.
pub fn cancel_appointment(
    conn: &Connection,
    customer_id: i64,
    appointment_id: i64,
) -> anyhow::Result<bool> {
    let Some(appointment) = queries::get_appointment(conn, appointment_id)? else {
        tracing::warn!(appointment_id, customer_id, "cancel target not found");
        return Ok(false);
    };

    if appointment.customer_id != customer_id {
        tracing::warn!(appointment_id, customer_id, "cancel ownership mismatch");
        return Ok(false);
    }

    if appointment.status == AppointmentStatus::Cancelled {
        return Ok(true);
    }

    queries::update_appointment_status(conn, appointment_id, AppointmentStatus::Cancelled)?;
    tracing::info!(appointment_id, customer_id, "cancelled appointment");
    Ok(true)
}
