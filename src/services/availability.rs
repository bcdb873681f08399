use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;

use crate::db::queries;

/// Bookable start times for a worker on a date, ascending. Computed fresh on
/// every call. A worker without a working window that day (or deactivated)
/// yields an empty list, which is a normal outcome rather than an error.
///
/// `now` is the current moment in the business timezone; slots on today's
/// date that fall before the rounded-up current time are dropped, and a past
/// date always yields no slots.
pub fn available_slots(
    conn: &Connection,
    worker_id: i64,
    date: NaiveDate,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<NaiveTime>> {
    if date < now.date() {
        return Ok(vec![]);
    }

    let day_of_week = date.weekday().num_days_from_sunday();
    let Some(schedule) = queries::get_working_schedule(conn, worker_id, day_of_week)? else {
        tracing::debug!(worker_id, %date, "no working window for weekday");
        return Ok(vec![]);
    };

    let slot_duration = queries::slot_duration_minutes(conn);

    let mut slots = vec![];
    let mut current = schedule.start_time;
    while current < schedule.end_time {
        slots.push(current);
        let (next, overflow) =
            current.overflowing_add_signed(Duration::minutes(slot_duration as i64));
        if overflow > 0 {
            // Stepped past midnight; nothing further fits in the day.
            break;
        }
        current = next;
    }

    let booked = queries::booked_times(conn, worker_id, date)?;
    slots.retain(|slot| !booked.contains(slot));

    if date == now.date() {
        if let Some(cutoff) = round_up_to_slot(now.time(), slot_duration) {
            slots.retain(|slot| *slot >= cutoff);
        } else {
            // Rounding past midnight: nothing left of today.
            slots.clear();
        }
    }

    Ok(slots)
}

/// Next slot-aligned time at or after `t`: the current minute rounded up to
/// the next multiple of the slot duration. `None` when that rounds past the
/// end of the day.
fn round_up_to_slot(t: NaiveTime, slot_duration: u32) -> Option<NaiveTime> {
    let mut minutes = t.hour() * 60 + t.minute();
    if t.second() > 0 || t.nanosecond() > 0 {
        minutes += 1;
    }
    let rounded = minutes.div_ceil(slot_duration) * slot_duration;
    if rounded >= 24 * 60 {
        return None;
    }
    NaiveTime::from_hms_opt(rounded / 60, rounded % 60, 0)
}
