use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    pub name: String,
    pub specialty: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// One working window per (worker, weekday). `day_of_week` uses 0 = Sunday,
/// matching `chrono::Weekday::num_days_from_sunday`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub id: i64,
    pub worker_id: i64,
    pub day_of_week: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_working: bool,
}
