use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub customer_id: i64,
    pub worker_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub service_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Strict parse for input validation (admin status writes).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    /// Lenient parse for stored rows; unknown values read back as pending.
    pub fn parse_or_pending(s: &str) -> Self {
        Self::parse(s).unwrap_or(AppointmentStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "confirmed", "cancelled", "completed"] {
            assert_eq!(AppointmentStatus::parse(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert!(AppointmentStatus::parse("done").is_none());
        assert!(AppointmentStatus::parse("").is_none());
        assert!(AppointmentStatus::parse("Pending").is_none());
    }

    #[test]
    fn test_stored_rows_default_to_pending() {
        assert_eq!(
            AppointmentStatus::parse_or_pending("garbage"),
            AppointmentStatus::Pending
        );
    }
}
