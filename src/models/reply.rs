use chrono::{NaiveDate, NaiveTime};

/// Structured reply id coming back from an interactive list or button.
/// The wire format is a plain string with a recognized prefix:
/// `date_<ISO date>`, `time_<HH:MM>`, `cancel_<appointment id>`,
/// `confirm_yes`, `confirm_no`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAction {
    SelectDate(NaiveDate),
    SelectTime(NaiveTime),
    CancelAppointment(i64),
    ConfirmYes,
    ConfirmNo,
}

impl ReplyAction {
    pub fn parse(id: &str) -> Option<Self> {
        if let Some(rest) = id.strip_prefix("date_") {
            let date = NaiveDate::parse_from_str(rest, "%Y-%m-%d").ok()?;
            return Some(ReplyAction::SelectDate(date));
        }
        if let Some(rest) = id.strip_prefix("time_") {
            let time = NaiveTime::parse_from_str(rest, "%H:%M").ok()?;
            return Some(ReplyAction::SelectTime(time));
        }
        if let Some(rest) = id.strip_prefix("cancel_") {
            let appointment_id: i64 = rest.parse().ok()?;
            return Some(ReplyAction::CancelAppointment(appointment_id));
        }
        match id {
            "confirm_yes" => Some(ReplyAction::ConfirmYes),
            "confirm_no" => Some(ReplyAction::ConfirmNo),
            _ => None,
        }
    }
}

/// Free-text command recognized outside the interactive flow. The bot speaks
/// Turkish; `randevu` (appointment) works with or without the slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Book,
    CancelFlow,
    Help,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        if normalized == "randevu" || normalized.starts_with("/randevu") {
            return Some(Command::Book);
        }
        if normalized.starts_with("/iptal") {
            return Some(Command::CancelFlow);
        }
        if normalized == "/yardim" || normalized == "yardım" {
            return Some(Command::Help);
        }
        None
    }
}
