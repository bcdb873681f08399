use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Step within the booking dialogue. `Idle` is represented by the absence of
/// stored state, so it has no variant here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    AwaitingDate,
    AwaitingTime,
    ConfirmingAppointment,
}

impl ConversationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStep::AwaitingDate => "awaiting_date",
            ConversationStep::AwaitingTime => "awaiting_time",
            ConversationStep::ConfirmingAppointment => "confirming_appointment",
        }
    }
}

/// Ephemeral per-customer progress through the booking dialogue. Lives only
/// in the in-memory conversation store, cleared when the flow ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub phone_number: String,
    pub step: ConversationStep,
    pub worker_id: i64,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<NaiveTime>,
    pub service_type: Option<String>,
}

impl ConversationState {
    pub fn new(phone_number: &str, worker_id: i64) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            step: ConversationStep::AwaitingDate,
            worker_id,
            selected_date: None,
            selected_time: None,
            service_type: None,
        }
    }
}
