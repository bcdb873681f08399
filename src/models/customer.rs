use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub phone_number: String,
    pub name: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_contact: NaiveDateTime,
}
