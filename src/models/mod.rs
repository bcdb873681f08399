pub mod appointment;
pub mod conversation;
pub mod customer;
pub mod reply;
pub mod worker;

pub use appointment::{Appointment, AppointmentStatus};
pub use conversation::{ConversationState, ConversationStep};
pub use customer::Customer;
pub use reply::{Command, ReplyAction};
pub use worker::{WeeklySchedule, Worker};
