pub mod availability;
pub mod booking;
pub mod clock;
pub mod conversation;
pub mod messaging;
