pub mod availability;
pub mod booking;
pub mod lifecycle;
pub mod notify;
pub mod payments;
pub mod slot_guard;
pub mod timezone;
