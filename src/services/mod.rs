pub mod auth;
pub mod availability;
pub mod booking;
pub mod clock;
pub mod init;
pub mod notifications;
pub mod schedule;
