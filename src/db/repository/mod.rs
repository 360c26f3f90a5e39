pub mod booking;
pub mod event;
pub mod rule;

pub use booking::{BookingChanges, BookingRepository};
pub use event::EventRepository;
pub use rule::RuleRepository;
