pub mod application;
pub mod application_event;
pub mod candidate;
