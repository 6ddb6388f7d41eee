pub mod application_service;
pub mod candidate_service;
pub mod event_service;
