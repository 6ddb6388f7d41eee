pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use crate::services::{
    application_service::ApplicationService, candidate_service::CandidateService,
    event_service::EventRecorder,
};
use crate::store::{ApplicationStore, CandidateStore, EventStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub candidate_service: CandidateService,
    pub application_service: ApplicationService,
}

impl AppState {
    pub fn new<S>(store: S, max_list_limit: i64) -> Self
    where
        S: CandidateStore + ApplicationStore + EventStore + 'static,
    {
        let store = Arc::new(store);
        let recorder = EventRecorder::new(store.clone());
        let candidate_service = CandidateService::new(store.clone());
        let application_service =
            ApplicationService::new(store.clone(), store, recorder, max_list_limit);

        Self {
            candidate_service,
            application_service,
        }
    }
}
