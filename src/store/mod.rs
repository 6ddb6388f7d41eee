//! Persistence boundary. Services hold these traits as `Arc<dyn …>`, so the
//! lifecycle logic runs unchanged on PostgreSQL or on the in-memory store.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, ApplicationWithCandidate,
};
use crate::models::application_event::{ApplicationEvent, NewApplicationEvent};
use crate::models::candidate::Candidate;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Fails `Conflict` when the email is already taken.
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<Candidate>;

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>>;

    async fn candidate_exists(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Fails `Referential` when `candidate_id` has no candidate row.
    async fn insert_application(&self, application: &Application) -> Result<Application>;

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>>;

    /// Atomic compare-and-swap on `(id, version)`. Sets `status`, bumps
    /// `version` by one and stamps `updated_at`. Returns `None` when no row
    /// matched, i.e. the application is gone or another writer got there first.
    async fn update_status_if_version(
        &self,
        id: Uuid,
        expected_version: i64,
        to: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Application>>;

    /// Newest `created_at` first.
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationWithCandidate>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_event(&self, event: &NewApplicationEvent) -> Result<ApplicationEvent>;
}
