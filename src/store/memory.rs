use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{ApplicationStore, CandidateStore, EventStore};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, ApplicationWithCandidate,
};
use crate::models::application_event::{ApplicationEvent, NewApplicationEvent};
use crate::models::candidate::{Candidate, CandidateSummary};
use crate::utils::time::now;

#[derive(Debug, Default)]
struct Tables {
    candidates: Vec<Candidate>,
    // Insertion order; list ties on `created_at` resolve newest-inserted first.
    applications: Vec<Application>,
    events: Vec<ApplicationEvent>,
}

/// Process-local store with the same constraints as the SQL schema: unique
/// candidate emails, foreign keys from applications and events, and an atomic
/// version check on status updates. Every operation takes the lock once and
/// never holds it across an await.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }

    /// Audit trail of one application, oldest first.
    pub fn events_for(&self, application_id: Uuid) -> Vec<ApplicationEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.application_id == application_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<Candidate> {
        let mut tables = self.lock();
        if tables.candidates.iter().any(|c| c.email == candidate.email) {
            return Err(Error::Conflict(format!(
                "A candidate with email {} already exists",
                candidate.email
            )));
        }
        tables.candidates.push(candidate.clone());
        Ok(candidate.clone())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.lock().candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidate_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock().candidates.iter().any(|c| c.id == id))
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn insert_application(&self, application: &Application) -> Result<Application> {
        let mut tables = self.lock();
        if !tables.candidates.iter().any(|c| c.id == application.candidate_id) {
            return Err(Error::Referential(format!(
                "Candidate {} does not exist",
                application.candidate_id
            )));
        }
        if tables.applications.iter().any(|a| a.id == application.id) {
            return Err(Error::Conflict(format!(
                "Application {} already exists",
                application.id
            )));
        }
        tables.applications.push(application.clone());
        Ok(application.clone())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.lock().applications.iter().find(|a| a.id == id).cloned())
    }

    async fn update_status_if_version(
        &self,
        id: Uuid,
        expected_version: i64,
        to: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Application>> {
        let mut tables = self.lock();
        let Some(row) = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.version == expected_version)
        else {
            return Ok(None);
        };

        row.status = to;
        row.version += 1;
        row.updated_at = updated_at.max(row.created_at);
        Ok(Some(row.clone()))
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationWithCandidate>> {
        let tables = self.lock();
        let mut matching: Vec<&Application> = tables
            .applications
            .iter()
            .rev()
            .filter(|a| filter.role.as_deref().map_or(true, |role| a.role == role))
            .filter(|a| filter.status.map_or(true, |status| a.status == status))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(filter.offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit.max(0)).unwrap_or(usize::MAX);

        matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|application| {
                let candidate = tables
                    .candidates
                    .iter()
                    .find(|c| c.id == application.candidate_id)
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "Application {} references missing candidate {}",
                            application.id, application.candidate_id
                        ))
                    })?;
                Ok(ApplicationWithCandidate {
                    application: application.clone(),
                    candidate: CandidateSummary::from(candidate),
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_event(&self, event: &NewApplicationEvent) -> Result<ApplicationEvent> {
        let mut tables = self.lock();
        if !tables.applications.iter().any(|a| a.id == event.application_id) {
            return Err(Error::Referential(format!(
                "Application {} does not exist",
                event.application_id
            )));
        }
        let row = ApplicationEvent {
            id: Uuid::new_v4(),
            application_id: event.application_id,
            event_type: event.event_type.clone(),
            payload: Some(event.payload.clone()),
            created_at: now(),
        };
        tables.events.push(row.clone());
        Ok(row)
    }
}
