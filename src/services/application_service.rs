use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, ApplicationWithCandidate,
};
use crate::services::event_service::EventRecorder;
use crate::store::{ApplicationStore, CandidateStore};
use crate::utils::time::now;

pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Owns application rows: creation, status transitions and reads.
#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationStore>,
    candidates: Arc<dyn CandidateStore>,
    recorder: EventRecorder,
    max_list_limit: i64,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationStore>,
        candidates: Arc<dyn CandidateStore>,
        recorder: EventRecorder,
        max_list_limit: i64,
    ) -> Self {
        Self {
            applications,
            candidates,
            recorder,
            max_list_limit: max_list_limit.max(1),
        }
    }

    pub async fn create(&self, candidate_id: &str, role: &str) -> Result<Application> {
        let candidate_id = candidate_id.trim();
        let role = role.trim();
        if candidate_id.is_empty() {
            return Err(Error::Validation("candidate_id is required".to_string()));
        }
        if role.is_empty() {
            return Err(Error::Validation("role is required".to_string()));
        }
        let candidate_id = Uuid::parse_str(candidate_id).map_err(|_| {
            Error::Validation(format!("candidate_id '{}' is not a valid id", candidate_id))
        })?;
        if candidate_id.is_nil() {
            return Err(Error::Validation("candidate_id is required".to_string()));
        }

        // The foreign key in the store is still the authoritative check.
        if !self.candidates.candidate_exists(candidate_id).await? {
            return Err(Error::Referential(format!(
                "Candidate {} does not exist",
                candidate_id
            )));
        }

        let ts = now();
        let application = self
            .applications
            .insert_application(&Application {
                id: Uuid::new_v4(),
                candidate_id,
                role: role.to_string(),
                status: ApplicationStatus::Applied,
                version: 1,
                created_at: ts,
                updated_at: ts,
            })
            .await?;

        tracing::info!(
            application_id = %application.id,
            candidate_id = %candidate_id,
            role = %application.role,
            "Application created"
        );
        Ok(application)
    }

    /// Moves an application to `target` if the transition table allows it.
    ///
    /// The write is conditioned on the version read here; losing that race
    /// yields `ConcurrentModification` and nothing is retried. After the write
    /// commits an `update` event is appended. A failure to append is logged
    /// and the committed application is still returned.
    pub async fn transition(
        &self,
        id: Uuid,
        target: ApplicationStatus,
        reason: Option<String>,
    ) -> Result<Application> {
        let current = self.get(id).await?;

        if !current.status.can_transition_to(target) {
            tracing::warn!(
                application_id = %id,
                from = %current.status,
                to = %target,
                "Rejected illegal transition"
            );
            return Err(Error::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let updated = self
            .applications
            .update_status_if_version(id, current.version, target, now())
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    application_id = %id,
                    expected_version = current.version,
                    "Lost optimistic concurrency race"
                );
                Error::ConcurrentModification(id)
            })?;

        tracing::info!(
            application_id = %id,
            from = %current.status,
            to = %updated.status,
            version = updated.version,
            "Application transitioned"
        );

        let reason = reason.filter(|r| !r.trim().is_empty());
        if let Err(e) = self
            .recorder
            .record_transition(&updated, current.status, reason)
            .await
        {
            tracing::error!(
                application_id = %id,
                version = updated.version,
                error = %e,
                "Failed to record transition event; transition stays committed"
            );
        }

        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        self.applications
            .get_application(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))
    }

    pub async fn list(
        &self,
        role: Option<String>,
        status: Option<ApplicationStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ApplicationWithCandidate>> {
        let filter = ApplicationFilter {
            role: role
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            status,
            limit: limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, self.max_list_limit),
            offset: offset.unwrap_or(0).max(0),
        };
        self.applications.list_applications(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application_event::EVENT_TYPE_UPDATE;
    use crate::models::candidate::Candidate;
    use crate::store::{MemoryStore, MockApplicationStore, MockCandidateStore, MockEventStore};
    use ApplicationStatus::*;

    struct Fixture {
        store: MemoryStore,
        service: ApplicationService,
        candidate_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let candidate = store
            .insert_candidate(&Candidate {
                id: Uuid::new_v4(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
                created_at: now(),
            })
            .await
            .unwrap();
        let shared = Arc::new(store.clone());
        let service = ApplicationService::new(
            shared.clone(),
            shared.clone(),
            EventRecorder::new(shared),
            100,
        );
        Fixture {
            store,
            service,
            candidate_id: candidate.id,
        }
    }

    async fn application_in(fx: &Fixture, path: &[ApplicationStatus]) -> Application {
        let mut app = fx
            .service
            .create(&fx.candidate_id.to_string(), "engineer")
            .await
            .unwrap();
        for status in path {
            app = fx.service.transition(app.id, *status, None).await.unwrap();
        }
        app
    }

    /// Shortest path from `applied` to each status.
    fn path_to(status: ApplicationStatus) -> Vec<ApplicationStatus> {
        match status {
            Applied => vec![],
            Screening => vec![Screening],
            Interview => vec![Screening, Interview],
            Offer => vec![Screening, Interview, Offer],
            Hired => vec![Screening, Interview, Offer, Hired],
            Rejected => vec![Rejected],
        }
    }

    #[tokio::test]
    async fn create_starts_applied_at_version_one() {
        let fx = fixture().await;
        let app = fx
            .service
            .create(&fx.candidate_id.to_string(), "  engineer ")
            .await
            .unwrap();
        assert_eq!(app.status, Applied);
        assert_eq!(app.version, 1);
        assert_eq!(app.role, "engineer");
        assert_eq!(app.created_at, app.updated_at);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let fx = fixture().await;
        let id = fx.candidate_id.to_string();

        for (candidate_id, role) in [("", "engineer"), (id.as_str(), ""), (id.as_str(), "   ")] {
            let err = fx.service.create(candidate_id, role).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", err);
        }

        let err = fx
            .service
            .create(&Uuid::nil().to_string(), "engineer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = fx.service.create("not-a-uuid", "engineer").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn create_requires_existing_candidate() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(&Uuid::new_v4().to_string(), "engineer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Referential(_)));
    }

    #[tokio::test]
    async fn store_constraint_surfaces_referential_error() {
        let mut candidates = MockCandidateStore::new();
        candidates.expect_candidate_exists().returning(|_| Ok(true));
        let mut applications = MockApplicationStore::new();
        applications
            .expect_insert_application()
            .returning(|_| Err(Error::Referential("applications_candidate_id_fkey".into())));

        let service = ApplicationService::new(
            Arc::new(applications),
            Arc::new(candidates),
            EventRecorder::new(Arc::new(MockEventStore::new())),
            100,
        );
        let err = service
            .create(&Uuid::new_v4().to_string(), "engineer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Referential(_)));
    }

    #[tokio::test]
    async fn every_pair_follows_the_table() {
        for from in ApplicationStatus::ALL {
            for to in ApplicationStatus::ALL {
                let fx = fixture().await;
                let app = application_in(&fx, &path_to(from)).await;
                assert_eq!(app.status, from);

                let result = fx.service.transition(app.id, to, None).await;
                if from.legal_targets().contains(&to) {
                    let updated = result.unwrap();
                    assert_eq!(updated.status, to);
                    assert_eq!(updated.version, app.version + 1);
                } else {
                    match result {
                        Err(Error::InvalidTransition { from: f, to: t }) => {
                            assert_eq!((f, t), (from, to));
                        }
                        other => panic!("{} -> {}: expected InvalidTransition, got {:?}", from, to, other),
                    }
                    let unchanged = fx.service.get(app.id).await.unwrap();
                    assert_eq!(unchanged.version, app.version);
                }
            }
        }
    }

    #[tokio::test]
    async fn pipeline_scenario() {
        let fx = fixture().await;
        let app = fx
            .service
            .create(&fx.candidate_id.to_string(), "engineer")
            .await
            .unwrap();
        assert_eq!((app.status, app.version), (Applied, 1));

        let app = fx.service.transition(app.id, Screening, None).await.unwrap();
        assert_eq!((app.status, app.version), (Screening, 2));

        let err = fx.service.transition(app.id, Offer, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: Screening, to: Offer }));

        let app = fx.service.transition(app.id, Interview, None).await.unwrap();
        assert_eq!((app.status, app.version), (Interview, 3));

        let app = fx
            .service
            .transition(app.id, Rejected, Some("position filled".into()))
            .await
            .unwrap();
        assert_eq!((app.status, app.version), (Rejected, 4));
        assert!(app.updated_at >= app.created_at);

        let err = fx.service.transition(app.id, Interview, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: Rejected, to: Interview }));
    }

    #[tokio::test]
    async fn each_transition_records_one_event() {
        let fx = fixture().await;
        let app = application_in(&fx, &[Screening, Interview]).await;
        let _ = fx.service.transition(app.id, Hired, None).await.unwrap_err();
        let app = fx
            .service
            .transition(app.id, Offer, Some("great onsite".into()))
            .await
            .unwrap();

        let events = fx.store.events_for(app.id);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event_type == EVENT_TYPE_UPDATE));

        let targets: Vec<&str> = events
            .iter()
            .map(|e| e.payload.as_ref().unwrap()["to_status"].as_str().unwrap())
            .collect();
        assert_eq!(targets, vec!["screening", "interview", "offer"]);

        let last = events.last().unwrap().payload.as_ref().unwrap();
        assert_eq!(last["from_status"], "interview");
        assert_eq!(last["version"], 4);
        assert_eq!(last["reason"], "great onsite");
    }

    #[tokio::test]
    async fn transition_missing_application_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .service
            .transition(Uuid::new_v4(), Screening, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    fn applied_row(id: Uuid) -> Application {
        let ts = now();
        Application {
            id,
            candidate_id: Uuid::new_v4(),
            role: "engineer".into(),
            status: Applied,
            version: 1,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn lost_race_is_concurrent_modification() {
        let id = Uuid::new_v4();
        let mut applications = MockApplicationStore::new();
        applications
            .expect_get_application()
            .returning(move |_| Ok(Some(applied_row(id))));
        applications
            .expect_update_status_if_version()
            .withf(move |app_id, version, to, _| *app_id == id && *version == 1 && *to == Screening)
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        let mut events = MockEventStore::new();
        events.expect_append_event().never();

        let service = ApplicationService::new(
            Arc::new(applications),
            Arc::new(MockCandidateStore::new()),
            EventRecorder::new(Arc::new(events)),
            100,
        );
        let err = service.transition(id, Screening, None).await.unwrap_err();
        assert!(matches!(err, Error::ConcurrentModification(e) if e == id));
    }

    #[tokio::test]
    async fn racing_transitions_commit_once() {
        let fx = fixture().await;
        let app = application_in(&fx, &[]).await;

        // Both callers observed version 1; only one conditional write lands.
        let a = fx.store.update_status_if_version(app.id, 1, Screening, now());
        let b = fx.store.update_status_if_version(app.id, 1, Rejected, now());
        let (a, b) = tokio::join!(a, b);
        let winners = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn recorder_failure_keeps_transition() {
        let id = Uuid::new_v4();
        let mut applications = MockApplicationStore::new();
        applications
            .expect_get_application()
            .returning(move |_| Ok(Some(applied_row(id))));
        applications
            .expect_update_status_if_version()
            .returning(move |_, _, to, ts| {
                let mut row = applied_row(id);
                row.status = to;
                row.version = 2;
                row.updated_at = ts;
                Ok(Some(row))
            });
        let mut events = MockEventStore::new();
        events
            .expect_append_event()
            .times(1)
            .returning(|_| Err(Error::Storage(sqlx::Error::PoolTimedOut)));

        let service = ApplicationService::new(
            Arc::new(applications),
            Arc::new(MockCandidateStore::new()),
            EventRecorder::new(Arc::new(events)),
            100,
        );
        let updated = service.transition(id, Screening, None).await.unwrap();
        assert_eq!((updated.status, updated.version), (Screening, 2));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_get_application()
            .returning(|_| Err(Error::Storage(sqlx::Error::PoolClosed)));
        let service = ApplicationService::new(
            Arc::new(applications),
            Arc::new(MockCandidateStore::new()),
            EventRecorder::new(Arc::new(MockEventStore::new())),
            100,
        );
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn list_filters_by_status_newest_first() {
        let fx = fixture().await;
        let first = application_in(&fx, &[]).await;
        let _screened = application_in(&fx, &[Screening]).await;
        let third = application_in(&fx, &[]).await;

        let listed = fx.service.list(None, Some(Applied), None, None).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|a| a.application.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
        assert!(listed.iter().all(|a| a.application.status == Applied));
        assert!(listed.iter().all(|a| a.candidate.id == fx.candidate_id));
    }

    #[tokio::test]
    async fn list_filters_by_role() {
        let fx = fixture().await;
        let engineer = application_in(&fx, &[]).await;
        fx.service
            .create(&fx.candidate_id.to_string(), "designer")
            .await
            .unwrap();

        let listed = fx
            .service
            .list(Some("engineer".into()), None, None, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].application.id, engineer.id);

        let all = fx.service.list(Some(" ".into()), None, None, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn list_role_filter_ignores_surrounding_whitespace() {
        let fx = fixture().await;
        let engineer = application_in(&fx, &[]).await;

        let listed = fx
            .service
            .list(Some(" engineer\t".into()), None, None, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].application.id, engineer.id);
    }

    #[tokio::test]
    async fn list_clamps_limit_and_offset() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_list_applications()
            .withf(|f| f.limit == 5 && f.offset == 0)
            .times(1)
            .returning(|_| Ok(vec![]));
        applications
            .expect_list_applications()
            .withf(|f| f.limit == 1 && f.offset == 3)
            .times(1)
            .returning(|_| Ok(vec![]));
        applications
            .expect_list_applications()
            .withf(|f| f.limit == DEFAULT_LIST_LIMIT.min(5) && f.offset == 2)
            .times(1)
            .returning(|_| Ok(vec![]));

        let service = ApplicationService::new(
            Arc::new(applications),
            Arc::new(MockCandidateStore::new()),
            EventRecorder::new(Arc::new(MockEventStore::new())),
            5,
        );
        service.list(None, None, Some(1_000), Some(-4)).await.unwrap();
        service.list(None, None, Some(0), Some(3)).await.unwrap();
        service.list(None, None, None, Some(2)).await.unwrap();
    }
}
