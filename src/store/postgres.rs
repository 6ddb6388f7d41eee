use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ApplicationStore, CandidateStore, EventStore};
use crate::error::Result;
use crate::models::application::{
    Application, ApplicationFilter, ApplicationRow, ApplicationStatus, ApplicationWithCandidate,
    ApplicationWithCandidateRow,
};
use crate::models::application_event::{ApplicationEvent, NewApplicationEvent};
use crate::models::candidate::Candidate;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<Candidate> {
        let row = sqlx::query_as::<_, Candidate>(
            r#"
            INSERT INTO candidates (id, first_name, last_name, email, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email, created_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(candidate.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let row = sqlx::query_as::<_, Candidate>(
            r#"SELECT id, first_name, last_name, email, created_at FROM candidates WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn candidate_exists(&self, id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM candidates WHERE id = $1)"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn insert_application(&self, application: &Application) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications (id, candidate_id, role, status, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, candidate_id, role, status, version, created_at, updated_at
            "#,
        )
        .bind(application.id)
        .bind(application.candidate_id)
        .bind(&application.role)
        .bind(application.status.as_str())
        .bind(application.version)
        .bind(application.created_at)
        .bind(application.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Application::try_from(row)
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, candidate_id, role, status, version, created_at, updated_at
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn update_status_if_version(
        &self,
        id: Uuid,
        expected_version: i64,
        to: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            UPDATE applications
            SET status = $3,
                version = version + 1,
                updated_at = GREATEST($4, created_at)
            WHERE id = $1 AND version = $2
            RETURNING id, candidate_id, role, status, version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(to.as_str())
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationWithCandidate>> {
        let rows = sqlx::query_as::<_, ApplicationWithCandidateRow>(
            r#"
            SELECT a.id, a.candidate_id, a.role, a.status, a.version, a.created_at, a.updated_at,
                   c.first_name, c.last_name, c.email
            FROM applications a
            JOIN candidates c ON c.id = a.candidate_id
            WHERE ($1::text IS NULL OR a.role = $1)
              AND ($2::text IS NULL OR a.status = $2)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.role.as_deref())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ApplicationWithCandidate::try_from)
            .collect()
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn append_event(&self, event: &NewApplicationEvent) -> Result<ApplicationEvent> {
        let row = sqlx::query_as::<_, ApplicationEvent>(
            r#"
            INSERT INTO application_events (id, application_id, type, payload, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, application_id, type, payload, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.application_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
