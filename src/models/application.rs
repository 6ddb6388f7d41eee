use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::models::candidate::CandidateSummary;

/// Hiring pipeline stage of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Screening,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Hired,
        ApplicationStatus::Rejected,
    ];

    /// The transition table. Every status is listed; terminal ones map to an
    /// empty slice, so a status can never move anywhere the table doesn't name.
    pub fn legal_targets(self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[Screening, Rejected],
            Screening => &[Interview, Rejected],
            Interview => &[Offer, Rejected],
            Offer => &[Hired, Rejected],
            Hired => &[],
            Rejected => &[],
        }
    }

    pub fn can_transition_to(self, target: ApplicationStatus) -> bool {
        self.legal_targets().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.legal_targets().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown application status '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub role: String,
    pub status: ApplicationStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `applications` row; `status` is TEXT in the database.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub role: String,
    pub status: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            candidate_id: row.candidate_id,
            role: row.role,
            status: row.status.parse().map_err(|_| {
                Error::Internal(format!(
                    "Corrupt status '{}' on application {}",
                    row.status, row.id
                ))
            })?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWithCandidate {
    #[serde(flatten)]
    pub application: Application,
    pub candidate: CandidateSummary,
}

/// `applications` joined with `candidates`, as returned by the list query.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationWithCandidateRow {
    #[sqlx(flatten)]
    pub application: ApplicationRow,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl TryFrom<ApplicationWithCandidateRow> for ApplicationWithCandidate {
    type Error = Error;

    fn try_from(row: ApplicationWithCandidateRow) -> Result<Self, Self::Error> {
        let application = Application::try_from(row.application)?;
        Ok(Self {
            candidate: CandidateSummary {
                id: application.candidate_id,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            },
            application,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub role: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub limit: i64,
    pub offset: i64,
}
