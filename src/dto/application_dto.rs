use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::application::ApplicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateApplicationPayload {
    /// Parsed by the service; empty or malformed ids are validation errors.
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TransitionApplicationPayload {
    #[validate(length(min = 1))]
    pub to_status: String,
    pub reason: Option<String>,
}

impl TransitionApplicationPayload {
    pub fn target(&self) -> Result<ApplicationStatus> {
        self.to_status.trim().parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ApplicationListQuery {
    pub fn status(&self) -> Result<Option<ApplicationStatus>> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()
    }
}
