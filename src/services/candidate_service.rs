use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::store::CandidateStore;
use crate::utils::{time::now, validation::validate};

#[derive(Clone)]
pub struct CandidateService {
    candidates: Arc<dyn CandidateStore>,
}

impl CandidateService {
    pub fn new(candidates: Arc<dyn CandidateStore>) -> Self {
        Self { candidates }
    }

    pub async fn create(&self, first_name: &str, last_name: &str, email: &str) -> Result<Candidate> {
        let new_candidate = NewCandidate::new(first_name, last_name, email);
        validate(&new_candidate)?;

        // Email uniqueness is enforced by the store.
        let candidate = self
            .candidates
            .insert_candidate(&Candidate {
                id: Uuid::new_v4(),
                first_name: new_candidate.first_name,
                last_name: new_candidate.last_name,
                email: new_candidate.email,
                created_at: now(),
            })
            .await?;

        tracing::info!(candidate_id = %candidate.id, "Candidate created");
        Ok(candidate)
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate> {
        self.candidates
            .get_candidate(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }
}
