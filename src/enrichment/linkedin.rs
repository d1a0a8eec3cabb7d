//! Professional-network enricher. No API partnership exists for
//! programmatic profile lookups, so this always resolves `NOT_AVAILABLE`
//! with a fixed rationale, preserving or synthesizing a search URL so a
//! human reviewer has somewhere to click.

use async_trait::async_trait;
use chrono::Utc;

use crate::storage::{Candidate, CandidateExternalProfile, ExternalSource, ProfileStatus};

use super::Enricher;

const UNAVAILABLE_MESSAGE: &str =
    "LinkedIn does not permit automated profile lookups; review manually";

pub struct LinkedinEnricher;

impl LinkedinEnricher {
    pub fn new() -> Self {
        Self
    }

    fn search_url_for(name: &str) -> String {
        let query = name.replace(' ', "%20");
        format!("https://www.linkedin.com/search/results/people/?keywords={query}")
    }
}

impl Default for LinkedinEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enricher for LinkedinEnricher {
    fn source(&self) -> ExternalSource {
        ExternalSource::Linkedin
    }

    fn supports_url(&self, url: &str) -> bool {
        url.to_lowercase().contains("linkedin.com")
    }

    async fn enrich(
        &self,
        mut existing: CandidateExternalProfile,
        candidate: &Candidate,
    ) -> CandidateExternalProfile {
        existing.status = ProfileStatus::NotAvailable;
        existing.last_fetched_at = Some(Utc::now());
        existing.error_message = Some(UNAVAILABLE_MESSAGE.to_string());
        if existing.profile_url.is_none() {
            existing.profile_url = Some(Self::search_url_for(&candidate.name));
        }
        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_candidate() -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: "Grace Hopper".to_string(),
            email: String::new(),
            phone: String::new(),
            skills: String::new(),
            domain_knowledge: String::new(),
            academic_background: String::new(),
            years_of_experience: 0.0,
            resume_bytes: Vec::new(),
            extracted_text: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enrich_always_resolves_not_available() {
        let enricher = LinkedinEnricher::new();
        let candidate = sample_candidate();
        let existing = CandidateExternalProfile::pending(candidate.id, ExternalSource::Linkedin);

        let result = enricher.enrich(existing, &candidate).await;

        assert_eq!(result.status, ProfileStatus::NotAvailable);
        assert!(result.profile_url.unwrap().contains("Grace%20Hopper"));
    }

    #[tokio::test]
    async fn enrich_preserves_existing_profile_url() {
        let enricher = LinkedinEnricher::new();
        let candidate = sample_candidate();
        let mut existing = CandidateExternalProfile::pending(candidate.id, ExternalSource::Linkedin);
        existing.profile_url = Some("https://linkedin.com/in/ghopper".to_string());

        let result = enricher.enrich(existing, &candidate).await;

        assert_eq!(result.profile_url.as_deref(), Some("https://linkedin.com/in/ghopper"));
    }
}
