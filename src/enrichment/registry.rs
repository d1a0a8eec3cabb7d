//! Registry of built-in enrichers, indexed by [`ExternalSource`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::ExternalSource;

use super::Enricher;

/// Holds every registered enricher, built once at startup.
pub struct EnricherRegistry {
    enrichers: HashMap<ExternalSource, Arc<dyn Enricher>>,
}

impl EnricherRegistry {
    pub fn new() -> Self {
        Self {
            enrichers: HashMap::new(),
        }
    }

    pub fn register(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.insert(enricher.source(), enricher);
        self
    }

    pub fn get(&self, source: ExternalSource) -> Option<Arc<dyn Enricher>> {
        self.enrichers.get(&source).cloned()
    }

    /// First enricher whose `supports_url` matches, if any.
    pub fn find_by_url(&self, url: &str) -> Option<Arc<dyn Enricher>> {
        ExternalSource::ALL
            .iter()
            .filter_map(|source| self.enrichers.get(source))
            .find(|e| e.supports_url(url))
            .cloned()
    }

    pub fn sources(&self) -> impl Iterator<Item = &ExternalSource> {
        self.enrichers.keys()
    }
}

impl Default for EnricherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Candidate, CandidateExternalProfile};
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct StubEnricher(ExternalSource);

    #[async_trait]
    impl Enricher for StubEnricher {
        fn source(&self) -> ExternalSource {
            self.0
        }

        fn supports_url(&self, url: &str) -> bool {
            url.contains("stub.example")
        }

        async fn enrich(
            &self,
            existing: CandidateExternalProfile,
            _candidate: &Candidate,
        ) -> CandidateExternalProfile {
            existing
        }
    }

    fn sample_candidate() -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
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

    #[test]
    fn registry_looks_up_by_source() {
        let registry = EnricherRegistry::new().register(Arc::new(StubEnricher(ExternalSource::Github)));
        assert!(registry.get(ExternalSource::Github).is_some());
        assert!(registry.get(ExternalSource::Twitter).is_none());
    }

    #[test]
    fn registry_finds_by_url() {
        let registry = EnricherRegistry::new().register(Arc::new(StubEnricher(ExternalSource::Github)));
        assert!(registry.find_by_url("https://stub.example/user").is_some());
        assert!(registry.find_by_url("https://unrelated.example").is_none());
    }

    #[tokio::test]
    async fn stub_enricher_round_trips_existing_profile() {
        let enricher = StubEnricher(ExternalSource::Github);
        let candidate = sample_candidate();
        let existing = CandidateExternalProfile::pending(candidate.id, ExternalSource::Github);
        let result = enricher.enrich(existing.clone(), &candidate).await;
        assert_eq!(result.candidate_id, existing.candidate_id);
    }
}
