//! Orchestrates the registered [`Enricher`]s: routes single-source and
//! URL-driven requests, tracks staleness, and builds the context strings
//! the matching engine feeds to the LLM.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::storage::{
    Candidate, CandidateExternalProfile, Database, ExternalSource, JobRequirement, ProfileStatus,
};

use super::{EnrichmentError, EnricherRegistry};

const CONTEXT_HEADER: &str = "--- External Profile Information ---";
const JOB_AWARE_SUFFIX: &str = "(ranked by job relevance)";

const GITHUB_KEYWORDS: &[&str] = &[
    "developer", "engineer", "software", "coding", "code", "github", "open source", "backend",
    "frontend", "fullstack", "java", "python", "javascript", "typescript", "golang", "rust",
];

const TWITTER_KEYWORDS: &[&str] = &[
    "social", "community", "advocate", "evangelist", "content", "marketing", "brand", "speaker",
    "influencer", "developer relations",
];

/// Stable ordering tiebreaker matching `ExternalSource::ALL`'s declaration order.
fn source_rank(source: ExternalSource) -> usize {
    ExternalSource::ALL
        .iter()
        .position(|s| *s == source)
        .unwrap_or(usize::MAX)
}

fn job_relevance_score(source: ExternalSource, job_text: &str) -> i32 {
    match source {
        ExternalSource::Github => {
            if GITHUB_KEYWORDS.iter().any(|kw| job_text.contains(kw)) {
                3
            } else {
                1
            }
        }
        ExternalSource::Twitter => {
            if TWITTER_KEYWORDS.iter().any(|kw| job_text.contains(kw)) {
                3
            } else {
                0
            }
        }
        ExternalSource::Linkedin => 2,
        ExternalSource::InternetSearch => 1,
    }
}

pub struct ProfileEnrichmentService {
    db: Arc<Database>,
    registry: EnricherRegistry,
    staleness_ttl: chrono::Duration,
}

impl ProfileEnrichmentService {
    pub fn new(db: Arc<Database>, registry: EnricherRegistry, staleness_ttl: StdDuration) -> Self {
        let staleness_ttl = chrono::Duration::from_std(staleness_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        Self {
            db,
            registry,
            staleness_ttl,
        }
    }

    pub async fn enrich(
        &self,
        candidate_id: Uuid,
        source: ExternalSource,
    ) -> Result<CandidateExternalProfile, EnrichmentError> {
        let candidate = self.db.get_candidate(candidate_id).await?;
        let enricher = self
            .registry
            .get(source)
            .ok_or(EnrichmentError::NoEnricher(source))?;

        let existing = match self.db.get_profile(candidate_id, source).await? {
            Some(profile) => profile,
            None => {
                let pending = CandidateExternalProfile::pending(candidate_id, source);
                self.db.upsert_profile(&pending).await?
            }
        };

        let enriched = enricher.enrich(existing, &candidate).await;
        Ok(self.db.upsert_profile(&enriched).await?)
    }

    pub async fn enrich_from_url(
        &self,
        candidate_id: Uuid,
        url: &str,
    ) -> Result<Option<CandidateExternalProfile>, EnrichmentError> {
        let Some(enricher) = self.registry.find_by_url(url) else {
            return Ok(None);
        };
        let candidate = self.db.get_candidate(candidate_id).await?;
        let source = enricher.source();

        let mut existing = match self.db.get_profile(candidate_id, source).await? {
            Some(profile) => profile,
            None => CandidateExternalProfile::pending(candidate_id, source),
        };
        existing.profile_url = Some(url.to_string());

        let enriched = enricher.enrich(existing, &candidate).await;
        Ok(Some(self.db.upsert_profile(&enriched).await?))
    }

    pub async fn refresh(
        &self,
        candidate_id: Uuid,
        source: ExternalSource,
    ) -> Result<CandidateExternalProfile, EnrichmentError> {
        self.enrich(candidate_id, source).await
    }

    pub async fn get_profiles(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<CandidateExternalProfile>, EnrichmentError> {
        Ok(self.db.list_profiles(candidate_id).await?)
    }

    pub async fn build_context(&self, candidate_id: Uuid) -> Result<Option<String>, EnrichmentError> {
        let profiles = self.successful_profiles(candidate_id).await?;
        Ok(render_context(&profiles, CONTEXT_HEADER))
    }

    pub async fn build_context_for_job(
        &self,
        candidate_id: Uuid,
        job: &JobRequirement,
    ) -> Result<Option<String>, EnrichmentError> {
        let mut profiles = self.successful_profiles(candidate_id).await?;
        let job_text = job.relevance_text().to_lowercase();

        profiles.sort_by_key(|p| (Reverse(job_relevance_score(p.source, &job_text)), source_rank(p.source)));

        let header = format!("{CONTEXT_HEADER} {JOB_AWARE_SUFFIX}");
        Ok(render_context(&profiles, &header))
    }

    async fn successful_profiles(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<CandidateExternalProfile>, EnrichmentError> {
        Ok(self
            .db
            .list_profiles(candidate_id)
            .await?
            .into_iter()
            .filter(|p| p.status == ProfileStatus::Success)
            .collect())
    }

    pub async fn refresh_stale_profiles(&self, candidate: &Candidate) {
        let profiles = match self.db.list_profiles(candidate.id).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(candidate_id = %candidate.id, error = %e, "failed to list profiles for staleness check");
                return;
            }
        };

        let now = Utc::now();
        for profile in profiles {
            if profile.status != ProfileStatus::Success {
                continue;
            }
            if profile.is_fresh(self.staleness_ttl, now) {
                continue;
            }
            if let Err(e) = self.enrich(candidate.id, profile.source).await {
                warn!(candidate_id = %candidate.id, source = ?profile.source, error = %e, "failed to refresh stale profile");
            }
        }
    }

    pub async fn ensure_internet_search_fresh(&self, candidate: &Candidate) {
        let existing = match self.db.get_profile(candidate.id, ExternalSource::InternetSearch).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(candidate_id = %candidate.id, error = %e, "failed to load internet-search profile");
                return;
            }
        };

        let needs_refresh = match &existing {
            None => true,
            Some(profile) => {
                profile.status != ProfileStatus::Success
                    || !profile.is_fresh(self.staleness_ttl, Utc::now())
            }
        };

        if needs_refresh {
            if let Err(e) = self.enrich(candidate.id, ExternalSource::InternetSearch).await {
                warn!(candidate_id = %candidate.id, error = %e, "failed to ensure internet-search freshness");
            }
        }
    }

    /// Enriches every listed source that isn't already a fresh success,
    /// one independent fetch per source, run concurrently.
    pub async fn auto_enrich(&self, candidate: &Candidate, sources: &[ExternalSource]) {
        let tasks = sources.iter().map(|&source| self.auto_enrich_one(candidate, source));
        futures::future::join_all(tasks).await;
    }

    async fn auto_enrich_one(&self, candidate: &Candidate, source: ExternalSource) {
        let existing = match self.db.get_profile(candidate.id, source).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(candidate_id = %candidate.id, source = ?source, error = %e, "failed to load profile for auto-enrich");
                return;
            }
        };

        let is_fresh_success = existing
            .as_ref()
            .map(|p| p.status == ProfileStatus::Success && p.is_fresh(self.staleness_ttl, Utc::now()))
            .unwrap_or(false);

        if is_fresh_success {
            return;
        }

        if let Err(e) = self.enrich(candidate.id, source).await {
            warn!(candidate_id = %candidate.id, source = ?source, error = %e, "auto-enrich failed");
        }
    }
}

fn render_context(profiles: &[CandidateExternalProfile], header: &str) -> Option<String> {
    if profiles.is_empty() {
        return None;
    }

    let mut blocks = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let mut lines = vec![format!("[Source: {:?}]", profile.source)];

        if let Some(url) = &profile.profile_url {
            lines.push(format!("Profile URL: {url}"));
        }
        if let Some(bio) = &profile.bio {
            lines.push(format!("Bio: {bio}"));
        }
        if let Some(company) = &profile.company {
            lines.push(format!("Company: {company}"));
        }
        if let Some(location) = &profile.location {
            lines.push(format!("Location: {location}"));
        }
        if let Some(public_repos) = profile.public_repos {
            lines.push(format!("Public Repos: {public_repos}"));
        }
        if let Some(followers) = profile.followers {
            lines.push(format!("Followers: {followers}"));
        }
        if let Some(summary) = &profile.enriched_summary {
            lines.push(format!("Summary: {summary}"));
        }
        if let Some(top_projects) = &profile.repositories_summary {
            lines.push(format!("Top Projects: {top_projects}"));
        }

        blocks.push(lines.join("\n"));
    }

    Some(format!("{header}\n\n{}", blocks.join("\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_relevance_favors_github_for_engineering_job_text() {
        assert_eq!(job_relevance_score(ExternalSource::Github, "senior software engineer"), 3);
        assert_eq!(job_relevance_score(ExternalSource::Github, "sales representative"), 1);
    }

    #[test]
    fn job_relevance_favors_twitter_for_advocacy_job_text() {
        assert_eq!(
            job_relevance_score(ExternalSource::Twitter, "developer relations advocate"),
            3
        );
        assert_eq!(job_relevance_score(ExternalSource::Twitter, "backend engineer"), 0);
    }

    #[test]
    fn linkedin_and_internet_search_scores_are_constant() {
        assert_eq!(job_relevance_score(ExternalSource::Linkedin, "anything"), 2);
        assert_eq!(job_relevance_score(ExternalSource::InternetSearch, "anything"), 1);
    }

    #[test]
    fn render_context_returns_none_for_empty_profiles() {
        assert_eq!(render_context(&[], CONTEXT_HEADER), None);
    }

    #[test]
    fn render_context_includes_present_fields_only() {
        let mut profile = CandidateExternalProfile::pending(Uuid::new_v4(), ExternalSource::Github);
        profile.status = ProfileStatus::Success;
        profile.bio = Some("Builds things".to_string());

        let rendered = render_context(&[profile], CONTEXT_HEADER).unwrap();
        assert!(rendered.starts_with(CONTEXT_HEADER));
        assert!(rendered.contains("[Source: Github]"));
        assert!(rendered.contains("Bio: Builds things"));
        assert!(!rendered.contains("Company:"));
    }
}
