//! Produces a [`CandidateMatch`] per (candidate, job) pair via the six-step
//! loop, and wraps batch runs over a job's candidates in a [`MatchAudit`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::EnrichmentConfig;
use crate::enrichment::ProfileEnrichmentService;
use crate::llm::LlmClient;
use crate::storage::{Candidate, CandidateMatch, Database, JobRequirement, MatchAudit, MatchSummary};

use super::scoring::{score_candidate, select_sources, MatchScore};
use super::MatchingError;

const AUTO_SHORTLIST_THRESHOLD: f64 = 70.0;
const TOKENS_PER_CANDIDATE: i64 = 1500;

pub struct MatchingEngine {
    db: Arc<Database>,
    llm: Arc<LlmClient>,
    enrichment: Arc<ProfileEnrichmentService>,
    config: EnrichmentConfig,
}

impl MatchingEngine {
    pub fn new(
        db: Arc<Database>,
        llm: Arc<LlmClient>,
        enrichment: Arc<ProfileEnrichmentService>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            db,
            llm,
            enrichment,
            config,
        }
    }

    /// Runs the single-pair loop for one candidate against one job and
    /// upserts the resulting `CandidateMatch`.
    pub async fn match_candidate(
        &self,
        candidate: &Candidate,
        job: &JobRequirement,
    ) -> Result<CandidateMatch, MatchingError> {
        self.enrichment.refresh_stale_profiles(candidate).await;
        self.enrichment.ensure_internet_search_fresh(candidate).await;

        if self.config.source_selection_enabled {
            let sources = select_sources(&self.llm, candidate, job).await;
            self.enrichment.auto_enrich(candidate, &sources).await;
        }

        let first_context = self.enrichment.build_context_for_job(candidate.id, job).await?;
        let mut score = score_candidate(&self.llm, candidate, job, first_context.as_deref()).await;

        if self.config.multi_pass_enabled
            && first_context.is_none()
            && score.match_score >= self.config.borderline_min
            && score.match_score <= self.config.borderline_max
        {
            let second_context = self.enrichment.build_context_for_job(candidate.id, job).await?;
            score = score_candidate(&self.llm, candidate, job, second_context.as_deref()).await;
        }

        self.persist_match(candidate.id, job.id, &score).await
    }

    async fn persist_match(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        score: &MatchScore,
    ) -> Result<CandidateMatch, MatchingError> {
        let now = Utc::now();
        let shortlisted = score.match_score >= AUTO_SHORTLIST_THRESHOLD;

        let m = CandidateMatch {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            match_score: score.match_score,
            skills_score: score.skills_score,
            experience_score: score.experience_score,
            education_score: score.education_score,
            domain_score: score.domain_score,
            explanation: score.full_explanation(),
            is_shortlisted: shortlisted,
            is_selected: false,
            recruiter_note: None,
            created_at: now,
            updated_at: now,
        };

        Ok(self.db.upsert_match(&m).await?)
    }

    /// Runs `matchAllForJob`: creates an IN_PROGRESS audit synchronously,
    /// scores every candidate (logging and skipping per-candidate errors),
    /// then completes or fails the audit asynchronously so the batch loop
    /// is never blocked on writing the audit's terminal state.
    pub async fn match_all_for_job(
        self: &Arc<Self>,
        job_id: Uuid,
        initiated_by: Option<String>,
    ) -> Result<Uuid, MatchingError> {
        let job = self.db.get_job_requirement(job_id).await?;
        let candidates = self.db.list_candidates().await?;

        let audit = MatchAudit {
            id: Uuid::new_v4(),
            job_id,
            job_title: job.title.clone(),
            status: crate::storage::AuditStatus::InProgress,
            candidates_matched: 0,
            shortlisted: 0,
            average_score: None,
            top_score: None,
            duration_ms: None,
            estimated_tokens: None,
            initiated_by: initiated_by.unwrap_or_else(|| "system".to_string()),
            initiated_at: Utc::now(),
            completed_at: None,
            error_message: None,
            candidate_summaries: None,
        };
        self.db.create_audit(&audit).await?;

        let engine = Arc::clone(self);
        let audit_id = audit.id;
        tokio::spawn(async move {
            let started = Instant::now();
            let result = engine.run_batch(&job, &candidates).await;
            let duration_ms = started.elapsed().as_millis() as i64;

            match result {
                Ok((matches, summaries)) => {
                    let total = matches.len() as i32;
                    let shortlisted = matches.iter().filter(|m| m.is_shortlisted).count() as i32;
                    let average = if matches.is_empty() {
                        0.0
                    } else {
                        matches.iter().map(|m| m.match_score).sum::<f64>() / matches.len() as f64
                    };
                    let top = matches
                        .iter()
                        .map(|m| m.match_score)
                        .fold(0.0_f64, f64::max);
                    let estimated_tokens = total as i64 * TOKENS_PER_CANDIDATE;

                    if let Err(e) = engine
                        .db
                        .complete_audit(audit_id, total, shortlisted, average, top, duration_ms, estimated_tokens, &summaries)
                        .await
                    {
                        error!(audit_id = %audit_id, error = %e, "failed to write completed match audit");
                    }
                }
                Err(e) => {
                    error!(audit_id = %audit_id, error = %e, "match batch failed");
                    if let Err(write_err) = engine.db.fail_audit(audit_id, &e.to_string(), duration_ms).await {
                        error!(audit_id = %audit_id, error = %write_err, "failed to write failed match audit");
                    }
                }
            }
        });

        Ok(audit_id)
    }

    async fn run_batch(
        &self,
        job: &JobRequirement,
        candidates: &[Candidate],
    ) -> Result<(Vec<CandidateMatch>, Vec<MatchSummary>), MatchingError> {
        let mut matches = Vec::with_capacity(candidates.len());
        let mut summaries = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.match_candidate(candidate, job).await {
                Ok(m) => {
                    summaries.push(MatchSummary {
                        candidate_id: candidate.id,
                        candidate_name: candidate.name.clone(),
                        match_score: m.match_score,
                        skills_score: m.skills_score,
                        is_shortlisted: m.is_shortlisted,
                    });
                    matches.push(m);
                }
                Err(e) => {
                    warn!(candidate_id = %candidate.id, job_id = %job.id, error = %e, "skipping candidate after match failure");
                }
            }
        }

        Ok((matches, summaries))
    }

    /// Scores `candidate` against every currently-active job, logging and
    /// skipping per-job failures. Returns the successful matches.
    pub async fn match_candidate_against_active_jobs(
        &self,
        candidate: &Candidate,
    ) -> Result<Vec<CandidateMatch>, MatchingError> {
        let active_jobs = self.db.list_active_job_requirements().await?;
        let mut matches = Vec::with_capacity(active_jobs.len());

        for job in &active_jobs {
            match self.match_candidate(candidate, job).await {
                Ok(m) => matches.push(m),
                Err(e) => {
                    warn!(candidate_id = %candidate.id, job_id = %job.id, error = %e, "skipping job after match failure");
                }
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_shortlist_threshold_is_seventy() {
        assert_eq!(AUTO_SHORTLIST_THRESHOLD, 70.0);
    }
}
