//! PostgreSQL-backed CRUD for every entity except the job queue (owned by
//! [`crate::queue`], which talks to the same database directly).

use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::migrations::MigrationRunner;
use super::models::{
    AuditStatus, Candidate, CandidateExternalProfile, CandidateMatch, ExternalSource,
    JobRequirement, MatchAudit, MatchSummary, ProcessTracker, ProfileStatus, ResumeEmbedding,
    SectionType, TrackerStatus,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migration(#[from] super::migrations::MigrationError),
}

/// PostgreSQL client for the core's data model.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the pool settings from [`crate::config::DatabaseConfig`].
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        MigrationRunner::new(self.pool.clone())
            .run_migrations()
            .await?;
        Ok(())
    }

    // ---- Candidate ----------------------------------------------------

    pub async fn insert_candidate(&self, candidate: &Candidate) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO candidate
                (id, name, email, phone, skills, domain_knowledge, academic_background,
                 years_of_experience, resume_bytes, extracted_text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.skills)
        .bind(&candidate.domain_knowledge)
        .bind(&candidate.academic_background)
        .bind(candidate.years_of_experience)
        .bind(&candidate.resume_bytes)
        .bind(&candidate.extracted_text)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_candidate(&self, id: Uuid) -> Result<Candidate, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, skills, domain_knowledge, academic_background,
                   years_of_experience, resume_bytes, extracted_text, created_at
            FROM candidate WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("candidate {id}")))?;

        Ok(Candidate {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            skills: row.get("skills"),
            domain_knowledge: row.get("domain_knowledge"),
            academic_background: row.get("academic_background"),
            years_of_experience: row.get("years_of_experience"),
            resume_bytes: row.get("resume_bytes"),
            extracted_text: row.get("extracted_text"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn list_candidates(&self) -> Result<Vec<Candidate>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, phone, skills, domain_knowledge, academic_background,
                   years_of_experience, resume_bytes, extracted_text, created_at
            FROM candidate ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
                phone: row.get("phone"),
                skills: row.get("skills"),
                domain_knowledge: row.get("domain_knowledge"),
                academic_background: row.get("academic_background"),
                years_of_experience: row.get("years_of_experience"),
                resume_bytes: row.get("resume_bytes"),
                extracted_text: row.get("extracted_text"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    // ---- ResumeEmbedding ------------------------------------------------

    /// Whole-set replace: deletes all prior embeddings for `candidate_id`, then
    /// inserts `embeddings` inside one transaction.
    pub async fn replace_embeddings(
        &self,
        candidate_id: Uuid,
        embeddings: &[ResumeEmbedding],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM resume_embedding WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;

        for embedding in embeddings {
            let vector = serde_json::to_value(&embedding.embedding)?;
            sqlx::query(
                r#"
                INSERT INTO resume_embedding (id, candidate_id, chunk, embedding, section_type, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(embedding.id)
            .bind(candidate_id)
            .bind(&embedding.chunk)
            .bind(vector)
            .bind(embedding.section_type.to_string())
            .bind(embedding.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_embeddings(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<ResumeEmbedding>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, candidate_id, chunk, embedding, section_type, created_at \
             FROM resume_embedding WHERE candidate_id = $1 ORDER BY created_at ASC",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let embedding: Vec<f32> = serde_json::from_value(row.get("embedding"))?;
                let section_type: String = row.get("section_type");
                Ok(ResumeEmbedding {
                    id: row.get("id"),
                    candidate_id: row.get("candidate_id"),
                    chunk: row.get("chunk"),
                    embedding,
                    section_type: section_type.parse().unwrap_or(SectionType::General),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    // ---- JobRequirement (read-only) ------------------------------------

    pub async fn get_job_requirement(&self, id: Uuid) -> Result<JobRequirement, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, required_skills, required_education,
                   domain_requirements, min_years, max_years, is_active, created_at
            FROM job_requirement WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("job_requirement {id}")))?;

        Ok(JobRequirement {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            required_skills: row.get("required_skills"),
            required_education: row.get("required_education"),
            domain_requirements: row.get("domain_requirements"),
            min_years: row.get("min_years"),
            max_years: row.get("max_years"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn list_active_job_requirements(&self) -> Result<Vec<JobRequirement>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, required_skills, required_education,
                   domain_requirements, min_years, max_years, is_active, created_at
            FROM job_requirement WHERE is_active = TRUE ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| JobRequirement {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                required_skills: row.get("required_skills"),
                required_education: row.get("required_education"),
                domain_requirements: row.get("domain_requirements"),
                min_years: row.get("min_years"),
                max_years: row.get("max_years"),
                is_active: row.get("is_active"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    // ---- ProcessTracker -------------------------------------------------

    pub async fn insert_tracker(&self, tracker: &ProcessTracker) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO process_tracker
                (id, status, total_files, processed_files, failed_files, message,
                 filename, correlation_id, job_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tracker.id)
        .bind(tracker.status.as_str())
        .bind(tracker.total_files)
        .bind(tracker.processed_files)
        .bind(tracker.failed_files)
        .bind(&tracker.message)
        .bind(&tracker.filename)
        .bind(&tracker.correlation_id)
        .bind(tracker.job_id)
        .bind(tracker.created_at)
        .bind(tracker.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_tracker(&self, id: Uuid) -> Result<ProcessTracker, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, total_files, processed_files, failed_files, message,
                   filename, correlation_id, job_id, created_at, updated_at
            FROM process_tracker WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("process_tracker {id}")))?;

        Ok(row_to_tracker(row))
    }

    pub async fn recent_trackers(&self, since_hours: i64) -> Result<Vec<ProcessTracker>, StorageError> {
        let since = Utc::now() - chrono::Duration::hours(since_hours);
        let rows = sqlx::query(
            r#"
            SELECT id, status, total_files, processed_files, failed_files, message,
                   filename, correlation_id, job_id, created_at, updated_at
            FROM process_tracker WHERE created_at >= $1 ORDER BY created_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_tracker).collect())
    }

    /// Apply a status transition and counters. Enforces the monotonic stage
    /// sequence only by convention of call order; the store itself does not
    /// reject out-of-order writes (matching §5: "enforced by the in-DB row
    /// state" refers to the job queue, not the tracker).
    pub async fn update_tracker(
        &self,
        id: Uuid,
        status: TrackerStatus,
        processed_delta: i32,
        failed_delta: i32,
        message: &str,
    ) -> Result<(), StorageError> {
        self.update_tracker_with_total(id, status, processed_delta, failed_delta, message, None)
            .await
    }

    /// Like [`Self::update_tracker`] but also sets `total_files` to an exact
    /// count rather than a delta, since the true fan-out size of a `.zip`
    /// upload is only known once the archive has been expanded.
    pub async fn update_tracker_with_total(
        &self,
        id: Uuid,
        status: TrackerStatus,
        processed_delta: i32,
        failed_delta: i32,
        message: &str,
        total_files: Option<i32>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE process_tracker
            SET status = $1,
                processed_files = processed_files + $2,
                failed_files = failed_files + $3,
                message = $4,
                total_files = COALESCE($5, total_files),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(status.as_str())
        .bind(processed_delta)
        .bind(failed_delta)
        .bind(message)
        .bind(total_files)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn link_tracker_job(&self, tracker_id: Uuid, job_id: Uuid) -> Result<(), StorageError> {
        sqlx::query("UPDATE process_tracker SET job_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(job_id)
            .bind(tracker_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- CandidateMatch --------------------------------------------------

    /// Upsert keyed on (candidate, job). Preserves `is_selected` across re-scores.
    pub async fn upsert_match(&self, m: &CandidateMatch) -> Result<CandidateMatch, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO candidate_match
                (id, candidate_id, job_id, match_score, skills_score, experience_score,
                 education_score, domain_score, explanation, is_shortlisted, is_selected,
                 recruiter_note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (candidate_id, job_id) DO UPDATE SET
                match_score = EXCLUDED.match_score,
                skills_score = EXCLUDED.skills_score,
                experience_score = EXCLUDED.experience_score,
                education_score = EXCLUDED.education_score,
                domain_score = EXCLUDED.domain_score,
                explanation = EXCLUDED.explanation,
                is_shortlisted = EXCLUDED.is_shortlisted OR candidate_match.is_selected,
                updated_at = NOW()
            RETURNING id, candidate_id, job_id, match_score, skills_score, experience_score,
                      education_score, domain_score, explanation, is_shortlisted, is_selected,
                      recruiter_note, created_at, updated_at
            "#,
        )
        .bind(m.id)
        .bind(m.candidate_id)
        .bind(m.job_id)
        .bind(m.match_score)
        .bind(m.skills_score)
        .bind(m.experience_score)
        .bind(m.education_score)
        .bind(m.domain_score)
        .bind(&m.explanation)
        .bind(m.is_shortlisted)
        .bind(m.is_selected)
        .bind(&m.recruiter_note)
        .bind(m.created_at)
        .bind(m.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_match(row))
    }

    pub async fn update_match_flags(
        &self,
        id: Uuid,
        is_shortlisted: Option<bool>,
        is_selected: Option<bool>,
        recruiter_note: Option<String>,
    ) -> Result<CandidateMatch, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE candidate_match
            SET is_shortlisted = COALESCE($1, is_shortlisted),
                is_selected = COALESCE($2, is_selected),
                recruiter_note = COALESCE($3, recruiter_note),
                updated_at = NOW()
            WHERE id = $4
            RETURNING id, candidate_id, job_id, match_score, skills_score, experience_score,
                      education_score, domain_score, explanation, is_shortlisted, is_selected,
                      recruiter_note, created_at, updated_at
            "#,
        )
        .bind(is_shortlisted)
        .bind(is_selected)
        .bind(recruiter_note)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("candidate_match {id}")))?;

        Ok(row_to_match(row))
    }

    pub async fn list_matches_for_job(&self, job_id: Uuid) -> Result<Vec<CandidateMatch>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, candidate_id, job_id, match_score, skills_score, experience_score,
                   education_score, domain_score, explanation, is_shortlisted, is_selected,
                   recruiter_note, created_at, updated_at
            FROM candidate_match WHERE job_id = $1 ORDER BY match_score DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_match).collect())
    }

    // ---- CandidateExternalProfile ---------------------------------------

    pub async fn get_profile(
        &self,
        candidate_id: Uuid,
        source: ExternalSource,
    ) -> Result<Option<CandidateExternalProfile>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, candidate_id, source, status, profile_url, display_name, bio, company,
                   location, public_repos, followers, repositories_summary, enriched_summary,
                   last_fetched_at, error_message
            FROM candidate_external_profile WHERE candidate_id = $1 AND source = $2
            "#,
        )
        .bind(candidate_id)
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_profile))
    }

    pub async fn list_profiles(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<CandidateExternalProfile>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, candidate_id, source, status, profile_url, display_name, bio, company,
                   location, public_repos, followers, repositories_summary, enriched_summary,
                   last_fetched_at, error_message
            FROM candidate_external_profile WHERE candidate_id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    /// Upsert keyed on (candidate, source); idempotent modulo `last_fetched_at`.
    pub async fn upsert_profile(
        &self,
        profile: &CandidateExternalProfile,
    ) -> Result<CandidateExternalProfile, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO candidate_external_profile
                (id, candidate_id, source, status, profile_url, display_name, bio, company,
                 location, public_repos, followers, repositories_summary, enriched_summary,
                 last_fetched_at, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (candidate_id, source) DO UPDATE SET
                status = EXCLUDED.status,
                profile_url = COALESCE(EXCLUDED.profile_url, candidate_external_profile.profile_url),
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                public_repos = EXCLUDED.public_repos,
                followers = EXCLUDED.followers,
                repositories_summary = EXCLUDED.repositories_summary,
                enriched_summary = EXCLUDED.enriched_summary,
                last_fetched_at = EXCLUDED.last_fetched_at,
                error_message = EXCLUDED.error_message
            RETURNING id, candidate_id, source, status, profile_url, display_name, bio, company,
                      location, public_repos, followers, repositories_summary, enriched_summary,
                      last_fetched_at, error_message
            "#,
        )
        .bind(profile.id)
        .bind(profile.candidate_id)
        .bind(profile.source.as_str())
        .bind(profile.status.as_str())
        .bind(&profile.profile_url)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.company)
        .bind(&profile.location)
        .bind(profile.public_repos)
        .bind(profile.followers)
        .bind(&profile.repositories_summary)
        .bind(&profile.enriched_summary)
        .bind(profile.last_fetched_at)
        .bind(&profile.error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_profile(row))
    }

    // ---- MatchAudit -------------------------------------------------------

    pub async fn create_audit(&self, audit: &MatchAudit) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO match_audit
                (id, job_id, job_title, status, candidates_matched, shortlisted,
                 initiated_by, initiated_at)
            VALUES ($1, $2, $3, $4, 0, 0, $5, $6)
            "#,
        )
        .bind(audit.id)
        .bind(audit.job_id)
        .bind(&audit.job_title)
        .bind(audit.status.as_str())
        .bind(&audit.initiated_by)
        .bind(audit.initiated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn complete_audit(
        &self,
        id: Uuid,
        candidates_matched: i32,
        shortlisted: i32,
        average_score: f64,
        top_score: f64,
        duration_ms: i64,
        estimated_tokens: i64,
        summaries: &[MatchSummary],
    ) -> Result<(), StorageError> {
        let summaries_json = serde_json::to_value(summaries)?;
        sqlx::query(
            r#"
            UPDATE match_audit
            SET status = $1, candidates_matched = $2, shortlisted = $3, average_score = $4,
                top_score = $5, duration_ms = $6, estimated_tokens = $7,
                candidate_summaries = $8, completed_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(AuditStatus::Completed.as_str())
        .bind(candidates_matched)
        .bind(shortlisted)
        .bind(average_score)
        .bind(top_score)
        .bind(duration_ms)
        .bind(estimated_tokens)
        .bind(summaries_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fail_audit(&self, id: Uuid, error_message: &str, duration_ms: i64) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE match_audit
            SET status = $1, error_message = $2, duration_ms = $3, completed_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(AuditStatus::Failed.as_str())
        .bind(error_message)
        .bind(duration_ms)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_audits(&self) -> Result<Vec<MatchAudit>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_id, job_title, status, candidates_matched, shortlisted, average_score,
                   top_score, duration_ms, estimated_tokens, initiated_by, initiated_at,
                   completed_at, error_message, candidate_summaries
            FROM match_audit ORDER BY initiated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_audit).collect()
    }

    pub async fn active_audits(&self) -> Result<Vec<MatchAudit>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_id, job_title, status, candidates_matched, shortlisted, average_score,
                   top_score, duration_ms, estimated_tokens, initiated_by, initiated_at,
                   completed_at, error_message, candidate_summaries
            FROM match_audit WHERE status = 'IN_PROGRESS' ORDER BY initiated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_audit).collect()
    }
}

fn row_to_tracker(row: sqlx::postgres::PgRow) -> ProcessTracker {
    let status: String = row.get("status");
    ProcessTracker {
        id: row.get("id"),
        status: status.parse().unwrap_or(TrackerStatus::Initiated),
        total_files: row.get("total_files"),
        processed_files: row.get("processed_files"),
        failed_files: row.get("failed_files"),
        message: row.get("message"),
        filename: row.get("filename"),
        correlation_id: row.get("correlation_id"),
        job_id: row.get("job_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_match(row: sqlx::postgres::PgRow) -> CandidateMatch {
    CandidateMatch {
        id: row.get("id"),
        candidate_id: row.get("candidate_id"),
        job_id: row.get("job_id"),
        match_score: row.get("match_score"),
        skills_score: row.get("skills_score"),
        experience_score: row.get("experience_score"),
        education_score: row.get("education_score"),
        domain_score: row.get("domain_score"),
        explanation: row.get("explanation"),
        is_shortlisted: row.get("is_shortlisted"),
        is_selected: row.get("is_selected"),
        recruiter_note: row.get("recruiter_note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_profile(row: sqlx::postgres::PgRow) -> CandidateExternalProfile {
    let source: String = row.get("source");
    let status: String = row.get("status");
    CandidateExternalProfile {
        id: row.get("id"),
        candidate_id: row.get("candidate_id"),
        source: source.parse().unwrap_or(ExternalSource::InternetSearch),
        status: status.parse().unwrap_or(ProfileStatus::Failed),
        profile_url: row.get("profile_url"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        company: row.get("company"),
        location: row.get("location"),
        public_repos: row.get("public_repos"),
        followers: row.get("followers"),
        repositories_summary: row.get("repositories_summary"),
        enriched_summary: row.get("enriched_summary"),
        last_fetched_at: row.get("last_fetched_at"),
        error_message: row.get("error_message"),
    }
}

fn row_to_audit(row: sqlx::postgres::PgRow) -> Result<MatchAudit, StorageError> {
    let status: String = row.get("status");
    let summaries_json: Option<serde_json::Value> = row.get("candidate_summaries");
    let candidate_summaries = summaries_json
        .map(serde_json::from_value)
        .transpose()?;

    Ok(MatchAudit {
        id: row.get("id"),
        job_id: row.get("job_id"),
        job_title: row.get("job_title"),
        status: match status.as_str() {
            "COMPLETED" => AuditStatus::Completed,
            "FAILED" => AuditStatus::Failed,
            _ => AuditStatus::InProgress,
        },
        candidates_matched: row.get("candidates_matched"),
        shortlisted: row.get("shortlisted"),
        average_score: row.get("average_score"),
        top_score: row.get("top_score"),
        duration_ms: row.get("duration_ms"),
        estimated_tokens: row.get("estimated_tokens"),
        initiated_by: row.get("initiated_by"),
        initiated_at: row.get("initiated_at"),
        completed_at: row.get("completed_at"),
        error_message: row.get("error_message"),
        candidate_summaries,
    })
}
