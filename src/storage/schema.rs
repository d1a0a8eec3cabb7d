//! Database schema constants and SQL for the nine core tables.

/// Candidates extracted from résumés.
pub const CREATE_CANDIDATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS candidate (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL DEFAULT '',
    phone VARCHAR(64) NOT NULL DEFAULT '',
    skills TEXT NOT NULL DEFAULT '',
    domain_knowledge TEXT NOT NULL DEFAULT '',
    academic_background TEXT NOT NULL DEFAULT '',
    years_of_experience DOUBLE PRECISION NOT NULL DEFAULT 0,
    resume_bytes BYTEA NOT NULL,
    extracted_text TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Chunked, embedded résumé text.
pub const CREATE_RESUME_EMBEDDING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS resume_embedding (
    id UUID PRIMARY KEY,
    candidate_id UUID NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    chunk TEXT NOT NULL,
    embedding JSONB NOT NULL,
    section_type VARCHAR(32) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Job requirements, owned by upstream CRUD; the core only reads these.
pub const CREATE_JOB_REQUIREMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS job_requirement (
    id UUID PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    required_skills TEXT NOT NULL DEFAULT '',
    required_education TEXT NOT NULL DEFAULT '',
    domain_requirements TEXT NOT NULL DEFAULT '',
    min_years DOUBLE PRECISION NOT NULL DEFAULT 0,
    max_years DOUBLE PRECISION NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Durable job queue.
pub const CREATE_JOB_QUEUE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS job_queue (
    id UUID PRIMARY KEY,
    kind VARCHAR(64) NOT NULL,
    status VARCHAR(16) NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    file_bytes BYTEA,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    correlation_id VARCHAR(255),
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3,
    scheduled_for TIMESTAMPTZ,
    started_at TIMESTAMPTZ,
    completed_at TIMESTAMPTZ,
    heartbeat_at TIMESTAMPTZ,
    claimed_by VARCHAR(255),
    error_message TEXT,
    result JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Process trackers mirroring résumé-ingest progress.
pub const CREATE_PROCESS_TRACKER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS process_tracker (
    id UUID PRIMARY KEY,
    status VARCHAR(32) NOT NULL,
    total_files INTEGER NOT NULL DEFAULT 0,
    processed_files INTEGER NOT NULL DEFAULT 0,
    failed_files INTEGER NOT NULL DEFAULT 0,
    message TEXT NOT NULL DEFAULT '',
    filename VARCHAR(512) NOT NULL DEFAULT '',
    correlation_id VARCHAR(255),
    job_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Match between a candidate and a job, upsert-keyed on (candidate, job).
pub const CREATE_CANDIDATE_MATCH_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS candidate_match (
    id UUID PRIMARY KEY,
    candidate_id UUID NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    job_id UUID NOT NULL,
    match_score DOUBLE PRECISION NOT NULL,
    skills_score DOUBLE PRECISION NOT NULL,
    experience_score DOUBLE PRECISION NOT NULL,
    education_score DOUBLE PRECISION NOT NULL,
    domain_score DOUBLE PRECISION NOT NULL,
    explanation TEXT NOT NULL DEFAULT '',
    is_shortlisted BOOLEAN NOT NULL DEFAULT FALSE,
    is_selected BOOLEAN NOT NULL DEFAULT FALSE,
    recruiter_note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (candidate_id, job_id)
)
"#;

/// External profile fetched for a candidate, one row per (candidate, source).
pub const CREATE_CANDIDATE_EXTERNAL_PROFILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS candidate_external_profile (
    id UUID PRIMARY KEY,
    candidate_id UUID NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    source VARCHAR(32) NOT NULL,
    status VARCHAR(16) NOT NULL,
    profile_url VARCHAR(1024),
    display_name VARCHAR(255),
    bio TEXT,
    company VARCHAR(255),
    location VARCHAR(255),
    public_repos INTEGER,
    followers INTEGER,
    repositories_summary TEXT,
    enriched_summary TEXT,
    last_fetched_at TIMESTAMPTZ,
    error_message TEXT,
    UNIQUE (candidate_id, source)
)
"#;

/// Audit record for a batch matching run.
pub const CREATE_MATCH_AUDIT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS match_audit (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL,
    job_title VARCHAR(255) NOT NULL,
    status VARCHAR(16) NOT NULL,
    candidates_matched INTEGER NOT NULL DEFAULT 0,
    shortlisted INTEGER NOT NULL DEFAULT 0,
    average_score DOUBLE PRECISION,
    top_score DOUBLE PRECISION,
    duration_ms BIGINT,
    estimated_tokens BIGINT,
    initiated_by VARCHAR(255) NOT NULL,
    initiated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at TIMESTAMPTZ,
    error_message TEXT,
    candidate_summaries JSONB
)
"#;

/// Functional and uniqueness indexes supporting the claim and lookup paths.
pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_job_queue_claim
    ON job_queue(status, kind, priority DESC, created_at ASC);
CREATE INDEX IF NOT EXISTS idx_job_queue_heartbeat
    ON job_queue(heartbeat_at) WHERE status = 'PROCESSING';
CREATE INDEX IF NOT EXISTS idx_job_queue_correlation ON job_queue(correlation_id);
CREATE INDEX IF NOT EXISTS idx_process_tracker_created_at ON process_tracker(created_at);
CREATE INDEX IF NOT EXISTS idx_resume_embedding_candidate ON resume_embedding(candidate_id);
CREATE INDEX IF NOT EXISTS idx_candidate_match_job ON candidate_match(job_id);
CREATE INDEX IF NOT EXISTS idx_candidate_external_profile_candidate
    ON candidate_external_profile(candidate_id)
"#;

/// Returns all schema creation statements in dependency order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_CANDIDATE_TABLE,
        CREATE_RESUME_EMBEDDING_TABLE,
        CREATE_JOB_REQUIREMENT_TABLE,
        CREATE_JOB_QUEUE_TABLE,
        CREATE_PROCESS_TRACKER_TABLE,
        CREATE_CANDIDATE_MATCH_TABLE,
        CREATE_CANDIDATE_EXTERNAL_PROFILE_TABLE,
        CREATE_MATCH_AUDIT_TABLE,
        CREATE_INDEXES,
    ]
}

/// Table name constants.
pub mod tables {
    pub const CANDIDATE: &str = "candidate";
    pub const RESUME_EMBEDDING: &str = "resume_embedding";
    pub const JOB_REQUIREMENT: &str = "job_requirement";
    pub const JOB_QUEUE: &str = "job_queue";
    pub const PROCESS_TRACKER: &str = "process_tracker";
    pub const CANDIDATE_MATCH: &str = "candidate_match";
    pub const CANDIDATE_EXTERNAL_PROFILE: &str = "candidate_external_profile";
    pub const MATCH_AUDIT: &str = "match_audit";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_cover_all_nine_tables_plus_indexes() {
        let statements = all_schema_statements();
        assert_eq!(statements.len(), 9);
        assert!(statements[0].contains("candidate"));
        assert!(statements.last().unwrap().contains("CREATE INDEX"));
    }

    #[test]
    fn table_constants_match_schema() {
        assert_eq!(tables::CANDIDATE, "candidate");
        assert_eq!(tables::JOB_QUEUE, "job_queue");
        assert_eq!(tables::CANDIDATE_MATCH, "candidate_match");
    }
}
