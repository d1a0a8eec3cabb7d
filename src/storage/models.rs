//! Row types for the storage adapter's entities (§3 of the data model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A candidate extracted from a résumé.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: String,
    pub domain_knowledge: String,
    pub academic_background: String,
    pub years_of_experience: f64,
    pub resume_bytes: Vec<u8>,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
}

/// Section tag assigned to a résumé chunk during chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Education,
    Experience,
    Skills,
    Projects,
    Certifications,
    General,
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionType::Education => "education",
            SectionType::Experience => "experience",
            SectionType::Skills => "skills",
            SectionType::Projects => "projects",
            SectionType::Certifications => "certifications",
            SectionType::General => "general",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SectionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "education" => SectionType::Education,
            "experience" => SectionType::Experience,
            "skills" => SectionType::Skills,
            "projects" => SectionType::Projects,
            "certifications" => SectionType::Certifications,
            _ => SectionType::General,
        })
    }
}

/// A single embedded, section-tagged chunk of résumé text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeEmbedding {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub chunk: String,
    pub embedding: Vec<f32>,
    pub section_type: SectionType,
    pub created_at: DateTime<Utc>,
}

/// A job requirement, owned by upstream CRUD; the core reads only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequirement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: String,
    pub required_education: String,
    pub domain_requirements: String,
    pub min_years: f64,
    pub max_years: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl JobRequirement {
    /// Lowercase concatenation of the text fields used for relevance ranking
    /// (§4.5 job-aware context build).
    pub fn relevance_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title, self.description, self.required_skills, self.domain_requirements
        )
        .to_lowercase()
    }
}

/// Overall status of a résumé's processing tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerStatus {
    Initiated,
    ResumeAnalyzed,
    EmbedGenerated,
    VectorDbUpdated,
    Completed,
    Failed,
}

impl TrackerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Initiated => "INITIATED",
            TrackerStatus::ResumeAnalyzed => "RESUME_ANALYZED",
            TrackerStatus::EmbedGenerated => "EMBED_GENERATED",
            TrackerStatus::VectorDbUpdated => "VECTOR_DB_UPDATED",
            TrackerStatus::Completed => "COMPLETED",
            TrackerStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackerStatus::Completed | TrackerStatus::Failed)
    }
}

impl std::str::FromStr for TrackerStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "INITIATED" => TrackerStatus::Initiated,
            "RESUME_ANALYZED" => TrackerStatus::ResumeAnalyzed,
            "EMBED_GENERATED" => TrackerStatus::EmbedGenerated,
            "VECTOR_DB_UPDATED" => TrackerStatus::VectorDbUpdated,
            "COMPLETED" => TrackerStatus::Completed,
            "FAILED" => TrackerStatus::Failed,
            _ => return Err(()),
        })
    }
}

/// User-visible aggregate record mirroring résumé-processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTracker {
    pub id: Uuid,
    pub status: TrackerStatus,
    pub total_files: i32,
    pub processed_files: i32,
    pub failed_files: i32,
    pub message: String,
    pub filename: String,
    pub correlation_id: Option<String>,
    pub job_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scored match between a candidate and a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub match_score: f64,
    pub skills_score: f64,
    pub experience_score: f64,
    pub education_score: f64,
    pub domain_score: f64,
    pub explanation: String,
    pub is_shortlisted: bool,
    pub is_selected: bool,
    pub recruiter_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Source of an external candidate profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalSource {
    Github,
    Linkedin,
    Twitter,
    InternetSearch,
}

impl ExternalSource {
    pub const ALL: [ExternalSource; 4] = [
        ExternalSource::Github,
        ExternalSource::Linkedin,
        ExternalSource::Twitter,
        ExternalSource::InternetSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalSource::Github => "GITHUB",
            ExternalSource::Linkedin => "LINKEDIN",
            ExternalSource::Twitter => "TWITTER",
            ExternalSource::InternetSearch => "INTERNET_SEARCH",
        }
    }
}

impl fmt::Display for ExternalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExternalSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "GITHUB" => ExternalSource::Github,
            "LINKEDIN" => ExternalSource::Linkedin,
            "TWITTER" => ExternalSource::Twitter,
            "INTERNET_SEARCH" => ExternalSource::InternetSearch,
            _ => return Err(()),
        })
    }
}

/// Fetch outcome for an external candidate profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileStatus {
    Pending,
    Success,
    NotFound,
    NotAvailable,
    Failed,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "PENDING",
            ProfileStatus::Success => "SUCCESS",
            ProfileStatus::NotFound => "NOT_FOUND",
            ProfileStatus::NotAvailable => "NOT_AVAILABLE",
            ProfileStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for ProfileStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PENDING" => ProfileStatus::Pending,
            "SUCCESS" => ProfileStatus::Success,
            "NOT_FOUND" => ProfileStatus::NotFound,
            "NOT_AVAILABLE" => ProfileStatus::NotAvailable,
            "FAILED" => ProfileStatus::Failed,
            _ => return Err(()),
        })
    }
}

/// One externally-fetched profile for a candidate, unique on (candidate, source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateExternalProfile {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub source: ExternalSource,
    pub status: ProfileStatus,
    pub profile_url: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub public_repos: Option<i32>,
    pub followers: Option<i32>,
    pub repositories_summary: Option<String>,
    pub enriched_summary: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CandidateExternalProfile {
    pub fn pending(candidate_id: Uuid, source: ExternalSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            source,
            status: ProfileStatus::Pending,
            profile_url: None,
            display_name: None,
            bio: None,
            company: None,
            location: None,
            public_repos: None,
            followers: None,
            repositories_summary: None,
            enriched_summary: None,
            last_fetched_at: None,
            error_message: None,
        }
    }

    /// True when this profile is a SUCCESS fetched more recently than `ttl` ago.
    pub fn is_fresh(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.status == ProfileStatus::Success
            && self
                .last_fetched_at
                .is_some_and(|ts| now - ts < ttl)
    }
}

/// Status of a batch matching audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    InProgress,
    Completed,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::InProgress => "IN_PROGRESS",
            AuditStatus::Completed => "COMPLETED",
            AuditStatus::Failed => "FAILED",
        }
    }
}

/// Per-candidate summary embedded in a completed audit (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub match_score: f64,
    pub skills_score: f64,
    pub is_shortlisted: bool,
}

/// Audit trail for a `matchAllForJob` batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAudit {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub status: AuditStatus,
    pub candidates_matched: i32,
    pub shortlisted: i32,
    pub average_score: Option<f64>,
    pub top_score: Option<f64>,
    pub duration_ms: Option<i64>,
    pub estimated_tokens: Option<i64>,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub candidate_summaries: Option<Vec<MatchSummary>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_type_round_trips_through_str() {
        for s in ["education", "experience", "skills", "projects", "certifications"] {
            let parsed: SectionType = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn unknown_section_keyword_falls_back_to_general() {
        let parsed: SectionType = "nonsense".parse().unwrap();
        assert_eq!(parsed, SectionType::General);
    }

    #[test]
    fn external_source_round_trips() {
        for src in ExternalSource::ALL {
            let parsed: ExternalSource = src.as_str().parse().unwrap();
            assert_eq!(parsed, src);
        }
    }

    #[test]
    fn profile_freshness_boundary() {
        let now = Utc::now();
        let ttl = chrono::Duration::days(7);

        let mut profile = CandidateExternalProfile::pending(Uuid::new_v4(), ExternalSource::Github);
        profile.status = ProfileStatus::Success;

        profile.last_fetched_at = Some(now - ttl - chrono::Duration::seconds(1));
        assert!(!profile.is_fresh(ttl, now));

        profile.last_fetched_at = Some(now - ttl + chrono::Duration::seconds(1));
        assert!(profile.is_fresh(ttl, now));
    }

    #[test]
    fn tracker_status_terminal_states() {
        assert!(TrackerStatus::Completed.is_terminal());
        assert!(TrackerStatus::Failed.is_terminal());
        assert!(!TrackerStatus::ResumeAnalyzed.is_terminal());
    }
}
