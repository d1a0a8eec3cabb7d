//! LLM calls backing the matching engine: source selection and candidate
//! scoring. Neither returns an error to its caller — both degrade to a
//! documented fallback so a match row always persists.

use serde::Deserialize;
use tracing::warn;

use crate::llm::{render_template, GenerationRequest, LlmClient, Message};
use crate::storage::{Candidate, ExternalSource, JobRequirement};
use crate::utils::json_extraction::extract_json_from_response;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceSelectionResponse {
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
}

/// Asks the LLM which external sources are worth fetching before scoring.
/// Falls back to `[INTERNET_SEARCH]` on any error, empty response, or an
/// unrecognised tag anywhere in the list.
pub async fn select_sources(
    llm: &LlmClient,
    candidate: &Candidate,
    job: &JobRequirement,
) -> Vec<ExternalSource> {
    let fallback = vec![ExternalSource::InternetSearch];

    let template = &llm.templates().source_selection;
    let user_prompt = render_template(
        &template.user,
        &[
            ("job_title", &job.title),
            ("job_description", &job.description),
            ("job_required_skills", &job.required_skills),
            ("candidate_name", &candidate.name),
            ("candidate_skills", &candidate.skills),
        ],
    );

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system(template.system.clone()),
            Message::user(user_prompt),
        ],
    )
    .with_temperature(0.1)
    .with_max_tokens(300);

    let response = match llm.chat(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "source selection LLM call failed, falling back to internet search");
            return fallback;
        }
    };

    let Some(content) = response.first_content() else {
        warn!("source selection LLM call returned no content, falling back to internet search");
        return fallback;
    };

    let json = extract_json_from_response(content);
    let parsed: SourceSelectionResponse = match serde_json::from_str(&json) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "failed to parse source selection response, falling back to internet search");
            return fallback;
        }
    };

    if parsed.sources.is_empty() {
        return fallback;
    }

    let mut sources = Vec::with_capacity(parsed.sources.len());
    for tag in &parsed.sources {
        match tag.parse::<ExternalSource>() {
            Ok(source) => sources.push(source),
            Err(_) => {
                warn!(tag = %tag, "source selection returned an unrecognised tag, falling back to internet search");
                return fallback;
            }
        }
    }

    sources
}

/// Structured result of scoring one candidate against one job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub skills_score: f64,
    #[serde(default)]
    pub experience_score: f64,
    #[serde(default)]
    pub education_score: f64,
    #[serde(default)]
    pub domain_score: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

impl MatchScore {
    pub fn fallback() -> Self {
        Self {
            match_score: 0.0,
            skills_score: 0.0,
            experience_score: 0.0,
            education_score: 0.0,
            domain_score: 0.0,
            explanation: "AI matching temporarily unavailable".to_string(),
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendation: String::new(),
        }
    }

    /// Clamps every score field to `[0, 100]`. The LLM's numbers are never
    /// trusted as-is before persisting.
    fn clamp_scores(mut self) -> Self {
        self.match_score = self.match_score.clamp(0.0, 100.0);
        self.skills_score = self.skills_score.clamp(0.0, 100.0);
        self.experience_score = self.experience_score.clamp(0.0, 100.0);
        self.education_score = self.education_score.clamp(0.0, 100.0);
        self.domain_score = self.domain_score.clamp(0.0, 100.0);
        self
    }

    /// Folds strengths/gaps/recommendation into one persisted explanation,
    /// since the storage schema carries a single text field.
    pub fn full_explanation(&self) -> String {
        let mut parts = vec![self.explanation.clone()];
        if !self.strengths.is_empty() {
            parts.push(format!("Strengths: {}", self.strengths.join(", ")));
        }
        if !self.gaps.is_empty() {
            parts.push(format!("Gaps: {}", self.gaps.join(", ")));
        }
        if !self.recommendation.is_empty() {
            parts.push(format!("Recommendation: {}", self.recommendation));
        }
        parts.join("\n\n")
    }
}

/// Scores `candidate` against `job` using the external `context` (may be
/// absent). Any LLM or parse failure degrades to [`MatchScore::fallback`]
/// so the caller always has a row to persist.
pub async fn score_candidate(
    llm: &LlmClient,
    candidate: &Candidate,
    job: &JobRequirement,
    context: Option<&str>,
) -> MatchScore {
    let template = &llm.templates().candidate_matching;
    let user_prompt = render_template(
        &template.user,
        &[
            ("job_title", &job.title),
            ("job_description", &job.description),
            ("job_required_skills", &job.required_skills),
            ("job_domain_requirements", &job.domain_requirements),
            ("job_min_years", &job.min_years.to_string()),
            ("job_max_years", &job.max_years.to_string()),
            ("candidate_name", &candidate.name),
            ("candidate_skills", &candidate.skills),
            ("candidate_domain_knowledge", &candidate.domain_knowledge),
            ("candidate_academic_background", &candidate.academic_background),
            ("candidate_years_of_experience", &candidate.years_of_experience.to_string()),
            ("external_context", context.unwrap_or("No external profile information available.")),
        ],
    );

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system(template.system.clone()),
            Message::user(user_prompt),
        ],
    )
    .with_temperature(0.2)
    .with_max_tokens(2000);

    let response = match llm.chat(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "candidate matching LLM call failed, using fallback score");
            return MatchScore::fallback();
        }
    };

    let Some(content) = response.first_content() else {
        warn!("candidate matching LLM call returned no content, using fallback score");
        return MatchScore::fallback();
    };

    let json = extract_json_from_response(content);
    match serde_json::from_str::<MatchScore>(&json) {
        Ok(score) => score.clamp_scores(),
        Err(e) => {
            warn!(error = %e, "failed to parse candidate matching response, using fallback score");
            MatchScore::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_score_is_zero_with_unavailable_explanation() {
        let score = MatchScore::fallback();
        assert_eq!(score.match_score, 0.0);
        assert_eq!(score.explanation, "AI matching temporarily unavailable");
    }

    #[test]
    fn full_explanation_folds_strengths_and_gaps() {
        let score = MatchScore {
            match_score: 80.0,
            skills_score: 0.0,
            experience_score: 0.0,
            education_score: 0.0,
            domain_score: 0.0,
            explanation: "Strong fit.".to_string(),
            strengths: vec!["Rust".to_string()],
            gaps: vec!["Kubernetes".to_string()],
            recommendation: "Proceed to interview.".to_string(),
        };

        let full = score.full_explanation();
        assert!(full.contains("Strong fit."));
        assert!(full.contains("Strengths: Rust"));
        assert!(full.contains("Gaps: Kubernetes"));
        assert!(full.contains("Proceed to interview."));
    }

    #[test]
    fn match_score_deserializes_missing_fields_to_defaults() {
        let parsed: MatchScore = serde_json::from_str(r#"{"matchScore": 72}"#).unwrap();
        assert_eq!(parsed.match_score, 72.0);
        assert_eq!(parsed.skills_score, 0.0);
        assert!(parsed.strengths.is_empty());
    }

    #[test]
    fn clamp_scores_bounds_out_of_range_values_to_zero_and_hundred() {
        let score = MatchScore {
            match_score: 142.0,
            skills_score: -10.0,
            experience_score: 100.0,
            education_score: 0.0,
            domain_score: 50.0,
            explanation: String::new(),
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendation: String::new(),
        }
        .clamp_scores();

        assert_eq!(score.match_score, 100.0);
        assert_eq!(score.skills_score, 0.0);
        assert_eq!(score.experience_score, 100.0);
        assert_eq!(score.domain_score, 50.0);
    }
}
