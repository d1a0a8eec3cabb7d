//! Web-search enricher. Never matches a URL directly — it's the catch-all
//! source a candidate gets researched through when no social profile links
//! exist. Falls back to a summary synthesized from the candidate's own
//! extracted fields whenever the search API is unavailable or unhelpful.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::storage::{Candidate, CandidateExternalProfile, ExternalSource, ProfileStatus};

use super::Enricher;

const SEARCH_API_BASE: &str = "https://api.tavily.com/search";
const MIN_USEFUL_ANSWER_LEN: usize = 100;
const MAX_SNIPPET_LEN: usize = 300;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: String,
    max_results: u32,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    content: Option<String>,
}

pub struct WebSearchEnricher {
    http_client: Client,
    api_key: Option<String>,
}

impl WebSearchEnricher {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
        }
    }

    fn fallback_summary(candidate: &Candidate) -> String {
        format!(
            "No web search results available. Based on résumé: {} with background in {}, {:.1} years of experience.",
            candidate.skills, candidate.domain_knowledge, candidate.years_of_experience
        )
    }

    fn primary_skill(skills: &str) -> &str {
        skills.split(',').next().unwrap_or(skills).trim()
    }

    fn truncate(text: &str, max_len: usize) -> String {
        if text.len() <= max_len {
            text.to_string()
        } else {
            format!("{}...", &text[..max_len])
        }
    }

    async fn run_search(&self, candidate: &Candidate) -> Option<String> {
        let api_key = self.api_key.as_ref()?;

        let query = format!(
            "{} {} software developer professional profile",
            candidate.name,
            Self::primary_skill(&candidate.skills)
        );

        let request = SearchRequest {
            api_key,
            query,
            max_results: 5,
            include_answer: true,
        };

        let response = self
            .http_client
            .post(SEARCH_API_BASE)
            .json(&request)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: SearchResponse = response.json().await.ok()?;

        let mut parts = Vec::new();
        if let Some(answer) = &body.answer {
            parts.push(answer.clone());
        }
        for result in body.results.iter().take(3) {
            if let Some(content) = &result.content {
                parts.push(Self::truncate(content, MAX_SNIPPET_LEN));
            }
        }

        let combined = parts.join("\n\n");
        if combined.len() < MIN_USEFUL_ANSWER_LEN {
            None
        } else {
            Some(combined)
        }
    }
}

#[async_trait]
impl Enricher for WebSearchEnricher {
    fn source(&self) -> ExternalSource {
        ExternalSource::InternetSearch
    }

    fn supports_url(&self, _url: &str) -> bool {
        false
    }

    async fn enrich(
        &self,
        mut existing: CandidateExternalProfile,
        candidate: &Candidate,
    ) -> CandidateExternalProfile {
        let summary = match self.run_search(candidate).await {
            Some(summary) => summary,
            None => Self::fallback_summary(candidate),
        };

        existing.status = ProfileStatus::Success;
        existing.enriched_summary = Some(summary);
        existing.last_fetched_at = Some(Utc::now());
        existing.error_message = None;
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
            name: "Ada Lovelace".to_string(),
            email: String::new(),
            phone: String::new(),
            skills: "Rust, distributed systems".to_string(),
            domain_knowledge: "compilers".to_string(),
            academic_background: String::new(),
            years_of_experience: 6.0,
            resume_bytes: Vec::new(),
            extracted_text: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn primary_skill_takes_first_comma_separated_token() {
        assert_eq!(WebSearchEnricher::primary_skill("Rust, Go, Python"), "Rust");
        assert_eq!(WebSearchEnricher::primary_skill("Rust"), "Rust");
    }

    #[tokio::test]
    async fn enrich_without_api_key_falls_back_to_resume_summary() {
        let enricher = WebSearchEnricher::new(None);
        let candidate = sample_candidate();
        let existing = CandidateExternalProfile::pending(candidate.id, ExternalSource::InternetSearch);

        let result = enricher.enrich(existing, &candidate).await;

        assert_eq!(result.status, ProfileStatus::Success);
        assert!(result.enriched_summary.unwrap().contains("No web search results available"));
    }

    #[test]
    fn supports_url_never_matches() {
        let enricher = WebSearchEnricher::new(None);
        assert!(!enricher.supports_url("https://anything.example"));
    }
}
