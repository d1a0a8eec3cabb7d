//! Microblog enricher. Requires a bearer token; without one every lookup
//! resolves `NOT_AVAILABLE` rather than guessing at an unauthenticated API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::storage::{Candidate, CandidateExternalProfile, ExternalSource, ProfileStatus};

use super::Enricher;

const TWITTER_API_BASE: &str = "https://api.twitter.com/2";
const NO_CREDENTIALS_MESSAGE: &str = "no Twitter API credentials configured";
const NO_HANDLE_MESSAGE: &str = "no Twitter profile URL or handle available for this candidate";

#[derive(Debug, Deserialize)]
struct TwitterUserResponse {
    data: Option<TwitterUserData>,
}

#[derive(Debug, Deserialize)]
struct TwitterUserData {
    name: String,
    description: Option<String>,
    location: Option<String>,
    public_metrics: Option<TwitterPublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct TwitterPublicMetrics {
    followers_count: i32,
}

pub struct TwitterEnricher {
    http_client: Client,
    bearer_token: Option<String>,
}

impl TwitterEnricher {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            bearer_token,
        }
    }

    fn handle_from_url(url: &str) -> Option<String> {
        url.split('/')
            .map(str::trim)
            .find(|segment| !segment.is_empty() && !segment.contains('.'))
            .map(|segment| segment.trim_start_matches('@').to_string())
    }
}

#[async_trait]
impl Enricher for TwitterEnricher {
    fn source(&self) -> ExternalSource {
        ExternalSource::Twitter
    }

    fn supports_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        lower.contains("twitter.com") || lower.contains("x.com")
    }

    async fn enrich(
        &self,
        mut existing: CandidateExternalProfile,
        _candidate: &Candidate,
    ) -> CandidateExternalProfile {
        let Some(token) = &self.bearer_token else {
            existing.status = ProfileStatus::NotAvailable;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some(NO_CREDENTIALS_MESSAGE.to_string());
            return existing;
        };

        let Some(handle) = existing.profile_url.as_deref().and_then(Self::handle_from_url) else {
            existing.status = ProfileStatus::NotFound;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some(NO_HANDLE_MESSAGE.to_string());
            return existing;
        };

        let url = format!("{TWITTER_API_BASE}/users/by/username/{handle}?user.fields=description,location,public_metrics");
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                existing.status = ProfileStatus::Failed;
                existing.last_fetched_at = Some(Utc::now());
                existing.error_message = Some(e.to_string());
                return existing;
            }
        };

        if !response.status().is_success() {
            existing.status = ProfileStatus::Failed;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some(format!("Twitter API returned status {}", response.status()));
            return existing;
        }

        let body: Result<TwitterUserResponse, _> = response.json().await;
        let Ok(body) = body else {
            existing.status = ProfileStatus::Failed;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some("failed to parse Twitter API response".to_string());
            return existing;
        };

        let Some(data) = body.data else {
            existing.status = ProfileStatus::NotFound;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some(format!("no Twitter user found for @{handle}"));
            return existing;
        };

        existing.status = ProfileStatus::Success;
        existing.display_name = Some(data.name);
        existing.bio = data.description;
        existing.location = data.location;
        existing.followers = data.public_metrics.map(|m| m.followers_count);
        existing.last_fetched_at = Some(Utc::now());
        existing.error_message = None;

        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_from_url_strips_leading_at() {
        assert_eq!(
            TwitterEnricher::handle_from_url("https://twitter.com/@adalovelace"),
            Some("adalovelace".to_string())
        );
        assert_eq!(
            TwitterEnricher::handle_from_url("https://x.com/adalovelace"),
            Some("adalovelace".to_string())
        );
    }

    #[test]
    fn supports_url_matches_twitter_and_x_hosts() {
        let enricher = TwitterEnricher::new(None);
        assert!(enricher.supports_url("https://twitter.com/someone"));
        assert!(enricher.supports_url("https://x.com/someone"));
        assert!(!enricher.supports_url("https://github.com/someone"));
    }
}
