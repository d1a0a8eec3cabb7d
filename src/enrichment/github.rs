//! Code-hosting enricher: resolves a login from a profile URL or a
//! normalized-name user search, then fetches profile details and top
//! repositories by star count.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::storage::{Candidate, CandidateExternalProfile, ExternalSource, ProfileStatus};

use super::{split_name, Enricher};

const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubUserSearchResponse {
    items: Vec<GithubUserSearchItem>,
}

#[derive(Debug, Deserialize)]
struct GithubUserSearchItem {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    location: Option<String>,
    blog: Option<String>,
    public_repos: i32,
    followers: i32,
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    stargazers_count: i32,
}

pub struct GithubEnricher {
    http_client: Client,
    token: Option<String>,
}

impl GithubEnricher {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            token,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "resume-forge/1.0")
            .header("X-GitHub-Api-Version", "2022-11-28");

        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    fn login_from_url(url: &str) -> Option<String> {
        url.split('/')
            .map(str::trim)
            .find(|segment| !segment.is_empty() && *segment != "github.com")
            .filter(|segment| !segment.contains('.'))
            .map(str::to_string)
    }

    async fn resolve_login(&self, profile_url: Option<&str>, candidate: &Candidate) -> Option<String> {
        if let Some(login) = profile_url.and_then(Self::login_from_url) {
            return Some(login);
        }

        let (first, last) = split_name(&candidate.name);
        if first.is_empty() {
            return None;
        }

        let query = format!("{first} {last} in:fullname").trim().to_string();
        let url = format!("{GITHUB_API_BASE}/search/users");

        let response = self
            .authorize(self.http_client.get(&url).query(&[("q", query.as_str())]))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }

        let body: GithubUserSearchResponse = response.json().await.ok()?;
        body.items.into_iter().next().map(|item| item.login)
    }

    async fn fetch_user(&self, login: &str) -> Result<GithubUser, String> {
        let url = format!("{GITHUB_API_BASE}/users/{login}");
        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err("rate limited by GitHub API".to_string());
        }
        if !status.is_success() {
            return Err(format!("GitHub API returned status {status}"));
        }

        response.json().await.map_err(|e| e.to_string())
    }

    async fn fetch_top_repos(&self, login: &str) -> Vec<GithubRepo> {
        let url = format!("{GITHUB_API_BASE}/users/{login}/repos?per_page=100");
        let Ok(response) = self.authorize(self.http_client.get(&url)).send().await else {
            return Vec::new();
        };
        if !response.status().is_success() {
            return Vec::new();
        }
        let Ok(mut repos): Result<Vec<GithubRepo>, _> = response.json().await else {
            return Vec::new();
        };

        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
        repos.truncate(5);
        repos
    }
}

#[async_trait]
impl Enricher for GithubEnricher {
    fn source(&self) -> ExternalSource {
        ExternalSource::Github
    }

    fn supports_url(&self, url: &str) -> bool {
        url.to_lowercase().contains("github.com")
    }

    async fn enrich(
        &self,
        mut existing: CandidateExternalProfile,
        candidate: &Candidate,
    ) -> CandidateExternalProfile {
        let Some(login) = self
            .resolve_login(existing.profile_url.as_deref(), candidate)
            .await
        else {
            existing.status = ProfileStatus::NotFound;
            existing.last_fetched_at = Some(Utc::now());
            existing.error_message = Some("could not resolve a GitHub login".to_string());
            return existing;
        };

        let user = match self.fetch_user(&login).await {
            Ok(user) => user,
            Err(message) => {
                existing.status = ProfileStatus::Failed;
                existing.last_fetched_at = Some(Utc::now());
                existing.error_message = Some(message);
                return existing;
            }
        };

        let top_repos = self.fetch_top_repos(&login).await;
        let top_projects = top_repos
            .iter()
            .map(|r| r.name.clone())
            .collect::<Vec<_>>()
            .join(", ");

        let summary = format!(
            "GitHub: @{} — {} repos, {} followers. Blog: {}. Top projects: {}.",
            user.login,
            user.public_repos,
            user.followers,
            user.blog.clone().unwrap_or_else(|| "none".to_string()),
            if top_projects.is_empty() {
                "none".to_string()
            } else {
                top_projects.clone()
            }
        );

        existing.status = ProfileStatus::Success;
        existing.profile_url = Some(format!("https://github.com/{}", user.login));
        existing.display_name = user.name.or(Some(user.login));
        existing.bio = user.bio;
        existing.company = user.company;
        existing.location = user.location;
        existing.public_repos = Some(user.public_repos);
        existing.followers = Some(user.followers);
        existing.repositories_summary = if top_projects.is_empty() {
            None
        } else {
            Some(top_projects)
        };
        existing.enriched_summary = Some(summary);
        existing.last_fetched_at = Some(Utc::now());
        existing.error_message = None;

        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_from_url_extracts_path_segment() {
        assert_eq!(
            GithubEnricher::login_from_url("https://github.com/octocat"),
            Some("octocat".to_string())
        );
        assert_eq!(
            GithubEnricher::login_from_url("https://github.com/octocat/hello-world"),
            Some("octocat".to_string())
        );
    }

    #[test]
    fn supports_url_matches_github_host_case_insensitively() {
        let enricher = GithubEnricher::new(None);
        assert!(enricher.supports_url("https://GITHUB.com/octocat"));
        assert!(!enricher.supports_url("https://gitlab.com/octocat"));
    }
}
