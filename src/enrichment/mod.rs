//! External profile enrichment: a strategy interface per source
//! (code-hosting, professional network, microblog, web search) behind a
//! registry, plus the service that routes, computes staleness and builds
//! job-aware context strings for the matching engine.
//!
//! Adding a source requires a new [`crate::storage::ExternalSource`] value,
//! a new [`Enricher`] impl registered in [`registry::EnricherRegistry`], and
//! nothing else — the service discovers enrichers by iterating the
//! registered set.

pub mod github;
pub mod linkedin;
pub mod registry;
pub mod service;
pub mod twitter;
pub mod websearch;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::{Candidate, CandidateExternalProfile, ExternalSource};

pub use github::GithubEnricher;
pub use linkedin::LinkedinEnricher;
pub use registry::EnricherRegistry;
pub use service::ProfileEnrichmentService;
pub use twitter::TwitterEnricher;
pub use websearch::WebSearchEnricher;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("no enricher registered for source {0:?}")]
    NoEnricher(ExternalSource),
}

/// Strategy interface for one external profile source. Implementations
/// must never propagate an error past [`Enricher::enrich`]: every failure
/// is caught and recorded as a `FAILED` profile row.
#[async_trait]
pub trait Enricher: Send + Sync {
    fn source(&self) -> ExternalSource;

    /// True if this enricher recognises `url`'s host. `INTERNET_SEARCH`
    /// never matches a URL.
    fn supports_url(&self, url: &str) -> bool;

    /// Fetches and persists the profile, returning the final row. Always
    /// sets `status` and `last_fetched_at`; never returns `Err`.
    async fn enrich(
        &self,
        existing: CandidateExternalProfile,
        candidate: &Candidate,
    ) -> CandidateExternalProfile;
}

/// Splits a free-text name into (first, last) tokens for user-search
/// lookups. Falls back to the whole name as "first" when there's no space.
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.next().unwrap_or("").to_string();
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_handles_single_and_multi_token_names() {
        assert_eq!(split_name("Ada Lovelace"), ("Ada".to_string(), "Lovelace".to_string()));
        assert_eq!(split_name("Cher"), ("Cher".to_string(), "".to_string()));
        assert_eq!(split_name(""), ("".to_string(), "".to_string()));
    }
}
