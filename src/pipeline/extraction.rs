//! LLM-backed résumé field extraction, and batched embedding with
//! graceful per-chunk and zero-vector fallback.

use serde::Deserialize;
use tracing::warn;

use crate::llm::{render_template, GenerationRequest, LlmClient, Message};
use crate::utils::json_extraction::extract_json_from_response;

/// Candidate fields extracted from résumé text by the analysis LLM call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedResume {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub experience_summary: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub domain_knowledge: String,
    #[serde(default)]
    pub academic_background: String,
    #[serde(default)]
    pub years_of_experience: f64,
    #[serde(default)]
    pub confidence: f64,
}

impl ExtractedResume {
    /// Used when the LLM is unreachable: the pipeline must not fail on LLM
    /// outages, so extraction always produces a row, possibly an empty one.
    pub fn fallback() -> Self {
        Self {
            name: "Unknown".to_string(),
            email: String::new(),
            phone: String::new(),
            experience_summary: String::new(),
            skills: String::new(),
            domain_knowledge: String::new(),
            academic_background: String::new(),
            years_of_experience: 0.0,
            confidence: 0.0,
        }
    }
}

/// Calls the résumé-analysis template against `resume_text`. Never returns
/// an error: any failure (request, parse, or malformed JSON) degrades to
/// [`ExtractedResume::fallback`].
pub async fn extract_resume(llm: &LlmClient, resume_text: &str) -> ExtractedResume {
    let template = &llm.templates().resume_analysis;
    let user_prompt = render_template(&template.user, &[("resume_text", resume_text)]);

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system(template.system.clone()),
            Message::user(user_prompt),
        ],
    )
    .with_temperature(0.2)
    .with_max_tokens(1200);

    let response = match llm.chat(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "résumé extraction LLM call failed, using fallback");
            return ExtractedResume::fallback();
        }
    };

    let Some(content) = response.first_content() else {
        warn!("résumé extraction LLM call returned no content, using fallback");
        return ExtractedResume::fallback();
    };

    let json = extract_json_from_response(content);
    match serde_json::from_str(&json) {
        Ok(extracted) => extracted,
        Err(e) => {
            warn!(error = %e, "failed to parse résumé extraction response, using fallback");
            ExtractedResume::fallback()
        }
    }
}

/// Requests embeddings for `chunks` in batches of `batch_size`. On batch
/// failure, retries each chunk in that batch individually; on per-chunk
/// failure, substitutes a zero vector of `dimensions` length.
pub async fn embed_chunks(
    llm: &LlmClient,
    chunks: &[String],
    batch_size: usize,
    dimensions: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size.max(1)) {
        match llm.embed(batch.to_vec()).await {
            Ok(vectors) if vectors.len() == batch.len() => embeddings.extend(vectors),
            _ => {
                for chunk in batch {
                    match llm.embed(vec![chunk.clone()]).await {
                        Ok(mut vectors) if !vectors.is_empty() => {
                            embeddings.push(vectors.remove(0));
                        }
                        _ => {
                            warn!("embedding failed for chunk, substituting zero vector");
                            embeddings.push(vec![0.0; dimensions]);
                        }
                    }
                }
            }
        }
    }

    embeddings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_extraction_has_unknown_name_and_zero_confidence() {
        let fallback = ExtractedResume::fallback();
        assert_eq!(fallback.name, "Unknown");
        assert_eq!(fallback.confidence, 0.0);
        assert_eq!(fallback.years_of_experience, 0.0);
    }

    #[test]
    fn extracted_resume_deserializes_missing_fields_to_defaults() {
        let parsed: ExtractedResume = serde_json::from_str(r#"{"name": "Ada Lovelace"}"#).unwrap();
        assert_eq!(parsed.name, "Ada Lovelace");
        assert_eq!(parsed.skills, "");
        assert_eq!(parsed.years_of_experience, 0.0);
    }

    #[tokio::test]
    async fn embed_chunks_falls_back_to_zero_vector_on_unreachable_host() {
        let llm = LlmClient::new(
            "http://127.0.0.1:1".to_string(),
            None,
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        );

        let chunks = vec!["one".to_string(), "two".to_string()];
        let embeddings = embed_chunks(&llm, &chunks, 10, 768).await;

        assert_eq!(embeddings.len(), 2);
        for vector in embeddings {
            assert_eq!(vector.len(), 768);
            assert!(vector.iter().all(|&v| v == 0.0));
        }
    }
}
