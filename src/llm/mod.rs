//! LLM integration: a single HTTP client over an OpenAI-compatible API
//! exposing both chat completions and embeddings, plus the prompt
//! templates used by the résumé pipeline and matching engine.
//!
//! ```ignore
//! use resume_forge::llm::{LlmClient, Message};
//!
//! let client = LlmClient::new("https://api.openai.com/v1".into(), Some(key), "gpt-4o-mini".into(), "text-embedding-3-small".into());
//! let reply = client.chat(vec![Message::user("hello")]).await?;
//! let vectors = client.embed(vec!["chunk one".into(), "chunk two".into()]).await?;
//! ```

pub mod litellm;
pub mod templates;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LlmClient, LlmError, Message, Usage,
};
pub use templates::{render_template, PromptTemplate, PromptTemplateSet, TemplateFileError};
