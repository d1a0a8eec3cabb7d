//! Layered runtime configuration.
//!
//! A single immutable [`Config`] is loaded once at startup and passed by
//! reference to every subsystem that needs it. No ambient singleton mutation.

use std::time::Duration;
use thiserror::Error;

use crate::queue::JobKind;

/// Errors surfaced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

/// Upload intake settings.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub directory: String,
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: "./uploads".to_string(),
            allowed_extensions: vec![".pdf".into(), ".doc".into(), ".docx".into()],
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Worker scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub initial_delay: Duration,
    pub stale_threshold: Duration,
    pub stale_check_interval: Duration,
    pub cleanup_hour_local: u32,
    pub metrics_interval: Duration,
    pub batch_size: i64,
    pub worker_id: String,
    /// Job kinds the dispatch loop claims against, in priority order. The
    /// claim query takes one kind at a time, so this loop's worker only ever
    /// claims work its `JobHandler` actually routes.
    pub dispatch_kinds: Vec<JobKind>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: Duration::from_secs(5),
            initial_delay: Duration::from_secs(10),
            stale_threshold: Duration::from_secs(15 * 60),
            stale_check_interval: Duration::from_secs(60),
            cleanup_hour_local: 2,
            metrics_interval: Duration::from_secs(5 * 60),
            batch_size: 5,
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            dispatch_kinds: vec![JobKind::ResumeIngest, JobKind::ArchiveExpand],
        }
    }
}

/// Embedding request settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub batch_size: usize,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            dimensions: 768,
        }
    }
}

/// External enrichment and multi-pass matching settings.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub staleness_ttl: Duration,
    pub source_selection_enabled: bool,
    pub multi_pass_enabled: bool,
    pub borderline_min: f64,
    pub borderline_max: f64,
    pub tavily_api_key: Option<String>,
    pub github_token: Option<String>,
    pub twitter_bearer_token: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            staleness_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            source_selection_enabled: true,
            multi_pass_enabled: true,
            borderline_min: 50.0,
            borderline_max: 80.0,
            tavily_api_key: None,
            github_token: None,
            twitter_bearer_token: None,
        }
    }
}

/// Retry backoff settings for job failure handling.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: i32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(15 * 60),
            max_attempts: 3,
        }
    }
}

/// Database connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// LLM endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout: Duration,
    /// Path to a YAML file overriding the built-in prompt templates. `None`
    /// (the default) runs entirely on the compiled-in templates.
    pub templates_path: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            request_timeout: Duration::from_secs(120),
            templates_path: None,
        }
    }
}

/// Top-level immutable configuration value, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub upload: UploadConfig,
    pub scheduler: SchedulerConfig,
    pub embedding: EmbeddingConfig,
    pub enrichment: EnrichmentConfig,
    pub retry: RetryConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub log_level: String,
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), val)),
        Err(_) => Ok(None),
    }
}

fn parse_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(key.to_string(), val)),
        },
        Err(_) => Ok(None),
    }
}

fn parse_env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_env::<u64>(key)?.map(Duration::from_secs))
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// `DATABASE_URL` is the only variable that is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("UPLOAD_DIRECTORY") {
            config.upload.directory = dir;
        }
        if let Ok(exts) = std::env::var("UPLOAD_ALLOWED_EXTENSIONS") {
            config.upload.allowed_extensions =
                exts.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = parse_env::<u64>("UPLOAD_MAX_BYTES")? {
            config.upload.max_bytes = v;
        }

        if let Some(v) = parse_env_bool("SCHEDULER_ENABLED")? {
            config.scheduler.enabled = v;
        }
        if let Some(v) = parse_env_secs("SCHEDULER_POLL_INTERVAL_SECS")? {
            config.scheduler.poll_interval = v;
        }
        if let Some(v) = parse_env_secs("SCHEDULER_INITIAL_DELAY_SECS")? {
            config.scheduler.initial_delay = v;
        }
        if let Some(v) = parse_env_secs("SCHEDULER_STALE_THRESHOLD_SECS")? {
            config.scheduler.stale_threshold = v;
        }
        if let Some(v) = parse_env_secs("SCHEDULER_STALE_CHECK_INTERVAL_SECS")? {
            config.scheduler.stale_check_interval = v;
        }
        if let Some(v) = parse_env::<u32>("SCHEDULER_CLEANUP_HOUR_LOCAL")? {
            config.scheduler.cleanup_hour_local = v;
        }
        if let Some(v) = parse_env_secs("SCHEDULER_METRICS_INTERVAL_SECS")? {
            config.scheduler.metrics_interval = v;
        }
        if let Some(v) = parse_env::<i64>("SCHEDULER_BATCH_SIZE")? {
            config.scheduler.batch_size = v;
        }
        if let Ok(id) = std::env::var("SCHEDULER_WORKER_ID") {
            config.scheduler.worker_id = id;
        }

        if let Some(v) = parse_env::<usize>("EMBEDDING_BATCH_SIZE")? {
            config.embedding.batch_size = v;
        }
        if let Some(v) = parse_env::<usize>("EMBEDDING_DIMENSIONS")? {
            config.embedding.dimensions = v;
        }

        if let Some(v) = parse_env_secs("ENRICHMENT_STALENESS_TTL_DAYS")? {
            config.enrichment.staleness_ttl = v;
        }
        if let Some(v) = parse_env::<u64>("ENRICHMENT_STALENESS_TTL_DAYS")? {
            config.enrichment.staleness_ttl = Duration::from_secs(v * 24 * 60 * 60);
        }
        if let Some(v) = parse_env_bool("ENRICHMENT_SOURCE_SELECTION_ENABLED")? {
            config.enrichment.source_selection_enabled = v;
        }
        if let Some(v) = parse_env_bool("ENRICHMENT_MULTI_PASS_ENABLED")? {
            config.enrichment.multi_pass_enabled = v;
        }
        if let Some(v) = parse_env::<f64>("ENRICHMENT_MULTI_PASS_BORDERLINE_MIN")? {
            config.enrichment.borderline_min = v;
        }
        if let Some(v) = parse_env::<f64>("ENRICHMENT_MULTI_PASS_BORDERLINE_MAX")? {
            config.enrichment.borderline_max = v;
        }
        config.enrichment.tavily_api_key = std::env::var("ENRICHMENT_TAVILY_API_KEY").ok();
        config.enrichment.github_token = std::env::var("ENRICHMENT_GITHUB_TOKEN").ok();
        config.enrichment.twitter_bearer_token =
            std::env::var("ENRICHMENT_TWITTER_BEARER_TOKEN").ok();

        if let Some(v) = parse_env_secs("RETRY_BASE_BACKOFF_SECS")? {
            config.retry.base_backoff = v;
        }
        if let Some(v) = parse_env_secs("RETRY_MAX_BACKOFF_SECS")? {
            config.retry.max_backoff = v;
        }
        if let Some(v) = parse_env::<i32>("RETRY_MAX_ATTEMPTS")? {
            config.retry.max_attempts = v;
        }

        config.database.url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
        if let Some(v) = parse_env::<u32>("DATABASE_MAX_CONNECTIONS")? {
            config.database.max_connections = v;
        }
        if let Some(v) = parse_env::<u32>("DATABASE_MIN_CONNECTIONS")? {
            config.database.min_connections = v;
        }
        if let Some(v) = parse_env_secs("DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            config.database.acquire_timeout = v;
        }

        if let Ok(v) = std::env::var("LLM_API_BASE") {
            config.llm.api_base = v;
        }
        config.llm.api_key = std::env::var("LLM_API_KEY").ok();
        if let Ok(v) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = v;
        }
        if let Ok(v) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = v;
        }
        if let Some(v) = parse_env_secs("LLM_REQUEST_TIMEOUT_SECS")? {
            config.llm.request_timeout = v;
        }
        config.llm.templates_path = std::env::var("LLM_TEMPLATES_PATH").ok();

        config.log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants across the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database.url cannot be empty".to_string(),
            ));
        }
        if self.scheduler.batch_size <= 0 {
            return Err(ConfigError::ValidationFailed(
                "scheduler.batchSize must be greater than 0".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "embedding.batchSize must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.enrichment.borderline_min)
            || !(0.0..=100.0).contains(&self.enrichment.borderline_max)
            || self.enrichment.borderline_min > self.enrichment.borderline_max
        {
            return Err(ConfigError::ValidationFailed(
                "enrichment.multiPass borderline range is invalid".to_string(),
            ));
        }
        if self.retry.max_attempts < 0 {
            return Err(ConfigError::ValidationFailed(
                "retry.maxAttempts cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder method for tests: override the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database.url = url.into();
        self
    }

    /// Builder method for tests: override the LLM API base.
    pub fn with_llm_api_base(mut self, base: impl Into<String>) -> Self {
        self.llm.api_base = base.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.upload.directory, "./uploads");
        assert_eq!(config.upload.max_bytes, 50 * 1024 * 1024);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.poll_interval, Duration::from_secs(5));
        assert_eq!(config.embedding.batch_size, 10);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.enrichment.borderline_min, 50.0);
        assert_eq!(config.enrichment.borderline_max, 80.0);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn validate_rejects_empty_database_url() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_minimal_valid_config() {
        let config = Config::default().with_database_url("postgres://localhost/resume_forge");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_borderline_range() {
        let mut config = Config::default().with_database_url("postgres://localhost/x");
        config.enrichment.borderline_min = 90.0;
        config.enrichment.borderline_max = 10.0;
        assert!(config.validate().is_err());
    }
}
