//! CLI command definitions for resume-forge.
//!
//! A thin operational harness over the core's async service methods: start
//! the background scheduler, run a résumé through the pipeline, trigger a
//! batch or single match, check ingest status, or run migrations. No
//! HTTP/GraphQL surface is implemented here.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::enrichment::{EnricherRegistry, GithubEnricher, LinkedinEnricher, ProfileEnrichmentService, TwitterEnricher, WebSearchEnricher};
use crate::llm::{LlmClient, PromptTemplateSet};
use crate::matching::MatchingEngine;
use crate::pipeline::{parser, PipelineRunner, RoutingJobHandler};
use crate::queue::{JobKind, JobQueue, NewJob};
use crate::scheduler::{JobHandler, Scheduler};
use crate::storage::{Database, ProcessTracker, TrackerStatus};

/// Agentic résumé ingestion, embedding, and job-matching pipeline.
#[derive(Parser)]
#[command(name = "resume-forge")]
#[command(about = "Agentic résumé ingestion, embedding, and job-matching pipeline")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Start the background scheduler and block until shutdown.
    Serve,

    /// Run a single résumé file through the ingestion pipeline.
    Upload(UploadArgs),

    /// Run the matching engine for every candidate against one job.
    MatchJob(MatchJobArgs),

    /// Score one candidate against every active job.
    MatchCandidate(MatchCandidateArgs),

    /// Show the ingest status for a process tracker.
    Status(StatusArgs),

    /// Apply pending schema migrations and exit.
    Migrate,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Path to a résumé file (.pdf, .doc, .docx, or .zip archive of those).
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MatchJobArgs {
    /// Job requirement id to match every candidate against.
    pub job_id: Uuid,

    /// Identity recorded on the match audit as the initiator.
    #[arg(long)]
    pub initiated_by: Option<String>,
}

#[derive(Parser, Debug)]
pub struct MatchCandidateArgs {
    /// Candidate id to score against every active job.
    pub candidate_id: Uuid,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Process tracker id returned by `upload`.
    pub tracker_id: Uuid,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve => run_serve(config).await,
        Commands::Upload(args) => run_upload(config, args).await,
        Commands::MatchJob(args) => run_match_job(config, args).await,
        Commands::MatchCandidate(args) => run_match_candidate(config, args).await,
        Commands::Status(args) => run_status(config, args).await,
        Commands::Migrate => run_migrate(config).await,
    }
}

async fn connect(config: &Config) -> anyhow::Result<Arc<Database>> {
    let db = Database::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout,
    )
    .await?;
    Ok(Arc::new(db))
}

fn build_llm_client(config: &Config) -> Arc<LlmClient> {
    let templates = PromptTemplateSet::resolve(config.llm.templates_path.as_deref());
    Arc::new(
        LlmClient::with_timeout(
            config.llm.api_base.clone(),
            config.llm.api_key.clone(),
            config.llm.chat_model.clone(),
            config.llm.embedding_model.clone(),
            config.llm.request_timeout,
        )
        .with_templates(templates),
    )
}

fn build_enrichment_service(config: &Config, db: Arc<Database>) -> Arc<ProfileEnrichmentService> {
    let registry = EnricherRegistry::new()
        .register(Arc::new(GithubEnricher::new(config.enrichment.github_token.clone())))
        .register(Arc::new(LinkedinEnricher::new()))
        .register(Arc::new(TwitterEnricher::new(config.enrichment.twitter_bearer_token.clone())))
        .register(Arc::new(WebSearchEnricher::new(config.enrichment.tavily_api_key.clone())));

    Arc::new(ProfileEnrichmentService::new(
        db,
        registry,
        config.enrichment.staleness_ttl,
    ))
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    db.run_migrations().await?;

    let queue = Arc::new(JobQueue::new(
        db.pool().clone(),
        config.retry.base_backoff,
        config.retry.max_backoff,
    ));
    let llm = build_llm_client(&config);

    let runner: Arc<dyn JobHandler> = Arc::new(PipelineRunner::new(
        Arc::clone(&db),
        Arc::clone(&queue),
        Arc::clone(&llm),
        config.embedding.clone(),
    ));
    let handler: Arc<dyn JobHandler> = Arc::new(
        RoutingJobHandler::new()
            .with_route(JobKind::ResumeIngest, Arc::clone(&runner))
            .with_route(JobKind::ArchiveExpand, runner),
    );

    let mut scheduler = Scheduler::new(config.scheduler.clone(), queue, handler);
    scheduler.start();

    info!("resume-forge scheduler running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    scheduler.shutdown().await;

    Ok(())
}

async fn run_upload(config: Config, args: UploadArgs) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    db.run_migrations().await?;

    let filename = args
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("upload path has no filename"))?
        .to_string();

    let is_zip = filename.to_lowercase().ends_with(".zip");
    let supported = parser::extension_of(&filename)
        .map(|ext| parser::is_supported_extension(&ext))
        .unwrap_or(false);
    if !supported && !is_zip {
        anyhow::bail!("unsupported file extension: {filename}");
    }

    let bytes = tokio::fs::read(&args.path).await?;
    if bytes.is_empty() {
        anyhow::bail!("upload file is empty");
    }
    if bytes.len() as u64 > config.upload.max_bytes {
        anyhow::bail!("upload file exceeds maximum size of {} bytes", config.upload.max_bytes);
    }

    let tracker = ProcessTracker {
        id: Uuid::new_v4(),
        status: TrackerStatus::Initiated,
        total_files: 1,
        processed_files: 0,
        failed_files: 0,
        message: "upload received".to_string(),
        filename: filename.clone(),
        correlation_id: None,
        job_id: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    db.insert_tracker(&tracker).await?;

    let queue = Arc::new(JobQueue::new(
        db.pool().clone(),
        config.retry.base_backoff,
        config.retry.max_backoff,
    ));

    let kind = if is_zip {
        JobKind::ArchiveExpand
    } else {
        JobKind::ResumeIngest
    };

    let metadata = serde_json::json!({
        "tracker_id": tracker.id.to_string(),
        "filename": filename,
    });

    let new_job = NewJob::new(kind)
        .with_file_bytes(bytes)
        .with_metadata(metadata)
        .with_max_retries(config.retry.max_attempts);

    if config.scheduler.enabled {
        let job_id = queue.enqueue(new_job).await?;
        println!("enqueued job {job_id} for tracker {}", tracker.id);
    } else {
        info!("scheduler disabled, processing inline");
        let llm = build_llm_client(&config);
        let runner = PipelineRunner::new(Arc::clone(&db), Arc::clone(&queue), llm, config.embedding.clone());
        let job_id = queue.enqueue(new_job).await?;
        let job = db_claim_inline(&queue, kind, job_id).await?;
        if let Err(e) = runner.handle(job).await {
            error!(error = %e, "inline upload processing failed");
            anyhow::bail!("processing failed: {e}");
        }
        println!("processed inline for tracker {}", tracker.id);
    }

    println!("tracker id: {}", tracker.id);
    Ok(())
}

/// Claims the job the inline upload path just enqueued, so the synchronous
/// caller runs it through the same [`JobHandler`] the scheduler would use.
async fn db_claim_inline(queue: &JobQueue, kind: JobKind, job_id: Uuid) -> anyhow::Result<crate::queue::Job> {
    let claimed = queue.claim(kind, "inline", 1).await?;
    claimed
        .into_iter()
        .find(|j| j.id == job_id)
        .ok_or_else(|| anyhow::anyhow!("failed to claim just-enqueued job {job_id}"))
}

async fn run_match_job(config: Config, args: MatchJobArgs) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    let llm = build_llm_client(&config);
    let enrichment = build_enrichment_service(&config, Arc::clone(&db));
    let engine = Arc::new(MatchingEngine::new(db, llm, enrichment, config.enrichment.clone()));

    let audit_id = engine.match_all_for_job(args.job_id, args.initiated_by).await?;
    println!("match audit started: {audit_id}");
    println!("the batch completes asynchronously; poll list-match-audits to see its final state");
    Ok(())
}

async fn run_match_candidate(config: Config, args: MatchCandidateArgs) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    let llm = build_llm_client(&config);
    let enrichment = build_enrichment_service(&config, Arc::clone(&db));
    let engine = MatchingEngine::new(Arc::clone(&db), llm, enrichment, config.enrichment.clone());

    let candidate = db.get_candidate(args.candidate_id).await?;
    let matches = engine.match_candidate_against_active_jobs(&candidate).await?;

    println!("{} match(es) for candidate {}", matches.len(), candidate.name);
    for m in matches {
        println!(
            "  job {} — score {:.1} shortlisted={}",
            m.job_id, m.match_score, m.is_shortlisted
        );
    }
    Ok(())
}

async fn run_status(config: Config, args: StatusArgs) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    let tracker = db.get_tracker(args.tracker_id).await?;

    println!("tracker {}", tracker.id);
    println!("  status:          {:?}", tracker.status);
    println!("  filename:        {}", tracker.filename);
    println!("  total files:     {}", tracker.total_files);
    println!("  processed files: {}", tracker.processed_files);
    println!("  failed files:    {}", tracker.failed_files);
    println!("  message:         {}", tracker.message);
    Ok(())
}

async fn run_migrate(config: Config) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    db.run_migrations().await?;
    println!("migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_upload_subcommand() {
        let cli = Cli::parse_from(["resume-forge", "upload", "resume.pdf"]);
        match cli.command {
            Commands::Upload(args) => assert_eq!(args.path, PathBuf::from("resume.pdf")),
            _ => panic!("expected Upload command"),
        }
    }

    #[test]
    fn cli_parses_match_job_subcommand_with_uuid() {
        let id = Uuid::new_v4();
        let cli = Cli::parse_from(["resume-forge", "match-job", &id.to_string()]);
        match cli.command {
            Commands::MatchJob(args) => assert_eq!(args.job_id, id),
            _ => panic!("expected MatchJob command"),
        }
    }

    #[test]
    fn cli_command_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
