//! Command-line interface for resume-forge.
//!
//! Provides commands for starting the scheduler, uploading résumés into the
//! ingestion pipeline, triggering matching runs, and checking ingest status.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
