//! PostgreSQL persistent storage for candidates, résumé embeddings, job
//! requirements, process trackers, matches, external profiles, and match
//! audits.
//!
//! # Overview
//!
//! - **models**: row types shared by every table.
//! - **schema**: `CREATE TABLE` statements and table-name constants.
//! - **migrations**: idempotent runner tracked by a `_migrations` table.
//! - **database**: the `Database` client exposing CRUD per entity.
//!
//! The job queue's own tables (`job_queue`) are defined here in `schema` but
//! read and written by [`crate::queue`], not by [`Database`].

pub mod database;
pub mod migrations;
pub mod models;
pub mod schema;

pub use database::{Database, StorageError};
pub use migrations::{AppliedMigration, MigrationError, MigrationRunner};
pub use models::*;
