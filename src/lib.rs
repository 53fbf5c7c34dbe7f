//! # GitHub Organization Scraper
//!
//! Scrapes the repositories, contributors, members and social networks of a
//! set of GitHub organizations into CSV tables and GEXF graphs:
//! - Page-walking fetches that stop at the first empty page
//! - Concurrent fan-out of independent requests with per-request failure isolation
//! - Context tagging of every fetched item (organization, repository, user)
//! - Directed graph assembly with full and member-only follower networks
//! - Lazily built member and repository indices shared across operations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use org_scraper::{
//!     Credentials, FileSink, OperationKind, OutputLayout, RunContext, Runner, ScraperConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new("octocat", "ghp_xxxxxxxxxxxx")?;
//!     let context = RunContext::connect(
//!         &ScraperConfig::default(),
//!         credentials,
//!         vec!["rust-lang".to_string()],
//!         true,
//!     )?;
//!
//!     let sink = FileSink::create(OutputLayout::new("data/example"))?;
//!     let report = Runner::new(context, Arc::new(sink))
//!         .run(&[OperationKind::Repos, OperationKind::Followers])
//!         .await?;
//!
//!     println!("{} requests failed", report.failures.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP transport
pub mod client;

// Fetch engine
pub mod pagination;
pub mod scheduler;
pub mod tagging;

// Assembly
pub mod graph;
pub mod index;
pub mod table;

// Operations and orchestration
pub mod operations;
pub mod runner;

// Output
pub mod export;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{
    CredentialProvider, Credentials, EnvCredentialProvider, FileCredentialProvider,
    StaticCredentialProvider,
};
pub use client::{HttpTransport, HttpTransportBuilder, Transport};
pub use config::{read_organizations, ScraperConfig, ScraperConfigBuilder};
pub use errors::{ErrorClass, ScrapeError, ScrapeErrorKind, ScrapeResult};
pub use export::{ExportSink, FileSink, MemorySink, OutputLayout};
pub use graph::{Graph, NetworkGraphs};
pub use index::{IndexKind, Indices, MemberIndex, RepoIndex};
pub use operations::{Operation, OperationKind, OperationOutput, RunContext};
pub use pagination::PagedFetcher;
pub use runner::{RunReport, RunState, Runner};
pub use scheduler::{BatchResult, FanOutScheduler, FetchBatch, FetchOutcome, FetchRequest};
pub use table::Table;
pub use types::{Context, Endpoint, Entity, FetchMode};
