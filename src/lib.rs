//! # dork-runner
//!
//! A batch runner for search-engine dork queries.
//!
//! Queries are read from a file and sent, one at a time, to a single search
//! backend: a scraped HTML engine (Google, DuckDuckGo) or a keyed web-search
//! API (Bing, Brave, SearXNG). The runner paces requests, rotates user
//! agents and proxies, retries throttled requests with backoff and caches
//! responses. Results are grouped by query for the CSV, JSON and console
//! writers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dork_runner::config::{BackendConfig, RunConfig};
//! use dork_runner::engines::create_engine;
//! use dork_runner::{EngineConfig, EngineId, Runner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = create_engine(EngineConfig::new(BackendConfig::new(EngineId::DuckDuckGo)))?;
//!     let mut runner = Runner::new(engine, &RunConfig::default());
//!
//!     let queries = vec!["filetype:pdf \"annual report\"".to_string()];
//!     let report = runner.run(&queries, Some("example.com")).await;
//!
//!     for (query, results) in report.results.iter() {
//!         println!("{}: {} results", query, results.len());
//!     }
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod http;
mod result;
mod runner;

pub mod cache;
pub mod config;
pub mod engines;
pub mod identity;
pub mod limiter;
pub mod output;
pub mod proxy;
pub mod query;

pub use engine::{Engine, EngineConfig, EngineId, EngineKind};
pub use error::{BackendError, CacheError, ConfigError, OutputError};
pub use result::{domain_of, ResultSet, SearchResult};
pub use runner::{QueryFailure, RunReport, RunStats, RunStatus, Runner};
