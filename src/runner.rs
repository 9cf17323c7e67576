//! Query orchestration.
//!
//! The [`Runner`] owns all per-run state (engine, identities, proxies,
//! limiter, cache) and processes queries strictly one at a time. A failed
//! query degrades to an empty entry; only an authentication failure stops
//! the run early.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::config::RunConfig;
use crate::error::BackendError;
use crate::identity::IdentityRotator;
use crate::limiter::{RateLimiter, RetryDecision, RetryPolicy};
use crate::proxy::ProxyPool;
use crate::query::Query;
use crate::{Engine, ResultSet, SearchResult};

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Distinct queries that made it into the result set.
    pub queries: usize,
    /// Queries answered by the backend or the cache.
    pub succeeded: usize,
    /// Queries recorded with an empty result list after failing.
    pub failed: usize,
    /// Queries answered from the cache.
    pub cache_hits: usize,
    /// Backend requests issued, retries included.
    pub requests: usize,
    /// Results across all queries.
    pub total_results: usize,
}

/// A query that ended with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub query: String,
    pub error: BackendError,
    pub attempts: u32,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every query was processed.
    Completed,
    /// The run was interrupted between queries.
    Cancelled,
    /// The engine rejected its credentials; remaining queries were skipped.
    Aborted(BackendError),
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub results: ResultSet,
    pub stats: RunStats,
    pub failures: Vec<QueryFailure>,
    pub status: RunStatus,
}

enum Outcome {
    Found { results: Vec<SearchResult>, attempts: u32 },
    Failed { error: BackendError, attempts: u32 },
    Cancelled,
}

/// Sequential query runner.
pub struct Runner {
    engine: Box<dyn Engine>,
    identities: IdentityRotator,
    proxies: ProxyPool,
    limiter: RateLimiter,
    retry: RetryPolicy,
    cache: ResponseCache,
    cancel: CancellationToken,
}

impl Runner {
    /// Creates a runner for `engine` with the given settings.
    pub fn new(engine: Box<dyn Engine>, config: &RunConfig) -> Self {
        Self {
            engine,
            identities: IdentityRotator::new(),
            proxies: ProxyPool::new(),
            limiter: RateLimiter::new(config.delay).with_jitter(config.jitter),
            retry: RetryPolicy::from_config(config),
            cache: ResponseCache::from_settings(&config.cache),
            cancel: CancellationToken::new(),
        }
    }

    /// Routes requests through the given proxies.
    pub fn with_proxy_pool(mut self, proxies: ProxyPool) -> Self {
        self.proxies = proxies;
        self
    }

    /// Replaces the identity pool.
    pub fn with_identities(mut self, identities: IdentityRotator) -> Self {
        self.identities = identities;
        self
    }

    /// Replaces the response cache.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    /// Returns a token that interrupts the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs every query in order.
    ///
    /// Results are grouped under the original query even when
    /// `target_domain` prefixes what is sent. Repeated query lines are
    /// processed once.
    pub async fn run(&mut self, queries: &[String], target_domain: Option<&str>) -> RunReport {
        let mut results = ResultSet::new();
        let mut stats = RunStats::default();
        let mut failures = Vec::new();
        let mut status = RunStatus::Completed;
        let total = queries.len();

        info!(
            engine = self.engine.name(),
            queries = total,
            proxies = self.proxies.len(),
            "Starting run"
        );

        for (index, raw) in queries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Run cancelled after {} of {} queries", index, total);
                status = RunStatus::Cancelled;
                break;
            }
            if results.contains(raw) {
                debug!(query = %raw, "Skipping repeated query");
                continue;
            }

            let query = Query::new(raw.as_str(), target_domain);
            info!("[{}/{}] Searching: {}", index + 1, total, query.effective());

            let key = cache_key(self.engine.id(), query.effective());
            if let Some(cached) = self.cache.get(&key).await {
                let restamped: Vec<_> = cached.iter().map(|r| r.for_query(query.original())).collect();
                debug!(query = %raw, count = restamped.len(), "Served from cache");
                stats.cache_hits += 1;
                stats.succeeded += 1;
                results.insert(query.original(), restamped);
                continue;
            }

            match self.fetch(&query, &mut stats).await {
                Outcome::Found { results: found, attempts } => {
                    info!(count = found.len(), attempts, "Query complete");
                    self.cache.put(&key, query.effective(), &found).await;
                    stats.succeeded += 1;
                    results.insert(query.original(), found);
                }
                Outcome::Failed { error, attempts } => {
                    warn!(
                        query = %raw,
                        kind = error.kind(),
                        attempts,
                        "Query failed: {}",
                        error
                    );
                    stats.failed += 1;
                    results.insert(query.original(), Vec::new());
                    let fatal = matches!(error, BackendError::AuthFailed(_));
                    failures.push(QueryFailure {
                        query: raw.clone(),
                        error: error.clone(),
                        attempts,
                    });
                    if fatal {
                        warn!("Engine {} rejected the credentials; stopping run", self.engine.name());
                        status = RunStatus::Aborted(error);
                        break;
                    }
                }
                Outcome::Cancelled => {
                    info!(query = %raw, "Run cancelled; abandoning query");
                    status = RunStatus::Cancelled;
                    break;
                }
            }
        }

        stats.queries = results.len();
        stats.total_results = results.total_results();

        RunReport {
            results,
            stats,
            failures,
            status,
        }
    }

    /// Issues one query, retrying per the policy.
    async fn fetch(&mut self, query: &Query, stats: &mut RunStats) -> Outcome {
        let cancel = self.cancel.clone();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                _ = self.limiter.before_request() => {}
            }

            let identity = self.identities.next_identity();
            let proxy = self.proxies.next_proxy();
            stats.requests += 1;
            debug!(attempt, user_agent = %identity.user_agent, "Sending request");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                result = self.engine.search(query.effective(), &identity, proxy.as_ref()) => result,
            };

            let error = match result {
                Ok(results) => {
                    return Outcome::Found {
                        results,
                        attempts: attempt,
                    }
                }
                Err(error) => error,
            };

            match self.retry.on_result(attempt, Some(&error)) {
                RetryDecision::RetryAfter(wait) => {
                    warn!(
                        attempt,
                        kind = error.kind(),
                        "Attempt failed ({}); retrying in {:.1}s",
                        error,
                        wait.as_secs_f64()
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Outcome::Cancelled,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                RetryDecision::Abort | RetryDecision::Proceed => {
                    return Outcome::Failed {
                        error,
                        attempts: attempt,
                    }
                }
            }
        }
    }
}
