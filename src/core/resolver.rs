//! Batch price resolution with retries, backoff and bounded concurrency

use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::price::PriceProvider;
use crate::core::security::Security;

#[derive(Debug, Error, PartialEq)]
pub enum ResolverError {
    #[error("price source unreachable: no security could be resolved")]
    TotalOutage,
}

/// Retry schedule for a single security's lookups.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub backoff_cap: Duration,
}

impl RetryPolicy {
    /// Exponential delay before retry `attempt` (0-based), capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.backoff_cap)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    /// Per-lookup deadline; a timed-out lookup counts as a retryable failure.
    pub timeout: Duration,
    /// Maximum outstanding lookups against the price source.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

/// One security the resolver gave up on, after exhausting retries.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub symbol: String,
    pub reason: String,
    pub attempts: u32,
}

/// Resolves current prices for a working set of securities.
///
/// Lookups run concurrently up to the configured limit, each item retrying
/// independently. Per-item failures become `FailureReport` entries; only a
/// fully failed batch is an error.
pub struct PriceResolver {
    settings: ResolverSettings,
}

impl PriceResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        PriceResolver { settings }
    }

    pub async fn resolve(
        &self,
        provider: &(dyn PriceProvider + Send + Sync),
        securities: &mut [Security],
        on_progress: &(dyn Fn() + Send + Sync),
    ) -> Result<Vec<FailureReport>, ResolverError> {
        if securities.is_empty() {
            return Ok(Vec::new());
        }

        let symbols: Vec<String> = securities.iter().map(|s| s.symbol.clone()).collect();
        let lookups = symbols.iter().enumerate().map(|(index, symbol)| async move {
            let outcome = self.lookup_with_retry(provider, symbol).await;
            on_progress();
            (index, outcome)
        });

        let mut outcomes: Vec<(usize, Result<f64, FailureReport>)> = stream::iter(lookups)
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;
        // Completion order is arbitrary; merge back in input order.
        outcomes.sort_by_key(|(index, _)| *index);

        let mut failures = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(price) => {
                    if let Err(err) = securities[index].set_price(price) {
                        failures.push(FailureReport {
                            symbol: securities[index].symbol.clone(),
                            reason: err.to_string(),
                            attempts: self.settings.retry.max_retries + 1,
                        });
                    }
                }
                Err(report) => {
                    warn!(symbol = %report.symbol, reason = %report.reason, "price resolution failed");
                    failures.push(report);
                }
            }
        }

        if securities.iter().all(|s| !s.is_resolved()) {
            return Err(ResolverError::TotalOutage);
        }
        Ok(failures)
    }

    async fn lookup_with_retry(
        &self,
        provider: &(dyn PriceProvider + Send + Sync),
        symbol: &str,
    ) -> Result<f64, FailureReport> {
        let attempts = self.settings.retry.max_retries + 1;
        let mut last_failure = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.settings.retry.delay(attempt - 1)).await;
            }

            match tokio::time::timeout(self.settings.timeout, provider.fetch_price(symbol)).await {
                Ok(Ok(quote)) if quote.price > 0.0 && quote.price.is_finite() => {
                    debug!(symbol, price = quote.price, "resolved price");
                    return Ok(quote.price);
                }
                Ok(Ok(quote)) => {
                    last_failure = format!("non-positive price {}", quote.price);
                }
                Ok(Err(err)) => {
                    last_failure = err.to_string();
                }
                Err(_) => {
                    last_failure = format!("timed out after {:?}", self.settings.timeout);
                }
            }
            debug!(
                symbol,
                attempt = attempt + 1,
                error = %last_failure,
                "price lookup failed"
            );
        }

        Err(FailureReport {
            symbol: symbol.to_string(),
            reason: last_failure,
            attempts,
        })
    }
}
