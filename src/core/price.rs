//! Price source abstraction

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub price: f64,
    pub currency: String,
}

/// Capability for looking up a current market price by ticker symbol.
///
/// Injected into the resolver so the core has no direct network
/// dependency and tests can swap in a double.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote>;
}
