//! Index constituents and exclusion matching

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SecurityError {
    #[error("security symbol cannot be empty")]
    EmptySymbol,
    #[error("company name cannot be empty for {0}")]
    EmptyName(String),
    #[error("price must be positive, got {0}")]
    InvalidPrice(f64),
}

/// One constituent of the replicated index.
///
/// A security is *unresolved* until the price resolver stores a positive
/// price for it; `set_price` rejects anything else, so `current_price`
/// being `Some` implies the price is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub symbol: String,
    pub company_name: String,
    pub isin: Option<String>,
    current_price: Option<f64>,
}

impl Security {
    pub fn new(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        isin: Option<String>,
    ) -> Result<Self, SecurityError> {
        let symbol = symbol.into().trim().to_string();
        if symbol.is_empty() {
            return Err(SecurityError::EmptySymbol);
        }
        let company_name = company_name.into().trim().to_string();
        if company_name.is_empty() {
            return Err(SecurityError::EmptyName(symbol));
        }
        Ok(Security {
            symbol,
            company_name,
            isin: isin.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
            current_price: None,
        })
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn is_resolved(&self) -> bool {
        self.current_price.is_some()
    }

    /// Stores a resolved market price. Non-positive and non-finite values
    /// are a resolution failure and leave the security unresolved.
    pub fn set_price(&mut self, price: f64) -> Result<(), SecurityError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(SecurityError::InvalidPrice(price));
        }
        self.current_price = Some(price);
        Ok(())
    }
}

/// A (symbol, isin) pair suppressing a security from the working set.
///
/// Either field matching excludes: symbols compare case-insensitively,
/// ISINs compare exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub symbol: Option<String>,
    pub isin: Option<String>,
}

impl ExclusionEntry {
    pub fn matches(&self, security: &Security) -> bool {
        let symbol_hit = self
            .symbol
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(&security.symbol));
        let isin_hit = match (&self.isin, &security.isin) {
            (Some(excluded), Some(isin)) => excluded == isin,
            _ => false,
        };
        symbol_hit || isin_hit
    }
}
