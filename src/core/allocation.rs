//! Equal-weight allocation of an investment budget across an index universe

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::security::{ExclusionEntry, Security};

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("investment amount must be positive, got {0}")]
    InvalidBudget(f64),
    #[error("no securities left to allocate after exclusions")]
    EmptyUniverse,
}

/// Computed buy order for a single included security.
///
/// Unresolved securities still produce a row: zero shares, with the full
/// target amount reported as unallocated.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub security: Security,
    /// Equal weight as a fraction of the included universe (1/N).
    pub target_pct: f64,
    pub target_amount: f64,
    pub shares_to_buy: u64,
    pub actual_amount: f64,
    pub actual_pct: f64,
    pub unallocated_amount: f64,
}

/// Aggregate statistics over every allocation row.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub total_allocated: f64,
    pub total_unallocated: f64,
    pub total_shares: u64,
    pub included: usize,
    pub resolved: usize,
    pub failed: usize,
    /// total_allocated / total_investment, as a fraction.
    pub utilization: f64,
    /// resolved / included, as a fraction.
    pub success_rate: f64,
}

/// Result of one allocation run: the buy orders plus their summary.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub allocations: Vec<Allocation>,
    pub summary: PortfolioSummary,
}

/// Removes every security matched by an exclusion entry (symbol or ISIN).
pub fn apply_exclusions<'a>(
    securities: &'a [Security],
    exclusions: &[ExclusionEntry],
) -> Vec<&'a Security> {
    securities
        .iter()
        .filter(|security| {
            let excluded = exclusions.iter().any(|entry| entry.matches(security));
            if excluded {
                info!(symbol = %security.symbol, "excluding security");
            }
            !excluded
        })
        .collect()
}

/// Computes equal-weight whole-share buy orders for `budget`.
///
/// Each included security is weighted 1/N where N is the universe size
/// after exclusions, so removing securities increases the weight of the
/// rest. Amounts stay unrounded here; formatting happens at the report
/// layer.
pub fn allocate(
    budget: f64,
    securities: &[Security],
    exclusions: &[ExclusionEntry],
) -> Result<Portfolio, AllocationError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(AllocationError::InvalidBudget(budget));
    }

    let included = apply_exclusions(securities, exclusions);
    let count = included.len();
    if count == 0 {
        return Err(AllocationError::EmptyUniverse);
    }

    let target_pct = 1.0 / count as f64;
    let target_amount = budget * target_pct;
    info!(
        securities = count,
        target_amount, "computing equal weight allocation"
    );

    let allocations: Vec<Allocation> = included
        .into_iter()
        .map(|security| allocate_security(security, budget, target_pct, target_amount))
        .collect();

    let summary = summarize(budget, &allocations);
    info!(
        total_allocated = summary.total_allocated,
        total_unallocated = summary.total_unallocated,
        total_shares = summary.total_shares,
        "allocation completed"
    );

    Ok(Portfolio {
        allocations,
        summary,
    })
}

fn allocate_security(
    security: &Security,
    budget: f64,
    target_pct: f64,
    target_amount: f64,
) -> Allocation {
    let Some(price) = security.current_price() else {
        return Allocation {
            security: security.clone(),
            target_pct,
            target_amount,
            shares_to_buy: 0,
            actual_amount: 0.0,
            actual_pct: 0.0,
            unallocated_amount: target_amount,
        };
    };

    // Whole shares only; flooring never over-allocates.
    let shares_to_buy = (target_amount / price).floor() as u64;
    let actual_amount = shares_to_buy as f64 * price;
    debug!(
        symbol = %security.symbol,
        shares_to_buy,
        actual_amount,
        "allocated security"
    );

    Allocation {
        security: security.clone(),
        target_pct,
        target_amount,
        shares_to_buy,
        actual_amount,
        actual_pct: actual_amount / budget,
        unallocated_amount: target_amount - actual_amount,
    }
}

fn summarize(budget: f64, allocations: &[Allocation]) -> PortfolioSummary {
    let total_allocated: f64 = allocations.iter().map(|a| a.actual_amount).sum();
    let total_unallocated: f64 = allocations.iter().map(|a| a.unallocated_amount).sum();
    let total_shares: u64 = allocations.iter().map(|a| a.shares_to_buy).sum();
    let included = allocations.len();
    let resolved = allocations
        .iter()
        .filter(|a| a.security.is_resolved())
        .count();

    PortfolioSummary {
        total_investment: budget,
        total_allocated,
        total_unallocated,
        total_shares,
        included,
        resolved,
        failed: included - resolved,
        utilization: total_allocated / budget,
        success_rate: resolved as f64 / included as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(symbol: &str, isin: &str, price: Option<f64>) -> Security {
        let mut security =
            Security::new(symbol, format!("{symbol} Ltd"), Some(isin.to_string())).unwrap();
        if let Some(price) = price {
            security.set_price(price).unwrap();
        }
        security
    }

    fn five_security_universe() -> Vec<Security> {
        vec![
            security("RELIANCE", "INE002A01018", Some(2450.75)),
            security("TCS", "INE467B01029", Some(3890.25)),
            security("INFY", "INE009A01021", Some(1534.80)),
            security("HDFCBANK", "INE040A01034", Some(1678.90)),
            security("ICICIBANK", "INE090A01021", Some(1129.15)),
        ]
    }

    #[test]
    fn test_equal_weight_five_securities() {
        let portfolio = allocate(100_000.0, &five_security_universe(), &[]).unwrap();

        let expected_shares = [8, 5, 13, 11, 17];
        for (allocation, expected) in portfolio.allocations.iter().zip(expected_shares) {
            assert_eq!(allocation.target_pct, 0.2);
            assert_eq!(allocation.target_amount, 20_000.0);
            assert_eq!(allocation.shares_to_buy, expected);
        }

        let summary = &portfolio.summary;
        assert!((summary.total_allocated - 96_673.10).abs() < 1e-6);
        assert!((summary.total_unallocated - 3_326.90).abs() < 1e-6);
        assert_eq!(summary.total_shares, 54);
        assert_eq!(summary.resolved, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.success_rate, 1.0);
    }

    #[test]
    fn test_allocated_plus_unallocated_equals_budget() {
        for budget in [1_000.0, 100_000.0, 12_345.67, 100_000_000.0] {
            let portfolio = allocate(budget, &five_security_universe(), &[]).unwrap();
            let summary = &portfolio.summary;
            assert!(
                (summary.total_allocated + summary.total_unallocated - budget).abs() < 1e-6,
                "conservation broken for budget {budget}"
            );
            for allocation in &portfolio.allocations {
                assert!(allocation.actual_amount <= allocation.target_amount);
                assert!(allocation.unallocated_amount >= 0.0);
            }
        }
    }

    #[test]
    fn test_exclusion_increases_remaining_weights() {
        let universe: Vec<Security> = (0..100)
            .map(|i| security(&format!("SYM{i}"), &format!("INE{i:06}A01"), Some(100.0)))
            .collect();
        let exclusions = vec![
            ExclusionEntry {
                symbol: Some("SYM0".to_string()),
                isin: None,
            },
            ExclusionEntry {
                symbol: Some("sym1".to_string()),
                isin: None,
            },
        ];

        let portfolio = allocate(100_000.0, &universe, &exclusions).unwrap();
        assert_eq!(portfolio.allocations.len(), 98);
        for allocation in &portfolio.allocations {
            assert!((allocation.target_pct - 1.0 / 98.0).abs() < 1e-12);
            assert!(allocation.target_pct > 0.01);
        }
    }

    #[test]
    fn test_unresolved_security_flows_into_unallocated() {
        let mut universe = five_security_universe();
        universe.push(security("FAILED", "INE999X01999", None));

        let portfolio = allocate(120_000.0, &universe, &[]).unwrap();
        let failed = portfolio
            .allocations
            .iter()
            .find(|a| a.security.symbol == "FAILED")
            .unwrap();
        assert_eq!(failed.shares_to_buy, 0);
        assert_eq!(failed.actual_amount, 0.0);
        assert_eq!(failed.unallocated_amount, 20_000.0);

        let summary = &portfolio.summary;
        assert_eq!(summary.included, 6);
        assert_eq!(summary.resolved, 5);
        assert_eq!(summary.failed, 1);
        assert!((summary.success_rate - 5.0 / 6.0).abs() < 1e-12);
        assert!((summary.total_allocated + summary.total_unallocated - 120_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_price_above_target_yields_zero_shares() {
        let universe = vec![
            security("CHEAP", "INE000000001", Some(10.0)),
            security("PRICEY", "INE000000002", Some(5_000.0)),
        ];

        let portfolio = allocate(2_000.0, &universe, &[]).unwrap();
        let pricey = &portfolio.allocations[1];
        assert_eq!(pricey.shares_to_buy, 0);
        assert_eq!(pricey.actual_amount, 0.0);
        assert_eq!(pricey.unallocated_amount, 1_000.0);
        // Unaffordable is a valid outcome, not an error
        assert_eq!(portfolio.summary.resolved, 2);
    }

    #[test]
    fn test_invalid_budget() {
        let universe = five_security_universe();
        assert_eq!(
            allocate(0.0, &universe, &[]).unwrap_err(),
            AllocationError::InvalidBudget(0.0)
        );
        assert_eq!(
            allocate(-5_000.0, &universe, &[]).unwrap_err(),
            AllocationError::InvalidBudget(-5_000.0)
        );
        assert!(allocate(f64::NAN, &universe, &[]).is_err());
    }

    #[test]
    fn test_all_excluded_is_empty_universe() {
        let universe = vec![security("RELIANCE", "INE002A01018", Some(2450.75))];
        let exclusions = vec![ExclusionEntry {
            symbol: Some("RELIANCE".to_string()),
            isin: None,
        }];
        assert_eq!(
            allocate(100_000.0, &universe, &exclusions).unwrap_err(),
            AllocationError::EmptyUniverse
        );
        assert_eq!(
            allocate(100_000.0, &[], &[]).unwrap_err(),
            AllocationError::EmptyUniverse
        );
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let universe = five_security_universe();
        let exclusions = vec![ExclusionEntry {
            symbol: Some("TCS".to_string()),
            isin: None,
        }];

        let first = allocate(50_000.0, &universe, &exclusions).unwrap();
        let second = allocate(50_000.0, &universe, &exclusions).unwrap();

        assert_eq!(first.allocations.len(), second.allocations.len());
        for (a, b) in first.allocations.iter().zip(&second.allocations) {
            assert_eq!(a.security, b.security);
            assert_eq!(a.shares_to_buy, b.shares_to_buy);
            assert_eq!(a.actual_amount, b.actual_amount);
            assert_eq!(a.unallocated_amount, b.unallocated_amount);
        }
        assert_eq!(
            first.summary.total_allocated,
            second.summary.total_allocated
        );
    }

    #[test]
    fn test_exclusion_by_isin() {
        let universe = five_security_universe();
        let exclusions = vec![ExclusionEntry {
            symbol: None,
            isin: Some("INE467B01029".to_string()),
        }];

        let portfolio = allocate(100_000.0, &universe, &exclusions).unwrap();
        assert_eq!(portfolio.allocations.len(), 4);
        assert!(
            portfolio
                .allocations
                .iter()
                .all(|a| a.security.symbol != "TCS")
        );
    }
}
