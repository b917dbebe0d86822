//! Allocation report output: buy-order CSV and summary text file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::core::{Allocation, Portfolio, PortfolioSummary};

const OUTPUT_HEADERS: [&str; 10] = [
    "company_name",
    "symbol",
    "current_price",
    "target_allocation_pct",
    "target_amount",
    "shares_to_buy",
    "actual_allocation_amount",
    "actual_allocation_pct",
    "unallocated_amount",
    "timestamp",
];

pub fn allocation_file_name(timestamp: &DateTime<Local>) -> String {
    format!("allocation_{}.csv", timestamp.format("%Y%m%d_%H%M%S"))
}

pub fn summary_file_name(timestamp: &DateTime<Local>) -> String {
    format!("allocation_{}_summary.txt", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Writes the buy-order CSV and its summary companion under `output_dir`,
/// returning the CSV path. Amounts are rounded to 2 decimal places and
/// percentages to 4 only here, at the presentation boundary.
pub fn write_portfolio(
    output_dir: &Path,
    portfolio: &Portfolio,
    timestamp: &DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let csv_path = output_dir.join(allocation_file_name(timestamp));
    write_allocations_csv(&csv_path, &portfolio.allocations, timestamp)?;

    let summary_path = output_dir.join(summary_file_name(timestamp));
    write_summary(&summary_path, &portfolio.summary, timestamp)?;

    Ok(csv_path)
}

pub fn write_allocations_csv(
    path: &Path,
    allocations: &[Allocation],
    timestamp: &DateTime<Local>,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    writer.write_record(OUTPUT_HEADERS)?;

    let timestamp = timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    for allocation in allocations {
        let current_price = allocation
            .security
            .current_price()
            .map_or("N/A".to_string(), |price| format!("{price:.2}"));
        writer.write_record([
            allocation.security.company_name.clone(),
            allocation.security.symbol.clone(),
            current_price,
            format!("{:.4}", allocation.target_pct * 100.0),
            format!("{:.2}", allocation.target_amount),
            allocation.shares_to_buy.to_string(),
            format!("{:.2}", allocation.actual_amount),
            format!("{:.4}", allocation.actual_pct * 100.0),
            format!("{:.2}", allocation.unallocated_amount),
            timestamp.clone(),
        ])?;
    }
    writer.flush()?;

    info!(count = allocations.len(), path = %path.display(), "allocations written");
    Ok(())
}

pub fn write_summary(
    path: &Path,
    summary: &PortfolioSummary,
    timestamp: &DateTime<Local>,
) -> Result<()> {
    let content = format!(
        "EQUAL WEIGHT INDEX TRACKER - PORTFOLIO SUMMARY\n\
         {}\n\n\
         Generated on: {}\n\n\
         Total Investment Amount: ₹{:.2}\n\
         Total Allocated Amount:  ₹{:.2}\n\
         Total Unallocated:       ₹{:.2}\n\
         Utilization Rate:        {:.2}%\n\n\
         Total Shares to Buy:     {}\n\
         Successful Securities:   {}\n\
         Failed Securities:       {}\n\
         Success Rate:            {:.1}%\n",
        "=".repeat(50),
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        summary.total_investment,
        summary.total_allocated,
        summary.total_unallocated,
        summary.utilization * 100.0,
        summary.total_shares,
        summary.resolved,
        summary.failed,
        summary.success_rate * 100.0,
    );

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary file: {}", path.display()))?;
    info!(path = %path.display(), "summary written");
    Ok(())
}
