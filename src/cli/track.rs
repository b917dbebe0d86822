use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::Cell;
use console::style;
use tracing::info;

use super::ui;
use crate::config::AppConfig;
use crate::core::{FailureReport, Portfolio, PriceResolver, Security, allocate};
use crate::providers::YahooProvider;
use crate::{report, universe};

/// How many buy orders the terminal preview shows; the CSV has them all.
const PREVIEW_ROWS: usize = 10;

pub struct TrackOptions {
    pub amount: Option<f64>,
    pub securities: Option<PathBuf>,
    pub exclusions: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, options: TrackOptions) -> Result<()> {
    let amount = match options.amount {
        Some(amount) => amount,
        None => prompt_amount(config)?,
    };
    config.budget.validate(amount)?;

    let securities_path = options
        .securities
        .or_else(|| config.universe.as_ref().map(PathBuf::from))
        .context("No securities file: pass --securities or set `universe` in the config")?;

    println!(
        "{}",
        ui::style_text("Equal Weight Index Tracker", ui::StyleType::Title)
    );
    println!("Investment Amount: ₹{amount:.2}\n");

    // Step 1: load the universe and drop exclusions before fetching,
    // so excluded symbols never hit the price source
    let mut securities = universe::load_securities(&securities_path)?;
    println!("✓ Loaded {} securities", securities.len());

    let exclusions = match &options.exclusions {
        Some(path) => universe::load_exclusions(path)?,
        None => Vec::new(),
    };
    if !exclusions.is_empty() {
        securities.retain(|security| !exclusions.iter().any(|entry| entry.matches(security)));
        println!(
            "✓ {} securities remaining after exclusions",
            securities.len()
        );
    }

    // Step 2: resolve prices
    let failures = resolve_prices(config, &mut securities).await?;
    report_failures(&securities, &failures);

    // Step 3: allocate
    let portfolio = allocate(amount, &securities, &exclusions)?;

    // Step 4: write reports; the run timestamp is assigned here, not by
    // the engine
    let timestamp = Local::now();
    let output_dir = options
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let csv_path = report::write_portfolio(&output_dir, &portfolio, &timestamp)?;

    display_portfolio(&portfolio);
    println!(
        "\nOutput saved to: {}",
        ui::style_text(&csv_path.display().to_string(), ui::StyleType::TotalLabel)
    );

    Ok(())
}

async fn resolve_prices(
    config: &AppConfig,
    securities: &mut Vec<Security>,
) -> Result<Vec<FailureReport>> {
    let provider = YahooProvider::new(&config.fetch.base_url)?;
    let resolver = PriceResolver::new(config.fetch.resolver_settings());

    let pb = ui::new_progress_bar(securities.len() as u64, true);
    pb.set_message("Fetching prices...");
    let failures = resolver
        .resolve(&provider, securities, &|| pb.inc(1))
        .await?;
    pb.finish_and_clear();

    info!(
        resolved = securities.iter().filter(|s| s.is_resolved()).count(),
        failed = failures.len(),
        "price resolution finished"
    );
    Ok(failures)
}

fn report_failures(securities: &[Security], failures: &[FailureReport]) {
    let resolved = securities.iter().filter(|s| s.is_resolved()).count();
    println!("✓ Price fetch completed: {resolved}/{} successful", securities.len());

    if failures.is_empty() {
        return;
    }
    println!(
        "{}",
        ui::style_text(
            &format!("⚠ Failed to fetch prices for {} securities", failures.len()),
            ui::StyleType::Warning,
        )
    );
    for failure in failures {
        println!(
            "  {} {} ({}, {} attempts)",
            style("✗").red(),
            failure.symbol,
            failure.reason,
            failure.attempts
        );
    }
}

fn display_portfolio(portfolio: &Portfolio) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Price"),
        ui::header_cell("Target ₹"),
        ui::header_cell("Shares"),
        ui::header_cell("Actual ₹"),
        ui::header_cell("Actual %"),
        ui::header_cell("Unallocated ₹"),
    ]);

    for allocation in portfolio.allocations.iter().take(PREVIEW_ROWS) {
        let price_cell = match allocation.security.current_price() {
            Some(price) => ui::amount_cell(format!("{price:.2}")),
            None => ui::na_cell(),
        };
        table.add_row(vec![
            Cell::new(&allocation.security.symbol),
            price_cell,
            ui::amount_cell(format!("{:.2}", allocation.target_amount)),
            ui::amount_cell(allocation.shares_to_buy.to_string()),
            ui::amount_cell(format!("{:.2}", allocation.actual_amount)),
            ui::amount_cell(format!("{:.4}%", allocation.actual_pct * 100.0)),
            ui::amount_cell(format!("{:.2}", allocation.unallocated_amount)),
        ]);
    }

    println!("\n{table}");
    if portfolio.allocations.len() > PREVIEW_ROWS {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "... and {} more in the output file",
                    portfolio.allocations.len() - PREVIEW_ROWS
                ),
                ui::StyleType::Subtle,
            )
        );
    }

    let summary = &portfolio.summary;
    ui::print_separator();
    println!(
        "Total Investment:  ₹{:.2}\n\
         Total Allocated:   {}\n\
         Total Unallocated: ₹{:.2}\n\
         Utilization:       {:.2}%\n\
         Total Shares:      {}\n\
         Securities:        {} resolved, {} failed ({:.1}% success)",
        summary.total_investment,
        ui::style_text(
            &format!("₹{:.2}", summary.total_allocated),
            ui::StyleType::TotalValue
        ),
        summary.total_unallocated,
        summary.utilization * 100.0,
        summary.total_shares,
        summary.resolved,
        summary.failed,
        summary.success_rate * 100.0,
    );
}

fn prompt_amount(config: &AppConfig) -> Result<f64> {
    loop {
        print!(
            "Enter investment amount (minimum ₹{:.0}): ₹",
            config.budget.min
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read investment amount")?;
        match line.trim().parse::<f64>() {
            Ok(amount) => return Ok(amount),
            Err(_) => println!(
                "{}",
                ui::style_text("Invalid input. Please enter a number.", ui::StyleType::Error)
            ),
        }
    }
}
