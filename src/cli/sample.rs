use std::path::Path;

use anyhow::Result;

use crate::config::AppConfig;
use crate::universe;

/// Writes sample universe and exclusion CSVs so a new user can try the
/// tool without downloading the real constituents file.
pub fn run(config: &AppConfig) -> Result<()> {
    let universe_path = config
        .universe
        .clone()
        .unwrap_or_else(|| "data/nifty100_sample.csv".to_string());
    universe::write_sample_universe(Path::new(&universe_path))?;
    println!("✓ Sample securities data created at {universe_path}");

    let exclusions_path = "data/sample_exclusions.csv";
    universe::write_sample_exclusions(Path::new(exclusions_path))?;
    println!("✓ Sample exclusion data created at {exclusions_path}");

    Ok(())
}
