//! Securities and exclusion list CSV input

use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use tracing::{info, warn};

use crate::core::{ExclusionEntry, Security};

/// Column positions for the two supported header layouts: the NSE
/// constituents download (`Company Name, Industry, Symbol, Series, ISIN
/// Code`) and the plain layout (`symbol, company_name, isin`).
#[derive(Debug, Clone, Copy)]
struct Columns {
    symbol: usize,
    company_name: usize,
    isin: Option<usize>,
}

impl Columns {
    fn detect(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        if let (Some(symbol), Some(company_name)) = (find("Symbol"), find("Company Name")) {
            return Ok(Columns {
                symbol,
                company_name,
                isin: find("ISIN Code"),
            });
        }
        if let (Some(symbol), Some(company_name)) = (find("symbol"), find("company_name")) {
            return Ok(Columns {
                symbol,
                company_name,
                isin: find("isin"),
            });
        }
        bail!("unrecognized securities CSV headers: {headers:?}");
    }

    fn field<'a>(record: &'a StringRecord, index: usize) -> &'a str {
        record.get(index).unwrap_or("").trim()
    }

    fn security(&self, record: &StringRecord) -> Result<Security> {
        let isin = self
            .isin
            .map(|index| Self::field(record, index).to_string())
            .filter(|isin| !isin.is_empty());
        let security = Security::new(
            Self::field(record, self.symbol),
            Self::field(record, self.company_name),
            isin,
        )?;
        Ok(security)
    }

    fn exclusion(&self, record: &StringRecord) -> Result<ExclusionEntry> {
        let symbol = Self::field(record, self.symbol);
        let isin = self
            .isin
            .map(|index| Self::field(record, index).to_string())
            .filter(|isin| !isin.is_empty());
        if symbol.is_empty() && isin.is_none() {
            bail!("exclusion row has neither symbol nor ISIN");
        }
        Ok(ExclusionEntry {
            symbol: (!symbol.is_empty()).then(|| symbol.to_string()),
            isin,
        })
    }
}

/// Loads index constituents from a CSV file. Malformed rows are skipped
/// with a warning rather than failing the whole load.
pub fn load_securities(path: &Path) -> Result<Vec<Security>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read securities file: {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let columns = Columns::detect(&headers)?;

    let mut securities = Vec::new();
    for (row, record) in reader.records().enumerate() {
        // Header is row 1
        let line = row + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                continue;
            }
        };
        match columns.security(&record) {
            Ok(security) => securities.push(security),
            Err(err) => warn!(line, error = %err, "skipping malformed row"),
        }
    }

    info!(count = securities.len(), path = %path.display(), "loaded securities");
    Ok(securities)
}

/// Loads an exclusion list from a CSV file of the same shape as the
/// securities file.
pub fn load_exclusions(path: &Path) -> Result<Vec<ExclusionEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read exclusion file: {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let columns = Columns::detect(&headers)?;

    let mut exclusions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let line = row + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                continue;
            }
        };
        match columns.exclusion(&record) {
            Ok(entry) => exclusions.push(entry),
            Err(err) => warn!(line, error = %err, "skipping malformed row"),
        }
    }

    info!(count = exclusions.len(), path = %path.display(), "loaded exclusion list");
    Ok(exclusions)
}

const SAMPLE_HEADERS: [&str; 5] = ["Company Name", "Industry", "Symbol", "Series", "ISIN Code"];

const SAMPLE_SECURITIES: [[&str; 5]; 5] = [
    [
        "Reliance Industries Limited",
        "Oil Gas & Consumable Fuels",
        "RELIANCE",
        "EQ",
        "INE002A01018",
    ],
    [
        "Tata Consultancy Services Limited",
        "Information Technology",
        "TCS",
        "EQ",
        "INE467B01029",
    ],
    [
        "Infosys Limited",
        "Information Technology",
        "INFY",
        "EQ",
        "INE009A01021",
    ],
    [
        "HDFC Bank Limited",
        "Financial Services",
        "HDFCBANK",
        "EQ",
        "INE040A01034",
    ],
    [
        "ICICI Bank Limited",
        "Financial Services",
        "ICICIBANK",
        "EQ",
        "INE090A01021",
    ],
];

const SAMPLE_EXCLUSIONS: [[&str; 5]; 2] = [
    [
        "Adani Enterprises Ltd.",
        "Metals & Mining",
        "ADANIENT",
        "EQ",
        "INE423A01024",
    ],
    [
        "Adani Ports and Special Economic Zone Ltd.",
        "Services",
        "ADANIPORTS",
        "EQ",
        "INE742F01042",
    ],
];

fn write_sample(path: &Path, rows: &[[&str; 5]]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create sample file: {}", path.display()))?;
    writer.write_record(SAMPLE_HEADERS)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), "sample data written");
    Ok(())
}

pub fn write_sample_universe(path: &Path) -> Result<()> {
    write_sample(path, &SAMPLE_SECURITIES)
}

pub fn write_sample_exclusions(path: &Path) -> Result<()> {
    write_sample(path, &SAMPLE_EXCLUSIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_nse_format() {
        let file = write_temp(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             Reliance Industries Limited,Oil Gas & Consumable Fuels,RELIANCE,EQ,INE002A01018\n\
             Tata Consultancy Services Limited,Information Technology,TCS,EQ,INE467B01029\n",
        );

        let securities = load_securities(file.path()).unwrap();
        assert_eq!(securities.len(), 2);
        assert_eq!(securities[0].symbol, "RELIANCE");
        assert_eq!(securities[0].company_name, "Reliance Industries Limited");
        assert_eq!(securities[0].isin.as_deref(), Some("INE002A01018"));
        assert!(!securities[0].is_resolved());
    }

    #[test]
    fn test_load_plain_format() {
        let file = write_temp(
            "symbol,company_name,isin\n\
             INFY,Infosys Limited,INE009A01021\n\
             HDFCBANK,HDFC Bank Limited,\n",
        );

        let securities = load_securities(file.path()).unwrap();
        assert_eq!(securities.len(), 2);
        assert_eq!(securities[1].symbol, "HDFCBANK");
        assert!(securities[1].isin.is_none());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let file = write_temp(
            "symbol,company_name,isin\n\
             ,Missing Symbol Ltd,INE000000001\n\
             INFY,Infosys Limited,INE009A01021\n",
        );

        let securities = load_securities(file.path()).unwrap();
        assert_eq!(securities.len(), 1);
        assert_eq!(securities[0].symbol, "INFY");
    }

    #[test]
    fn test_unknown_headers_fail() {
        let file = write_temp("ticker,name\nRELIANCE,Reliance\n");
        assert!(load_securities(file.path()).is_err());
    }

    #[test]
    fn test_load_exclusions() {
        let file = write_temp(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             Adani Enterprises Ltd.,Metals & Mining,ADANIENT,EQ,INE423A01024\n",
        );

        let exclusions = load_exclusions(file.path()).unwrap();
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions[0].symbol.as_deref(), Some("ADANIENT"));
        assert_eq!(exclusions[0].isin.as_deref(), Some("INE423A01024"));
    }

    #[test]
    fn test_sample_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let universe_path = dir.path().join("sample.csv");
        let exclusions_path = dir.path().join("exclusions.csv");

        write_sample_universe(&universe_path).unwrap();
        write_sample_exclusions(&exclusions_path).unwrap();

        let securities = load_securities(&universe_path).unwrap();
        assert_eq!(securities.len(), 5);
        assert!(securities.iter().any(|s| s.symbol == "RELIANCE"));

        let exclusions = load_exclusions(&exclusions_path).unwrap();
        assert_eq!(exclusions.len(), 2);
        assert!(
            exclusions
                .iter()
                .all(|e| e.symbol.is_some() && e.isin.is_some())
        );
    }
}
