use std::io;
use std::string::FromUtf8Error;

use serde::Serialize;
use thiserror::Error;

use super::types::YearRecord;

/// Column order of the yearly breakdown CSV. Downstream tooling parses this.
pub const YEARLY_BREAKDOWN_HEADER: [&str; 6] = [
    "Year",
    "Monthly SIP",
    "Yearly Investment",
    "Total Invested",
    "Year-End Value",
    "Returns",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Flush(#[from] io::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Serialize)]
struct CsvRow {
    year: u32,
    monthly_sip: i64,
    yearly_investment: i64,
    total_invested: i64,
    year_end_value: i64,
    returns: i64,
}

impl From<&YearRecord> for CsvRow {
    fn from(record: &YearRecord) -> Self {
        Self {
            year: record.year,
            monthly_sip: record.monthly_contribution_this_year,
            yearly_investment: record.yearly_contribution,
            total_invested: record.cumulative_contributed,
            year_end_value: record.end_of_year_value,
            returns: record.gain,
        }
    }
}

pub fn write_yearly_breakdown_csv<W: io::Write>(
    records: &[YearRecord],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(YEARLY_BREAKDOWN_HEADER)?;
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn yearly_breakdown_csv(records: &[YearRecord]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_yearly_breakdown_csv(records, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
