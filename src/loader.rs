// 📂 Ledger Loader - Headerless CSV → typed transactions
//
// Column order is fixed: date, party, amount, type.
// Amounts may carry thousands separators ("1,500"), stripped before parsing.
// Any malformed row rejects the whole load; nothing is silently dropped.

use crate::transaction::{Transaction, TransactionType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: malformed amount {value:?}")]
    MalformedAmount { line: usize, value: String },

    #[error("line {line}: malformed date {value:?}")]
    MalformedDate { line: usize, value: String },

    #[error("line {line}: unknown transaction type {value:?} (expected \"Deposited\" or \"Withdrew\")")]
    UnknownTransactionType { line: usize, value: String },

    #[error("line {line}: missing {column} column")]
    MissingColumn { line: usize, column: &'static str },

    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read CSV record: {0}")]
    Csv(#[from] csv::Error),
}

impl LoadError {
    /// Source line the error points at, if it is row-level
    pub fn line(&self) -> Option<usize> {
        match self {
            LoadError::MalformedAmount { line, .. }
            | LoadError::MalformedDate { line, .. }
            | LoadError::UnknownTransactionType { line, .. }
            | LoadError::MissingColumn { line, .. } => Some(*line),
            LoadError::Io { .. } | LoadError::Csv(_) => None,
        }
    }
}

// ============================================================================
// RAW ROW
// ============================================================================

/// RawRow - the four columns as text, before any conversion
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line_number: usize,
    pub date: String,
    pub party: String,
    pub amount: String,
    pub transaction_type: String,
}

impl RawRow {
    fn from_record(record: &csv::StringRecord, line_number: usize) -> Result<Self, LoadError> {
        let column = |idx: usize, column: &'static str| {
            record
                .get(idx)
                .map(str::to_string)
                .ok_or(LoadError::MissingColumn { line: line_number, column })
        };

        Ok(RawRow {
            line_number,
            date: column(0, "date")?,
            party: column(1, "party")?,
            amount: column(2, "amount")?,
            transaction_type: column(3, "type")?,
        })
    }

    /// Convert to a typed transaction, validating every field
    pub fn parse(self) -> Result<Transaction, LoadError> {
        let line = self.line_number;

        let date = parse_date(&self.date).ok_or_else(|| LoadError::MalformedDate {
            line,
            value: self.date.clone(),
        })?;

        let amount = parse_amount(&self.amount).ok_or_else(|| LoadError::MalformedAmount {
            line,
            value: self.amount.clone(),
        })?;

        let transaction_type = TransactionType::from_tag(&self.transaction_type).ok_or_else(|| {
            LoadError::UnknownTransactionType {
                line,
                value: self.transaction_type.clone(),
            }
        })?;

        Ok(Transaction::new(date, self.party, amount, transaction_type).with_line_number(line))
    }
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date. Time-of-day, when present, is dropped.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Parse a currency amount: strip `,` separators, require finite and non-negative
pub fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let amount: f64 = cleaned.parse().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    // -0.0 → 0.0 so equal amounts compare equal bit-for-bit
    Some(amount.abs())
}

// ============================================================================
// CSV LOADER
// ============================================================================

/// Reads the ledger format. Headerless by default.
#[derive(Debug, Clone, Default)]
pub struct CsvLedgerLoader {
    has_headers: bool,
}

impl CsvLedgerLoader {
    pub fn new() -> Self {
        CsvLedgerLoader { has_headers: false }
    }

    /// Builder pattern: skip a leading header row
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn load_path(&self, path: &Path) -> Result<Vec<Transaction>, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let transactions = self.load_reader(file)?;
        info!(
            path = %path.display(),
            count = transactions.len(),
            "loaded ledger"
        );
        Ok(transactions)
    }

    pub fn load_reader<R: io::Read>(&self, reader: R) -> Result<Vec<Transaction>, LoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .from_reader(reader);

        let mut transactions = Vec::new();
        let offset = if self.has_headers { 2 } else { 1 };

        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let line_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + offset);

            let tx = RawRow::from_record(&record, line_number)?.parse()?;
            debug!(line = line_number, party = %tx.party, amount = tx.amount, "parsed row");
            transactions.push(tx);
        }

        Ok(transactions)
    }

    pub fn load_str(&self, data: &str) -> Result<Vec<Transaction>, LoadError> {
        self.load_reader(data.as_bytes())
    }
}

/// Load a headerless ledger file
pub fn load_csv(path: &Path) -> Result<Vec<Transaction>, LoadError> {
    CsvLedgerLoader::new().load_path(path)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_amount_strips_separators() {
        assert_eq!(parse_amount("500"), Some(500.0));
        assert_eq!(parse_amount("1,500"), Some(1500.0));
        assert_eq!(parse_amount("1,234,567.89"), Some(1234567.89));
        assert_eq!(parse_amount(" 250.5 "), Some(250.5));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount(","), None);
        assert_eq!(parse_amount("Rs. 500"), None);
        assert_eq!(parse_amount("-500"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_parse_amount_normalizes_negative_zero() {
        let zero = parse_amount("-0").unwrap();
        assert_eq!(zero.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2019-07-05"), Some(ymd(2019, 7, 5)));
        assert_eq!(parse_date("2019/07/05"), Some(ymd(2019, 7, 5)));
        assert_eq!(parse_date("07/05/2019"), Some(ymd(2019, 7, 5)));
    }

    #[test]
    fn test_parse_date_drops_time_of_day() {
        assert_eq!(parse_date("2019-07-05 23:59:59"), Some(ymd(2019, 7, 5)));
        assert_eq!(parse_date("2019-07-05 08:30"), Some(ymd(2019, 7, 5)));
        assert_eq!(parse_date("2019-07-05T08:30:00"), Some(ymd(2019, 7, 5)));
        assert_eq!(parse_date("2019-07-05T08:30:00+05:30"), Some(ymd(2019, 7, 5)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2019-13-01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_load_str_basic() {
        let data = "2019-07-05,A,500,Deposited\n2019-07-10,B,\"1,500\",Withdrew\n";
        let txs = CsvLedgerLoader::new().load_str(data).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].party, "A");
        assert_eq!(txs[0].amount, 500.0);
        assert_eq!(txs[0].transaction_type, TransactionType::Deposit);
        assert_eq!(txs[0].line_number, 1);

        assert_eq!(txs[1].date, ymd(2019, 7, 10));
        assert_eq!(txs[1].amount, 1500.0);
        assert_eq!(txs[1].transaction_type, TransactionType::Withdrawal);
        assert_eq!(txs[1].line_number, 2);
    }

    #[test]
    fn test_load_str_with_headers() {
        let data = "Date,Party,Amount,TransactionType\n2019-07-05,A,500,Deposited\n";
        let txs = CsvLedgerLoader::new().with_headers(true).load_str(data).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].line_number, 2);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let data = "2019-07-05,A,500,Deposited\n2019-07-06,B,500,Transferred\n";
        let err = CsvLedgerLoader::new().load_str(data).unwrap_err();

        assert!(matches!(
            err,
            LoadError::UnknownTransactionType { line: 2, ref value } if value == "Transferred"
        ));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_malformed_amount_is_rejected() {
        let err = CsvLedgerLoader::new()
            .load_str("2019-07-05,A,five hundred,Deposited\n")
            .unwrap_err();

        assert!(matches!(err, LoadError::MalformedAmount { line: 1, .. }));
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let err = CsvLedgerLoader::new()
            .load_str("not-a-date,A,500,Deposited\n")
            .unwrap_err();

        assert!(matches!(err, LoadError::MalformedDate { line: 1, .. }));
    }

    #[test]
    fn test_short_row_reports_missing_column() {
        let err = CsvLedgerLoader::new()
            .load_str("2019-07-05,A,500\n")
            .unwrap_err();

        assert!(matches!(
            err,
            LoadError::MissingColumn { line: 1, column: "type" }
        ));
    }

    #[test]
    fn test_load_path_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2019-07-05,A,500,Deposited").unwrap();
        writeln!(file, "2019-07-10,B,500,Withdrew").unwrap();
        file.flush().unwrap();

        let txs = load_csv(file.path()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].party, "B");
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();

        assert!(matches!(err, LoadError::Io { .. }));
        assert_eq!(err.line(), None);
    }
}
