// ⚙️ Configuration - Command-line arguments and logging setup
// Shared by the CLI and the server binary.

use crate::loader::{parse_date, CsvLedgerLoader};
use crate::matcher::{MatchingEngine, DEFAULT_LOOKBACK_DAYS};
use crate::report::MatchReport;
use crate::transaction::Transaction;
use crate::window::{AnalysisWindow, DEFAULT_EXTENSION_DAYS, MAX_WINDOW_DAYS};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEDGER_FILE: &str = "donation_data.csv";
pub const DEFAULT_START_DATE: &str = "2019-07-05";
pub const DEFAULT_END_DATE: &str = "2019-07-10";

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("not a calendar date: {value:?}"))
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "donation-trace",
    version,
    about = "Flag deposit/withdrawal pairs that may be disguised donations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level for diagnostics on stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "DONATION_TRACE_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one summary line per consolidated match
    Analyze(AnalyzeArgs),

    /// Browse matches in a terminal UI
    #[cfg(feature = "tui")]
    Tui(LedgerArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Where the ledger lives and which window to analyze
#[derive(Debug, Clone, Args)]
pub struct LedgerArgs {
    /// Headerless CSV: date, party, amount, type
    #[arg(long, env = "DONATION_TRACE_FILE", default_value = DEFAULT_LEDGER_FILE)]
    pub file: PathBuf,

    /// The file starts with a header row
    #[arg(long)]
    pub headers: bool,

    #[arg(long, value_parser = parse_date_arg, default_value = DEFAULT_START_DATE)]
    pub start: NaiveDate,

    #[arg(long, value_parser = parse_date_arg, default_value = DEFAULT_END_DATE)]
    pub end: NaiveDate,

    /// Days before a withdrawal a same-amount deposit may be dated
    #[arg(
        long,
        default_value_t = DEFAULT_LOOKBACK_DAYS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_WINDOW_DAYS)
    )]
    pub lookback_days: i64,

    /// Days past the end date still scanned for withdrawals
    #[arg(
        long,
        default_value_t = DEFAULT_EXTENSION_DAYS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_WINDOW_DAYS)
    )]
    pub extension_days: i64,
}

impl LedgerArgs {
    pub fn window(&self) -> Result<AnalysisWindow> {
        let window = AnalysisWindow::with_extension(self.start, self.end, self.extension_days)
            .context("Invalid analysis window")?;
        if window.is_inverted() {
            warn!(
                start = %window.start_date,
                end = %window.end_date,
                "start date is after end date, scanning {} to {} only",
                window.start_date,
                window.extended_end()
            );
        }
        Ok(window)
    }

    pub fn engine(&self) -> Result<MatchingEngine> {
        MatchingEngine::with_windows(self.lookback_days, self.extension_days)
            .context("Invalid matching windows")
    }

    pub fn loader(&self) -> CsvLedgerLoader {
        CsvLedgerLoader::new().with_headers(self.headers)
    }

    pub fn load_transactions(&self) -> Result<Vec<Transaction>> {
        self.loader().load_path(&self.file).map_err(|err| {
            let at = err.line().map(|line| format!(" at line {}", line)).unwrap_or_default();
            anyhow::Error::new(err).context(format!("Failed to load ledger: {}{}", self.file.display(), at))
        })
    }

    /// Load the ledger and run one analysis
    pub fn build_report(&self) -> Result<MatchReport> {
        let window = self.window()?;
        let transactions = self.load_transactions()?;
        Ok(MatchReport::build(&transactions, &window, &self.engine()?))
    }
}

// ============================================================================
// LOGGING
// ============================================================================

fn filter_for(level: &str) -> EnvFilter {
    let directives = format!(
        "donation_trace={level},donation_server={level},tower_http={level}",
        level = level
    );
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the stderr subscriber. Call once, from a binary.
pub fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
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
    fn test_analyze_defaults() {
        let cli = Cli::try_parse_from(["donation-trace", "analyze"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.ledger.start, ymd(2019, 7, 5));
        assert_eq!(args.ledger.end, ymd(2019, 7, 10));
        assert_eq!(args.ledger.lookback_days, 15);
        assert_eq!(args.ledger.extension_days, 15);
        assert!(!args.ledger.headers);
    }

    #[test]
    fn test_analyze_overrides() {
        let cli = Cli::try_parse_from([
            "donation-trace",
            "analyze",
            "--file",
            "ledger.csv",
            "--start",
            "2020-01-01",
            "--end",
            "01/31/2020",
            "--format",
            "json",
            "--lookback-days",
            "7",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.ledger.file, PathBuf::from("ledger.csv"));
        assert_eq!(args.ledger.start, ymd(2020, 1, 1));
        assert_eq!(args.ledger.end, ymd(2020, 1, 31));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.ledger.engine().unwrap(), MatchingEngine::with_windows(7, 15).unwrap());
    }

    #[test]
    fn test_bad_date_rejected() {
        let result = Cli::try_parse_from(["donation-trace", "analyze", "--start", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_window_lengths_out_of_range_rejected() {
        for flag in ["--extension-days", "--lookback-days"] {
            for value in ["100000000", "-1"] {
                let result = Cli::try_parse_from(["donation-trace", "analyze", flag, value]);
                assert!(result.is_err(), "{} {} accepted", flag, value);
            }
        }

        let cli = Cli::try_parse_from(["donation-trace", "analyze", "--extension-days", "0"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.ledger.window().unwrap().extended_end(), ymd(2019, 7, 10));
    }

    #[test]
    fn test_inverted_window_is_accepted() {
        let cli = Cli::try_parse_from([
            "donation-trace",
            "analyze",
            "--start",
            "2019-07-12",
            "--end",
            "2019-07-10",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let window = args.ledger.window().unwrap();
        assert!(window.is_inverted());
        assert!(window.contains(ymd(2019, 7, 25)));
        assert!(!window.contains(ymd(2019, 7, 11)));
    }

    #[test]
    fn test_build_report_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2019-07-05,A,500,Deposited").unwrap();
        writeln!(file, "2019-07-10,B,500,Withdrew").unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from(["donation-trace", "analyze", "--file", &path]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let report = args.ledger.build_report().unwrap();
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn test_missing_file_has_context() {
        let cli = Cli::try_parse_from(["donation-trace", "analyze", "--file", "/no/such/ledger.csv"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let err = args.ledger.build_report().unwrap_err();
        assert!(err.to_string().contains("Failed to load ledger"));
    }

    #[test]
    fn test_bad_row_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2019-07-05,A,500,Deposited").unwrap();
        writeln!(file, "2019-07-06,B,lots,Withdrew").unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from(["donation-trace", "analyze", "--file", &path]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let err = args.ledger.load_transactions().unwrap_err();
        assert!(err.to_string().ends_with("at line 2"));
    }

    #[test]
    fn test_filter_falls_back_on_bad_level() {
        // Must not panic
        let _ = filter_for("not a level!!");
        let _ = filter_for("debug");
    }
}
