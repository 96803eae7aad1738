// Donation Trace - Core Library
// Flags deposit/withdrawal pairs of equal amount that may be disguised donations

pub mod transaction;
pub mod loader;
pub mod window;
pub mod matcher;
pub mod report;
pub mod config;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use transaction::{Transaction, TransactionType};
pub use loader::{
    load_csv, parse_amount, parse_date,
    CsvLedgerLoader, LoadError, RawRow,
};
pub use window::{
    filter_deposits_and_withdrawals,
    offset_date, validate_span,
    AnalysisWindow, SplitLedger, WindowError, DEFAULT_EXTENSION_DAYS, MAX_WINDOW_DAYS,
};
pub use matcher::{
    match_transactions,
    DonationMatch, MatchCount, MatchKey, MatchingEngine, DEFAULT_LOOKBACK_DAYS,
};
pub use report::MatchReport;
