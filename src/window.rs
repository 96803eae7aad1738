// 🗓️ Window Filter - Split the ledger into deposits and withdrawals
//
// Both subsets keep rows dated in [start_date, end_date + extension] inclusive.
// The extension lets a withdrawal complete a match after the reporting period.

use crate::transaction::{Transaction, TransactionType};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Days past `end_date` that withdrawals (and deposits) are still considered
pub const DEFAULT_EXTENSION_DAYS: i64 = 15;

/// Upper bound accepted for the extension and lookback lengths (about a century)
pub const MAX_WINDOW_DAYS: i64 = 36_525;

// Wider than the whole NaiveDate range, small enough for Duration::days
const SATURATING_SPAN_DAYS: i64 = 200_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("{field} must be non-negative, got {days} days")]
    Negative { field: &'static str, days: i64 },

    #[error("{field} of {days} days exceeds the {max} day limit", max = MAX_WINDOW_DAYS)]
    TooLong { field: &'static str, days: i64 },
}

/// Check a day span used as a window length
pub fn validate_span(field: &'static str, days: i64) -> Result<i64, WindowError> {
    if days < 0 {
        return Err(WindowError::Negative { field, days });
    }
    if days > MAX_WINDOW_DAYS {
        return Err(WindowError::TooLong { field, days });
    }
    Ok(days)
}

/// `date` moved by `days`, saturating at the calendar bounds instead of panicking
pub fn offset_date(date: NaiveDate, days: i64) -> NaiveDate {
    let span = Duration::days(days.clamp(-SATURATING_SPAN_DAYS, SATURATING_SPAN_DAYS));
    date.checked_add_signed(span).unwrap_or(if days < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}

// ============================================================================
// ANALYSIS WINDOW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub extension_days: i64,
}

impl AnalysisWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, WindowError> {
        Self::with_extension(start_date, end_date, DEFAULT_EXTENSION_DAYS)
    }

    pub fn with_extension(
        start_date: NaiveDate,
        end_date: NaiveDate,
        extension_days: i64,
    ) -> Result<Self, WindowError> {
        Ok(AnalysisWindow {
            start_date,
            end_date,
            extension_days: validate_span("extension", extension_days)?,
        })
    }

    /// Last date (inclusive) still inside the window
    pub fn extended_end(&self) -> NaiveDate {
        offset_date(self.end_date, self.extension_days)
    }

    /// Start falls after the end date. Still filters on `[start, end + extension]`.
    pub fn is_inverted(&self) -> bool {
        self.start_date > self.end_date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.extended_end()
    }
}

// ============================================================================
// SPLIT LEDGER
// ============================================================================

/// Deposits and withdrawals that fall inside an analysis window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitLedger {
    pub deposits: Vec<Transaction>,
    pub withdrawals: Vec<Transaction>,
}

impl SplitLedger {
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty() && self.withdrawals.is_empty()
    }
}

fn select(
    transactions: &[Transaction],
    window: &AnalysisWindow,
    transaction_type: TransactionType,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.transaction_type == transaction_type && window.contains(tx.date))
        .cloned()
        .collect()
}

/// Split `transactions` into in-window deposits and withdrawals, source order kept
pub fn filter_deposits_and_withdrawals(
    transactions: &[Transaction],
    window: &AnalysisWindow,
) -> SplitLedger {
    let split = SplitLedger {
        deposits: select(transactions, window, TransactionType::Deposit),
        withdrawals: select(transactions, window, TransactionType::Withdrawal),
    };

    debug!(
        start = %window.start_date,
        extended_end = %window.extended_end(),
        deposits = split.deposits.len(),
        withdrawals = split.withdrawals.len(),
        "filtered ledger to window"
    );

    split
}

// ============================================================================
// TESTS
// ============================================================================
