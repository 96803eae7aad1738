// 📋 Match Report - One analysis run, ready for a presenter
// Filter + match + consolidate, plus the counts a reader wants alongside.

use crate::matcher::{DonationMatch, MatchingEngine};
use crate::transaction::Transaction;
use crate::window::{filter_deposits_and_withdrawals, AnalysisWindow};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub window: AnalysisWindow,
    pub transaction_count: usize,
    pub deposit_count: usize,
    pub withdrawal_count: usize,
    pub raw_match_count: usize,
    pub matches: Vec<DonationMatch>,
    pub total_flagged: f64,
}

impl MatchReport {
    pub fn build(
        transactions: &[Transaction],
        window: &AnalysisWindow,
        engine: &MatchingEngine,
    ) -> Self {
        // The window's extension sets the withdrawal cutoff too
        let engine = MatchingEngine {
            extension_days: window.extension_days,
            ..*engine
        };
        let split = filter_deposits_and_withdrawals(transactions, window);
        let raw = engine.find_raw_matches(&split.deposits, &split.withdrawals, window.end_date);
        let raw_match_count = raw.len();
        let matches = engine.consolidate(raw).into_matches();
        let total_flagged = matches.iter().map(|m| m.donated_amount).sum::<f64>();

        let report = MatchReport {
            window: *window,
            transaction_count: transactions.len(),
            deposit_count: split.deposits.len(),
            withdrawal_count: split.withdrawals.len(),
            raw_match_count,
            matches,
            total_flagged,
        };

        info!("{}", report.headline());
        report
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.matches.iter().map(DonationMatch::summary).collect()
    }

    pub fn headline(&self) -> String {
        format!(
            "{} to {} (+{}d): {} transactions, {} deposits, {} withdrawals, {} matches, Rs. {} flagged",
            self.window.start_date,
            self.window.end_date,
            self.window.extension_days,
            self.transaction_count,
            self.deposit_count,
            self.withdrawal_count,
            self.matches.len(),
            self.total_flagged
        )
    }

    pub fn find(&self, fingerprint: &str) -> Option<&DonationMatch> {
        self.matches.iter().find(|m| m.fingerprint() == fingerprint)
    }

    pub fn involving<'a>(&'a self, party: &'a str) -> impl Iterator<Item = &'a DonationMatch> + 'a {
        self.matches.iter().filter(move |m| m.involves(party))
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// TESTS
// ============================================================================
