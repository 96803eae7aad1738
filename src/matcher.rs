// 🔗 Matching Engine - Pair deposits with same-amount withdrawals
//
// For each withdrawal, every deposit of exactly the same amount dated within
// the lookback window [withdrawal - 15d, withdrawal] is a candidate source.
// Per depositing party only the earliest qualifying deposit counts.
// Identical match tuples are then folded into one entry whose amount is
// scaled by the number of times the tuple occurred.

use crate::transaction::Transaction;
use crate::window::{offset_date, validate_span, WindowError, DEFAULT_EXTENSION_DAYS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use tracing::debug;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 15;

/// Bit pattern used for exact amount equality. `-0.0` folds into `0.0`.
fn amount_bits(amount: f64) -> u64 {
    (amount + 0.0).to_bits()
}

// ============================================================================
// MATCH KEY
// ============================================================================

/// One logical deposit → withdrawal match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchKey {
    pub deposit_party: String,
    pub amount: f64,
    pub deposit_date: NaiveDate,
    pub withdrawal_party: String,
    pub withdrawal_date: NaiveDate,
}

impl PartialEq for MatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.deposit_party == other.deposit_party
            && amount_bits(self.amount) == amount_bits(other.amount)
            && self.deposit_date == other.deposit_date
            && self.withdrawal_party == other.withdrawal_party
            && self.withdrawal_date == other.withdrawal_date
    }
}

impl Eq for MatchKey {}

impl Hash for MatchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.deposit_party.hash(state);
        amount_bits(self.amount).hash(state);
        self.deposit_date.hash(state);
        self.withdrawal_party.hash(state);
        self.withdrawal_date.hash(state);
    }
}

impl MatchKey {
    /// Stable identifier for addressing a match from the presenters
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.deposit_party,
            self.amount + 0.0,
            self.deposit_date,
            self.withdrawal_party,
            self.withdrawal_date
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// MATCH COUNT
// ============================================================================

/// Occurrence count per match key, iterated in first-seen order
#[derive(Debug, Clone, Default)]
pub struct MatchCount {
    order: Vec<MatchKey>,
    counts: HashMap<MatchKey, usize>,
}

impl MatchCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: MatchKey) {
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.clone(), 1);
                self.order.push(key);
            }
        }
    }

    pub fn count(&self, key: &MatchKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchKey, usize)> + '_ {
        self.order.iter().map(move |key| (key, self.count(key)))
    }

    pub fn into_matches(self) -> Vec<DonationMatch> {
        let MatchCount { order, counts } = self;
        order
            .into_iter()
            .map(|key| {
                let occurrences = counts.get(&key).copied().unwrap_or(1);
                DonationMatch::new(key, occurrences)
            })
            .collect()
    }
}

impl FromIterator<MatchKey> for MatchCount {
    fn from_iter<I: IntoIterator<Item = MatchKey>>(iter: I) -> Self {
        let mut counts = MatchCount::new();
        for key in iter {
            counts.record(key);
        }
        counts
    }
}

// ============================================================================
// DONATION MATCH
// ============================================================================

/// A consolidated match. `donated_amount` is the unit amount times occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationMatch {
    #[serde(flatten)]
    pub key: MatchKey,
    pub occurrences: usize,
    pub donated_amount: f64,
}

impl DonationMatch {
    pub fn new(key: MatchKey, occurrences: usize) -> Self {
        let donated_amount = key.amount * occurrences as f64;
        DonationMatch {
            key,
            occurrences,
            donated_amount,
        }
    }

    pub fn fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    /// True if `party` is on either side of the match
    pub fn involves(&self, party: &str) -> bool {
        self.key.deposit_party == party || self.key.withdrawal_party == party
    }

    pub fn summary(&self) -> String {
        let amount = self.donated_amount;
        format!(
            "{} deposited Rs. {} on {}. and {} withdrew Rs.{} on {}. So this could mean that {} got {} donation.",
            self.key.deposit_party,
            amount,
            self.key.deposit_date,
            self.key.withdrawal_party,
            amount,
            self.key.withdrawal_date,
            self.key.withdrawal_party,
            amount
        )
    }
}

// ============================================================================
// DEPOSIT INDEX
// ============================================================================

/// Deposits bucketed by exact amount, each bucket sorted by date
struct DepositIndex<'a> {
    by_amount: HashMap<u64, Vec<&'a Transaction>>,
}

impl<'a> DepositIndex<'a> {
    fn build(deposits: &'a [Transaction]) -> Self {
        let mut by_amount: HashMap<u64, Vec<&'a Transaction>> = HashMap::new();

        for deposit in deposits {
            assert!(
                deposit.is_deposit(),
                "withdrawal on line {} passed as a deposit",
                deposit.line_number
            );
            by_amount.entry(amount_bits(deposit.amount)).or_default().push(deposit);
        }

        // Stable sort keeps source order among same-day deposits
        for bucket in by_amount.values_mut() {
            bucket.sort_by_key(|tx| tx.date);
        }

        DepositIndex { by_amount }
    }

    /// Deposits of exactly `amount` dated in `[from, to]`
    fn eligible(&self, amount: f64, from: NaiveDate, to: NaiveDate) -> &[&'a Transaction] {
        let Some(bucket) = self.by_amount.get(&amount_bits(amount)) else {
            return &[];
        };

        let lo = bucket.partition_point(|tx| tx.date < from);
        let hi = bucket.partition_point(|tx| tx.date <= to);
        if lo >= hi {
            return &[];
        }
        &bucket[lo..hi]
    }
}

// ============================================================================
// MATCHING ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingEngine {
    /// How far before a withdrawal a deposit may be dated (default: 15)
    pub lookback_days: i64,

    /// Withdrawals dated after end_date + this many days are skipped (default: 15)
    pub extension_days: i64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        MatchingEngine {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            extension_days: DEFAULT_EXTENSION_DAYS,
        }
    }

    pub fn with_windows(lookback_days: i64, extension_days: i64) -> Result<Self, WindowError> {
        Ok(MatchingEngine {
            lookback_days: validate_span("lookback", lookback_days)?,
            extension_days: validate_span("extension", extension_days)?,
        })
    }

    /// Every (deposit group, withdrawal group) pairing, across all withdrawals
    pub fn find_raw_matches(
        &self,
        deposits: &[Transaction],
        withdrawals: &[Transaction],
        end_date: NaiveDate,
    ) -> Vec<MatchKey> {
        let index = DepositIndex::build(deposits);
        let cutoff = offset_date(end_date, self.extension_days);
        let mut raw = Vec::new();

        for withdrawal in withdrawals {
            assert!(
                withdrawal.is_withdrawal(),
                "deposit on line {} passed as a withdrawal",
                withdrawal.line_number
            );

            // Guard holds even when withdrawals did not come from the window filter
            if withdrawal.date > cutoff {
                debug!(
                    party = %withdrawal.party,
                    date = %withdrawal.date,
                    %cutoff,
                    "withdrawal past cutoff, skipped"
                );
                continue;
            }

            let earliest = offset_date(withdrawal.date, self.lookback_days.saturating_neg());
            let eligible = index.eligible(withdrawal.amount, earliest, withdrawal.date);

            // (party, amount) → earliest date; amount is fixed per withdrawal
            let mut deposit_groups: BTreeMap<&str, NaiveDate> = BTreeMap::new();
            for deposit in eligible {
                deposit_groups
                    .entry(deposit.party.as_str())
                    .and_modify(|date| *date = (*date).min(deposit.date))
                    .or_insert(deposit.date);
            }

            let withdrawal_groups = [(withdrawal.party.as_str(), withdrawal.date)];

            for (deposit_party, deposit_date) in &deposit_groups {
                for (withdrawal_party, withdrawal_date) in &withdrawal_groups {
                    raw.push(MatchKey {
                        deposit_party: deposit_party.to_string(),
                        amount: withdrawal.amount,
                        deposit_date: *deposit_date,
                        withdrawal_party: withdrawal_party.to_string(),
                        withdrawal_date: *withdrawal_date,
                    });
                }
            }
        }

        debug!(
            deposits = deposits.len(),
            withdrawals = withdrawals.len(),
            raw_matches = raw.len(),
            "paired deposits with withdrawals"
        );

        raw
    }

    pub fn consolidate(&self, raw: Vec<MatchKey>) -> MatchCount {
        raw.into_iter().collect()
    }

    pub fn find_matches(
        &self,
        deposits: &[Transaction],
        withdrawals: &[Transaction],
        end_date: NaiveDate,
    ) -> Vec<DonationMatch> {
        let raw = self.find_raw_matches(deposits, withdrawals, end_date);
        self.consolidate(raw).into_matches()
    }

    /// Human-readable summary, one line per consolidated match
    pub fn match_transactions(
        &self,
        deposits: &[Transaction],
        withdrawals: &[Transaction],
        end_date: NaiveDate,
    ) -> Vec<String> {
        self.find_matches(deposits, withdrawals, end_date)
            .iter()
            .map(DonationMatch::summary)
            .collect()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Summaries using the default 15-day windows
pub fn match_transactions(
    deposits: &[Transaction],
    withdrawals: &[Transaction],
    end_date: NaiveDate,
) -> Vec<String> {
    MatchingEngine::new().match_transactions(deposits, withdrawals, end_date)
}

// ============================================================================
// TESTS
// ============================================================================
