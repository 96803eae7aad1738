// 📒 Transaction Model - One row of the donation ledger
// Date, party, amount, and direction. Read once, never mutated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Direction of money movement for a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money received by a party (source tag: `Deposited`)
    Deposit,

    /// Money taken out by a party (source tag: `Withdrew`)
    Withdrawal,
}

impl TransactionType {
    pub const DEPOSIT_TAG: &'static str = "Deposited";
    pub const WITHDRAWAL_TAG: &'static str = "Withdrew";

    /// Parse the exact source tag. Case-sensitive, no trimming.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::DEPOSIT_TAG => Some(TransactionType::Deposit),
            Self::WITHDRAWAL_TAG => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }

    /// Tag as it appears in the source file
    pub fn tag(&self) -> &'static str {
        match self {
            TransactionType::Deposit => Self::DEPOSIT_TAG,
            TransactionType::Withdrawal => Self::WITHDRAWAL_TAG,
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// A single typed ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub party: String,

    /// Finite, non-negative. Thousands separators are stripped by the loader.
    pub amount: f64,

    pub transaction_type: TransactionType,

    /// 1-based row in the source file (0 when built in memory)
    #[serde(default)]
    pub line_number: usize,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        party: impl Into<String>,
        amount: f64,
        transaction_type: TransactionType,
    ) -> Self {
        Transaction {
            date,
            party: party.into(),
            amount,
            transaction_type,
            line_number: 0,
        }
    }

    pub fn deposit(date: NaiveDate, party: impl Into<String>, amount: f64) -> Self {
        Self::new(date, party, amount, TransactionType::Deposit)
    }

    pub fn withdrawal(date: NaiveDate, party: impl Into<String>, amount: f64) -> Self {
        Self::new(date, party, amount, TransactionType::Withdrawal)
    }

    /// Builder pattern: attach source line provenance
    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn is_deposit(&self) -> bool {
        self.transaction_type == TransactionType::Deposit
    }

    pub fn is_withdrawal(&self) -> bool {
        self.transaction_type == TransactionType::Withdrawal
    }
}

// ============================================================================
// TESTS
// ============================================================================
