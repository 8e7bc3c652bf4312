use serde::Serialize;
use std::fmt;

use crate::table::Cell;

/// Label given to rows no rule could classify.
pub const REVIEW_REQUIRED: &str = "Review Required";
/// Label given to rows paired as a transfer between own accounts.
pub const INTERBANK: &str = "Interbank";

/// The category ("transaction head") assigned to a statement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "label", rename_all = "snake_case")]
pub enum TransactionHead {
    /// Label taken verbatim from the matching rule.
    Rule(String),
    /// Counterparty name extracted from the narration.
    Counterparty(String),
    ReviewRequired,
    Interbank,
}

impl TransactionHead {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionHead::Rule(label) => label,
            TransactionHead::Counterparty(name) => name,
            TransactionHead::ReviewRequired => REVIEW_REQUIRED,
            TransactionHead::Interbank => INTERBANK,
        }
    }

    pub fn is_review_required(&self) -> bool {
        matches!(self, TransactionHead::ReviewRequired)
    }

    pub fn to_cell(&self) -> Cell {
        Cell::text(self.as_str())
    }
}

impl fmt::Display for TransactionHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
