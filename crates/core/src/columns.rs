use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Semantic statement fields located by header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Narration,
    Date,
    Payment,
    Receipt,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Narration => write!(f, "narration"),
            Field::Date => write!(f, "date"),
            Field::Payment => write!(f, "payment"),
            Field::Receipt => write!(f, "receipt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("No {field} column found (accepted: {accepted})")]
    NotFound { field: Field, accepted: String },
}

/// Ordered header aliases per field. A header matches an alias exactly
/// (case, whitespace and underscores ignored); failing that, the first header
/// containing any alias wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub narration: Vec<String>,
    pub date: Vec<String>,
    pub payment: Vec<String>,
    pub receipt: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }
        Self {
            narration: owned(&[
                "Narration",
                "Description",
                "Particulars",
                "Remarks",
                "Transaction Details",
            ]),
            date: owned(&["Date"]),
            payment: owned(&["Payment", "Debit", "Withdrawal"]),
            receipt: owned(&["Receipt", "Credit", "Deposit"]),
        }
    }
}

/// Column handles needed to read a statement for interbank matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementColumns {
    pub date: usize,
    pub payment: usize,
    pub receipt: usize,
}

impl ColumnAliases {
    pub fn aliases(&self, field: Field) -> &[String] {
        match field {
            Field::Narration => &self.narration,
            Field::Date => &self.date,
            Field::Payment => &self.payment,
            Field::Receipt => &self.receipt,
        }
    }

    pub fn resolve(&self, headers: &[String], field: Field) -> Result<usize, ColumnError> {
        self.resolve_excluding(headers, field, None)
    }

    pub fn resolve_statement(&self, headers: &[String]) -> Result<StatementColumns, ColumnError> {
        let date = self.resolve(headers, Field::Date)?;
        let payment = self.resolve_excluding(headers, Field::Payment, Some(date))?;
        let receipt = self
            .resolve_excluding(headers, Field::Receipt, Some(payment))
            .and_then(|col| {
                if col == date {
                    Err(self.not_found(Field::Receipt))
                } else {
                    Ok(col)
                }
            })?;
        Ok(StatementColumns { date, payment, receipt })
    }

    fn resolve_excluding(
        &self,
        headers: &[String],
        field: Field,
        taken: Option<usize>,
    ) -> Result<usize, ColumnError> {
        let wanted: Vec<String> = self
            .aliases(field)
            .iter()
            .map(|a| canonical(a))
            .filter(|a| !a.is_empty())
            .collect();
        let candidates: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != taken)
            .map(|(idx, h)| (idx, canonical(h)))
            .collect();

        let exact = wanted
            .iter()
            .find_map(|alias| candidates.iter().find(|(_, h)| h == alias));
        let found = exact
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(_, h)| wanted.iter().any(|alias| contains_word(h, alias)))
            })
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(_, h)| wanted.iter().any(|alias| h.contains(alias.as_str())))
            });

        found
            .map(|(idx, _)| *idx)
            .ok_or_else(|| self.not_found(field))
    }

    fn not_found(&self, field: Field) -> ColumnError {
        ColumnError::NotFound {
            field,
            accepted: self.aliases(field).join(", "),
        }
    }
}

/// Whether `alias` occurs in `header` bounded by spaces or the ends, so
/// `DATE` finds `VALUE DATE` but not `LAST UPDATED`.
fn contains_word(header: &str, alias: &str) -> bool {
    format!(" {header} ").contains(&format!(" {alias} "))
}

fn canonical(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn narration_exact_match_ignores_case_and_spacing() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Date", "  narration ", "Amount"]);
        assert_eq!(aliases.resolve(&h, Field::Narration), Ok(1));
    }

    #[test]
    fn exact_match_beats_earlier_substring() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Description Code", "Remarks"]);
        assert_eq!(aliases.resolve(&h, Field::Narration), Ok(1));
    }

    #[test]
    fn substring_match_takes_first_header() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Txn Narration Text", "Other"]);
        assert_eq!(aliases.resolve(&h, Field::Narration), Ok(0));
        let h = headers(&["Transaction_Details"]);
        assert_eq!(aliases.resolve(&h, Field::Narration), Ok(0));
    }

    #[test]
    fn missing_narration_reports_accepted_names() {
        let aliases = ColumnAliases::default();
        let err = aliases.resolve(&headers(&["Foo", "Bar"]), Field::Narration).unwrap_err();
        assert!(err.to_string().contains("Particulars"));
    }

    #[test]
    fn statement_columns_by_substring() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Txn Date", "Narration", "Debit Amount", "Credit Amount", "Balance"]);
        let cols = aliases.resolve_statement(&h).unwrap();
        assert_eq!(cols, StatementColumns { date: 0, payment: 2, receipt: 3 });
    }

    #[test]
    fn payment_and_receipt_must_differ() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Date", "Debit/Credit"]);
        assert!(matches!(
            aliases.resolve_statement(&h),
            Err(ColumnError::NotFound { field: Field::Receipt, .. })
        ));
    }

    #[test]
    fn partial_aliases_keep_defaults() {
        let aliases: ColumnAliases = serde_json::from_str(r#"{"narration": ["Memo"]}"#).unwrap();
        assert_eq!(aliases.resolve(&headers(&["memo"]), Field::Narration), Ok(0));
        // Unlisted fields keep their defaults.
        assert_eq!(aliases.date, vec!["Date".to_string()]);
    }

    #[test]
    fn whole_word_beats_earlier_substring() {
        let aliases = ColumnAliases::default();
        let h = headers(&["Last Updated", "Value Date", "Withdrawal Amt", "Deposit Amt"]);
        assert_eq!(aliases.resolve(&h, Field::Date), Ok(1));
        let cols = aliases.resolve_statement(&h).unwrap();
        assert_eq!(cols, StatementColumns { date: 1, payment: 2, receipt: 3 });
    }

    #[test]
    fn substring_still_used_without_whole_word() {
        let h = headers(&["Updated", "Narration"]);
        assert_eq!(ColumnAliases::default().resolve(&h, Field::Date), Ok(0));
    }
}
