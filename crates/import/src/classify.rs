use serde::Serialize;
use tally_core::{ColumnAliases, Field, Table, TransactionHead};

use crate::diagnostic::Diagnostic;
use crate::normalize::normalize_cell;
use crate::rules::RuleSet;

pub const DEFAULT_CATEGORY_COLUMN: &str = "Transaction_Head";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifySummary {
    pub rows: usize,
    pub rule_labelled: usize,
    pub name_labelled: usize,
    pub review_required: usize,
}

impl ClassifySummary {
    fn record(&mut self, head: &TransactionHead) {
        self.rows += 1;
        match head {
            TransactionHead::Rule(_) | TransactionHead::Interbank => self.rule_labelled += 1,
            TransactionHead::Counterparty(_) => self.name_labelled += 1,
            TransactionHead::ReviewRequired => self.review_required += 1,
        }
    }
}

/// A classified statement: the input table with the category column
/// written, one head per row, and any diagnostics raised on the way.
#[derive(Debug, Clone)]
pub struct Classification {
    pub table: Table,
    pub heads: Vec<TransactionHead>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ClassifySummary,
}

pub struct Classifier {
    aliases: ColumnAliases,
    category_column: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            aliases: ColumnAliases::default(),
            category_column: DEFAULT_CATEGORY_COLUMN.to_string(),
        }
    }
}

impl Classifier {
    pub fn new(aliases: ColumnAliases, category_column: &str) -> Self {
        Self {
            aliases,
            category_column: category_column.to_string(),
        }
    }

    /// Labels every row of `table`. A missing rule set or narration column
    /// degrades every row to `Review Required` instead of failing; an
    /// existing category column is overwritten.
    pub fn classify(&self, table: Table, rules: Option<&RuleSet>) -> Classification {
        let mut diagnostics = Vec::new();

        let narration_col = match self.aliases.resolve(table.headers(), Field::Narration) {
            Ok(col) => Some(col),
            Err(e) => {
                diagnostics.push(Diagnostic::MissingColumn {
                    table: "statement".to_string(),
                    message: e.to_string(),
                });
                None
            }
        };
        if rules.is_none() {
            diagnostics.push(Diagnostic::MissingResource {
                message: "no rule table supplied".to_string(),
            });
        }
        diagnostics.iter().for_each(Diagnostic::log);

        let heads: Vec<TransactionHead> = match (narration_col, rules) {
            (Some(col), Some(rules)) => (0..table.len())
                .map(|row| {
                    let narration = normalize_cell(table.cell(row, col));
                    let m = rules.match_narration(&narration);
                    tracing::trace!("Row {}: '{}' -> {}", row + 1, narration, m.head);
                    m.head
                })
                .collect(),
            _ => vec![TransactionHead::ReviewRequired; table.len()],
        };

        let mut summary = ClassifySummary::default();
        heads.iter().for_each(|h| summary.record(h));

        let mut table = table;
        table.set_column(
            &self.category_column,
            heads.iter().map(TransactionHead::to_cell).collect(),
        );

        tracing::info!(
            "Classified {} rows: {} by rule, {} by name, {} need review",
            summary.rows,
            summary.rule_labelled,
            summary.name_labelled,
            summary.review_required
        );

        Classification {
            table,
            heads,
            diagnostics,
            summary,
        }
    }
}
