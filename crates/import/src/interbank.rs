use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::{Cell, ColumnAliases, Money, Table, TransactionHead};

use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Pairwise for exactly two statements, grouped otherwise.
    #[default]
    Auto,
    Pairwise,
    Grouped,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(MatchMode::Auto),
            "pairwise" => Ok(MatchMode::Pairwise),
            "grouped" => Ok(MatchMode::Grouped),
            other => Err(format!("Unknown match mode: '{other}'")),
        }
    }
}

/// How two amounts are compared in pairwise mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
    /// Absolute difference strictly below the tolerance.
    Within(Money),
    /// Equal after rounding to two places; duplicate records are dropped.
    Exact,
}

impl AmountRule {
    fn equal(self, a: Money, b: Money) -> bool {
        match self {
            AmountRule::Within(tolerance) => (a - b).abs() < tolerance,
            AmountRule::Exact => a == b,
        }
    }
}

impl Default for AmountRule {
    fn default() -> Self {
        AmountRule::Within(Money::from_cents(100))
    }
}

/// Position of a row: statement index, then row index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowRef {
    pub statement: usize,
    pub row: usize,
}

/// One statement row reduced to what matching needs. Unparsable dates and
/// amounts are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementEntry {
    pub at: RowRef,
    pub date: Option<NaiveDate>,
    pub payment: Option<Money>,
    pub receipt: Option<Money>,
}

impl StatementEntry {
    /// Present and non-zero. A `0` amount means "no movement on this side",
    /// so it is treated like a missing value and never compared.
    fn payment(&self) -> Option<Money> {
        self.payment.filter(|m| !m.is_zero())
    }

    /// Present and non-zero, as for `payment`.
    fn receipt(&self) -> Option<Money> {
        self.receipt.filter(|m| !m.is_zero())
    }

    /// Debit+credit with missing sides counted as zero.
    fn combined_amount(&self) -> Money {
        self.payment.unwrap_or_else(Money::zero) + self.receipt.unwrap_or_else(Money::zero)
    }

    fn side(&self) -> Option<Side> {
        match (self.payment(), self.receipt()) {
            (Some(_), None) => Some(Side::Debit),
            (None, Some(_)) => Some(Side::Credit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Debit,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterbankMatch {
    pub date: NaiveDate,
    pub amount: Money,
    pub head: TransactionHead,
    /// The paying row, then the receiving row.
    pub rows: [RowRef; 2],
}

#[derive(Debug, Clone, Default)]
pub struct InterbankReport {
    /// The strategy actually run; never `Auto`.
    pub mode: MatchMode,
    pub matches: Vec<InterbankMatch>,
    pub diagnostics: Vec<Diagnostic>,
}

impl InterbankReport {
    /// Every row taking part in at least one match.
    pub fn tagged(&self) -> HashSet<RowRef> {
        self.matches.iter().flat_map(|m| m.rows).collect()
    }

    /// The `{Date, Amount, Transaction_Head}` report table.
    pub fn to_table(&self) -> Table {
        Table::with_rows(
            vec!["Date".into(), "Amount".into(), "Transaction_Head".into()],
            self.matches
                .iter()
                .map(|m| {
                    vec![
                        Cell::Date(m.date),
                        Cell::Text(m.amount.to_string()),
                        m.head.to_cell(),
                    ]
                })
                .collect(),
        )
    }

    /// Copies of `statements` with `column` set to `Interbank` on matched
    /// rows. Other rows keep their existing label, or get `Review Required`
    /// when the column is new.
    pub fn tag_statements(&self, statements: &[Table], column: &str) -> Vec<Table> {
        let tagged = self.tagged();
        statements
            .iter()
            .enumerate()
            .map(|(statement, table)| {
                let existing = table.column_index(column);
                let values = (0..table.len())
                    .map(|row| {
                        if tagged.contains(&RowRef { statement, row }) {
                            return TransactionHead::Interbank.to_cell();
                        }
                        match existing.map(|col| table.cell(row, col)) {
                            Some(cell) if !cell.is_empty() => cell.clone(),
                            _ => TransactionHead::ReviewRequired.to_cell(),
                        }
                    })
                    .collect();
                let mut out = table.clone();
                out.set_column(column, values);
                out
            })
            .collect()
    }
}

pub struct InterbankMatcher {
    pub mode: MatchMode,
    pub amount_rule: AmountRule,
    pub aliases: ColumnAliases,
}

impl Default for InterbankMatcher {
    fn default() -> Self {
        Self {
            mode: MatchMode::Auto,
            amount_rule: AmountRule::default(),
            aliases: ColumnAliases::default(),
        }
    }
}

impl InterbankMatcher {
    pub fn new(mode: MatchMode, amount_rule: AmountRule) -> Self {
        Self {
            mode,
            amount_rule,
            ..Self::default()
        }
    }

    pub fn with_aliases(mut self, aliases: ColumnAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Detects interbank transfers across `statements`. A statement whose
    /// columns cannot be located contributes no rows.
    pub fn detect(&self, statements: &[Table]) -> InterbankReport {
        let mut diagnostics = Vec::new();
        let entries: Vec<Vec<StatementEntry>> = statements
            .iter()
            .enumerate()
            .map(|(idx, table)| match self.prepare(idx, table) {
                Ok(entries) => entries,
                Err(d) => {
                    diagnostics.push(d);
                    Vec::new()
                }
            })
            .collect();

        let (mode, matches) = match (self.mode, statements.len()) {
            (MatchMode::Auto, 2) | (MatchMode::Pairwise, 2) => {
                (MatchMode::Pairwise, self.pairwise(&entries[0], &entries[1]))
            }
            (MatchMode::Pairwise, found) => {
                diagnostics.push(Diagnostic::WrongStatementCount { expected: 2, found });
                (MatchMode::Pairwise, Vec::new())
            }
            (MatchMode::Auto, _) | (MatchMode::Grouped, _) => {
                (MatchMode::Grouped, self.grouped(entries.iter().flatten()))
            }
        };
        diagnostics.iter().for_each(Diagnostic::log);

        tracing::info!(
            "Interbank detection ({:?}) over {} statements: {} matches",
            mode,
            statements.len(),
            matches.len()
        );
        InterbankReport {
            mode,
            matches,
            diagnostics,
        }
    }

    pub fn prepare(&self, idx: usize, table: &Table) -> Result<Vec<StatementEntry>, Diagnostic> {
        let cols = self
            .aliases
            .resolve_statement(table.headers())
            .map_err(|e| Diagnostic::MissingColumn {
                table: format!("statement {}", idx + 1),
                message: e.to_string(),
            })?;

        let entries: Vec<StatementEntry> = (0..table.len())
            .map(|row| StatementEntry {
                at: RowRef { statement: idx, row },
                date: table.cell(row, cols.date).as_date(),
                payment: table.cell(row, cols.payment).as_money(),
                receipt: table.cell(row, cols.receipt).as_money(),
            })
            .collect();

        let bad_dates = entries
            .iter()
            .filter(|e| e.date.is_none() && !table.cell(e.at.row, cols.date).is_empty())
            .count();
        if bad_dates > 0 {
            tracing::debug!("Statement {}: {} rows with unparsable dates skipped", idx + 1, bad_dates);
        }
        Ok(entries)
    }

    /// Compares every row of `a` with every row of `b` on the same date. Each
    /// satisfied direction (A pays/B receives, A receives/B pays) yields one
    /// record carrying A's amount.
    pub fn pairwise(&self, a: &[StatementEntry], b: &[StatementEntry]) -> Vec<InterbankMatch> {
        let mut matches = Vec::new();
        let mut seen = HashSet::new();

        for ea in a {
            let Some(date) = ea.date else { continue };
            for eb in b.iter().filter(|eb| eb.date == Some(date)) {
                if let Some(m) = self.score_pair(date, ea, eb, ea.payment(), eb.receipt()) {
                    matches.push(m);
                }
                if let Some(m) = self.score_pair(date, eb, ea, ea.receipt(), eb.payment()) {
                    matches.push(m);
                }
            }
        }

        if self.amount_rule == AmountRule::Exact {
            matches.retain(|m| seen.insert((m.date, m.amount)));
        }
        matches
    }

    /// Returns a match if both amounts are present and equal under the
    /// amount rule. `amount` is statement A's side and becomes the record's
    /// amount.
    fn score_pair(
        &self,
        date: NaiveDate,
        payer: &StatementEntry,
        receiver: &StatementEntry,
        amount: Option<Money>,
        other: Option<Money>,
    ) -> Option<InterbankMatch> {
        let (amount, other) = (amount?, other?);
        if !self.amount_rule.equal(amount, other) {
            return None;
        }
        tracing::debug!("Matched {:?} -> {:?} on {} for {}", payer.at, receiver.at, date, amount);
        Some(InterbankMatch {
            date,
            amount,
            head: TransactionHead::Interbank,
            rows: [payer.at, receiver.at],
        })
    }

    /// Groups all rows by `(date, debit+credit)`. Only groups of exactly one
    /// debit and one credit are tagged; larger groups are ambiguous.
    pub fn grouped<'a>(
        &self,
        entries: impl Iterator<Item = &'a StatementEntry>,
    ) -> Vec<InterbankMatch> {
        let mut groups: BTreeMap<(NaiveDate, Money), Vec<&StatementEntry>> = BTreeMap::new();
        for entry in entries {
            if let Some(date) = entry.date {
                groups
                    .entry((date, entry.combined_amount()))
                    .or_default()
                    .push(entry);
            }
        }

        groups
            .into_iter()
            .filter_map(|((date, amount), group)| {
                let [first, second] = group.as_slice() else {
                    if group.len() > 2 {
                        tracing::debug!("{} rows share {} / {}; left untagged", group.len(), date, amount);
                    }
                    return None;
                };
                let (debit, credit) = match (first.side()?, second.side()?) {
                    (Side::Debit, Side::Credit) => (first, second),
                    (Side::Credit, Side::Debit) => (second, first),
                    _ => return None,
                };
                Some(InterbankMatch {
                    date,
                    amount,
                    head: TransactionHead::Interbank,
                    rows: [debit.at, credit.at],
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount(cell: &str) -> Cell {
        Cell::from(cell)
    }

    /// Builds a statement from `(date, payment, receipt)` text triples.
    fn statement(rows: &[(&str, &str, &str)]) -> Table {
        Table::with_rows(
            vec!["Date".into(), "Narration".into(), "Payment".into(), "Receipt".into()],
            rows.iter()
                .map(|(d, p, r)| vec![Cell::from(*d), Cell::text("X"), amount(p), amount(r)])
                .collect(),
        )
    }

    fn pairwise() -> InterbankMatcher {
        InterbankMatcher::new(MatchMode::Pairwise, AmountRule::default())
    }

    fn grouped() -> InterbankMatcher {
        InterbankMatcher::new(MatchMode::Grouped, AmountRule::default())
    }

    #[test]
    fn pairwise_payment_matches_receipt_on_same_date() {
        let a = statement(&[("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let report = pairwise().detect(&[a, b]);
        assert_eq!(report.matches.len(), 1);
        let m = &report.matches[0];
        assert_eq!(m.date, date(2024, 1, 5));
        assert_eq!(m.amount, Money::from_cents(100_000));
        assert_eq!(m.head, TransactionHead::Interbank);
        assert_eq!(m.rows, [RowRef { statement: 0, row: 0 }, RowRef { statement: 1, row: 0 }]);
    }

    #[test]
    fn pairwise_different_date_does_not_match() {
        let a = statement(&[("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-06", "", "1000")]);
        assert!(pairwise().detect(&[a, b]).matches.is_empty());
    }

    #[test]
    fn pairwise_reverse_direction() {
        let a = statement(&[("2024-01-05", "", "250.00")]);
        let b = statement(&[("05/01/2024", "250", "")]);
        let report = pairwise().detect(&[a, b]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].rows[0], RowRef { statement: 1, row: 0 });
    }

    #[test]
    fn pairwise_tolerance_is_strictly_below_one() {
        let a = statement(&[("2024-01-05", "1000", ""), ("2024-01-05", "2000", "")]);
        let b = statement(&[("2024-01-05", "", "1000.99"), ("2024-01-05", "", "2001")]);
        let report = pairwise().detect(&[a, b]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].amount, Money::from_cents(100_000));
    }

    #[test]
    fn pairwise_missing_amounts_never_match() {
        let a = statement(&[("2024-01-05", "", ""), ("2024-01-05", "n/a", "")]);
        let b = statement(&[("2024-01-05", "", ""), ("2024-01-05", "", "0")]);
        assert!(pairwise().detect(&[a, b]).matches.is_empty());
    }

    #[test]
    fn unparsable_dates_never_match() {
        let a = statement(&[("garbage", "1000", ""), ("", "1000", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        for mode in [MatchMode::Pairwise, MatchMode::Grouped] {
            let matcher = InterbankMatcher::new(mode, AmountRule::default());
            let report = matcher.detect(&[a.clone(), b.clone()]);
            assert!(report.matches.is_empty(), "{mode:?}");
            assert!(report.diagnostics.is_empty(), "{mode:?}");
        }
    }

    #[test]
    fn unparsable_date_row_does_not_block_valid_rows() {
        let a = statement(&[("garbage", "1000", ""), ("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let report = pairwise().detect(&[a, b]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].rows[0], RowRef { statement: 0, row: 1 });
    }

    #[test]
    fn pairwise_emits_one_record_per_satisfying_pair() {
        let a = statement(&[("2024-01-05", "500", "")]);
        let b = statement(&[("2024-01-05", "", "500"), ("2024-01-05", "", "500.40")]);
        assert_eq!(pairwise().detect(&[a, b]).matches.len(), 2);
    }

    #[test]
    fn exact_rule_rounds_and_dedupes() {
        let matcher = InterbankMatcher::new(MatchMode::Pairwise, AmountRule::Exact);
        let a = statement(&[("2024-01-05", "500", "")]);
        let b = statement(&[
            ("2024-01-05", "", "500.00"),
            ("2024-01-05", "", "500.001"),
            ("2024-01-05", "", "500.40"),
        ]);
        let report = matcher.detect(&[a, b]);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn pairwise_with_three_statements_is_diagnosed() {
        let s = statement(&[("2024-01-05", "1", "")]);
        let report = pairwise().detect(&[s.clone(), s.clone(), s]);
        assert!(report.matches.is_empty());
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::WrongStatementCount { expected: 2, found: 3 }]
        );
    }

    #[test]
    fn statement_without_columns_contributes_nothing() {
        let a = statement(&[("2024-01-05", "1000", "")]);
        let b = Table::with_rows(vec!["Narration".into()], vec![vec![Cell::text("X")]]);
        let report = pairwise().detect(&[a, b]);
        assert!(report.matches.is_empty());
        assert!(matches!(report.diagnostics[0], Diagnostic::MissingColumn { .. }));
    }

    #[test]
    fn grouped_tags_one_debit_and_one_credit() {
        let a = statement(&[("2024-01-05", "1000", ""), ("2024-01-07", "20", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let c = statement(&[("2024-01-09", "", "5")]);
        let report = grouped().detect(&[a, b, c]);
        assert_eq!(report.matches.len(), 1);
        let tagged = report.tagged();
        assert!(tagged.contains(&RowRef { statement: 0, row: 0 }));
        assert!(tagged.contains(&RowRef { statement: 1, row: 0 }));
        assert_eq!(tagged.len(), 2);
    }

    #[test]
    fn grouped_never_tags_groups_of_three() {
        let a = statement(&[("2024-01-05", "1000", ""), ("2024-01-05", "", "1000")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let report = grouped().detect(&[a, b]);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn grouped_needs_opposite_sides() {
        let a = statement(&[("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-05", "1000", "")]);
        assert!(grouped().detect(&[a, b]).matches.is_empty());
    }

    #[test]
    fn grouped_treats_missing_side_as_zero() {
        let a = statement(&[("2024-01-05", "1000", "0")]);
        let b = statement(&[("2024-01-05", "", "1,000.00")]);
        assert_eq!(grouped().detect(&[a, b]).matches.len(), 1);
    }

    #[test]
    fn grouped_works_within_a_single_statement() {
        let a = statement(&[("2024-01-05", "75", ""), ("2024-01-05", "", "75")]);
        let report = InterbankMatcher::default().detect(&[a]);
        assert_eq!(report.mode, MatchMode::Grouped);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn auto_mode_picks_pairwise_for_two_statements() {
        // Two rows in A share (date, amount) with B: pairwise still matches,
        // grouped would see a group of three.
        let a = statement(&[("2024-01-05", "1000", ""), ("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let report = InterbankMatcher::default().detect(&[a, b]);
        assert_eq!(report.mode, MatchMode::Pairwise);
        assert_eq!(report.matches.len(), 2);
    }

    #[test]
    fn report_table_has_three_columns() {
        let a = statement(&[("2024-01-05", "1000", "")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let table = pairwise().detect(&[a, b]).to_table();
        assert_eq!(table.headers(), &["Date", "Amount", "Transaction_Head"]);
        assert_eq!(table.cell(0, 0), &Cell::Date(date(2024, 1, 5)));
        assert_eq!(table.cell(0, 1), &Cell::text("1000.00"));
        assert_eq!(table.cell(0, 2), &Cell::text("Interbank"));
    }

    #[test]
    fn tag_statements_keeps_prior_labels() {
        let mut a = statement(&[("2024-01-05", "1000", ""), ("2024-01-06", "5", "")]);
        a.set_column("Transaction_Head", vec![Cell::text("Transfers"), Cell::text("Fees")]);
        let b = statement(&[("2024-01-05", "", "1000")]);
        let statements = vec![a, b];

        let report = grouped().detect(&statements);
        let tagged = report.tag_statements(&statements, "Transaction_Head");

        let col = tagged[0].column_index("Transaction_Head").unwrap();
        assert_eq!(tagged[0].cell(0, col), &Cell::text("Interbank"));
        assert_eq!(tagged[0].cell(1, col), &Cell::text("Fees"));
        let col = tagged[1].column_index("Transaction_Head").unwrap();
        assert_eq!(tagged[1].cell(0, col), &Cell::text("Interbank"));
    }

    #[test]
    fn tag_statements_defaults_untagged_rows_to_review() {
        let a = statement(&[("2024-01-05", "3", "")]);
        let report = InterbankReport::default();
        let tagged = report.tag_statements(&[a], "Transaction_Head");
        assert_eq!(tagged[0].cell(0, 4), &Cell::text("Review Required"));
    }

    #[test]
    fn match_mode_from_str() {
        assert_eq!("Grouped".parse::<MatchMode>().unwrap(), MatchMode::Grouped);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }
}
