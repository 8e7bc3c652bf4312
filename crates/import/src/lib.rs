pub mod classify;
pub mod csv;
pub mod diagnostic;
pub mod extract;
pub mod interbank;
pub mod normalize;
pub mod rules;
pub mod source;
pub mod workbook;

pub use classify::{Classification, Classifier, ClassifySummary, DEFAULT_CATEGORY_COLUMN};
pub use diagnostic::{Diagnostic, Severity};
pub use extract::NameExtractor;
pub use interbank::{
    AmountRule, InterbankMatch, InterbankMatcher, InterbankReport, MatchMode, RowRef,
};
pub use normalize::normalize;
pub use rules::{Rule, RuleError, RuleMatch, RuleSet};
pub use source::{ReadOptions, TableError, TableFormat};

pub mod import {
    use std::path::Path;

    use tally_core::{ColumnAliases, Table};

    use crate::*;

    pub fn load_table(path: &Path, options: &ReadOptions) -> Result<Table, TableError> {
        crate::source::load_table(path, options)
    }

    pub fn load_rules(path: &Path, options: &ReadOptions) -> Result<RuleSet, RuleError> {
        crate::rules::load_rules(path, options)
    }

    pub fn create_classifier(aliases: ColumnAliases, category_column: &str) -> Classifier {
        Classifier::new(aliases, category_column)
    }

    pub fn create_interbank_matcher(
        mode: MatchMode,
        amount_rule: AmountRule,
        aliases: ColumnAliases,
    ) -> InterbankMatcher {
        InterbankMatcher::new(mode, amount_rule).with_aliases(aliases)
    }
}
