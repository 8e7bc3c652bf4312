use std::path::Path;

use serde::{Deserialize, Serialize};
use tally_core::{Cell, Table, TransactionHead};
use thiserror::Error;

use crate::extract::NameExtractor;
use crate::normalize::{normalize, normalize_cell};
use crate::source::{load_table, ReadOptions, TableError};

pub const KEYWORD_COLUMN: &str = "Keyword";
pub const HEAD_COLUMN: &str = "Transaction_Head";
pub const EXTRACT_COLUMN: &str = "Extract_Client_Name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub keyword: String,
    pub transaction_head: String,
    #[serde(default)]
    pub extract_client_name: bool,
}

impl Rule {
    pub fn new(keyword: &str, transaction_head: &str, extract_client_name: bool) -> Self {
        Self {
            keyword: keyword.to_string(),
            transaction_head: transaction_head.to_string(),
            extract_client_name,
        }
    }
}

/// Outcome of matching one narration: the label to write and whether any
/// rule fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub head: TransactionHead,
    pub matched: bool,
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read rule table: {0}")]
    Table(#[from] TableError),
    #[error("Rule table is missing the {0} column")]
    MissingColumn(&'static str),
    #[error("Failed to parse TOML rules: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(rename = "rule", default)]
    rules: Vec<Rule>,
}

/// Internal pairing of a rule with its normalized keyword.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    needle: String,
}

/// An ordered rule list. The first rule whose keyword occurs in the
/// narration wins; later rules are never consulted.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    extractor: NameExtractor,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let needle = normalize(&rule.keyword);
                CompiledRule { rule, needle }
            })
            .collect();
        Self {
            rules,
            extractor: NameExtractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: NameExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(Self::new(file.rules))
    }

    /// Reads `Keyword`, `Transaction_Head` and the optional
    /// `Extract_Client_Name` (`YES` enables extraction) columns.
    pub fn from_table(table: &Table) -> Result<Self, RuleError> {
        let keyword_col = table
            .column_index(KEYWORD_COLUMN)
            .ok_or(RuleError::MissingColumn(KEYWORD_COLUMN))?;
        let head_col = table
            .column_index(HEAD_COLUMN)
            .ok_or(RuleError::MissingColumn(HEAD_COLUMN))?;
        let extract_col = table.column_index(EXTRACT_COLUMN);

        let rules: Vec<Rule> = (0..table.len())
            .map(|row| Rule {
                keyword: table.cell(row, keyword_col).to_string().trim().to_string(),
                transaction_head: table.cell(row, head_col).to_string().trim().to_string(),
                extract_client_name: extract_col
                    .is_some_and(|col| parse_extract_flag(table.cell(row, col))),
            })
            .collect();

        for (idx, rule) in rules.iter().enumerate() {
            if normalize(&rule.keyword).is_empty() {
                tracing::debug!("Rule {} has a blank keyword and will never match", idx + 1);
            }
        }

        Ok(Self::new(rules))
    }

    pub fn find_matching_rule(&self, narration: &str) -> Option<&Rule> {
        let narration = normalize(narration);
        self.rules
            .iter()
            .find(|cr| !cr.needle.is_empty() && narration.contains(&cr.needle))
            .map(|cr| &cr.rule)
    }

    pub fn match_narration(&self, narration: &str) -> RuleMatch {
        let Some(rule) = self.find_matching_rule(narration) else {
            return RuleMatch {
                head: TransactionHead::ReviewRequired,
                matched: false,
            };
        };

        if rule.extract_client_name {
            let name = self.extractor.extract(narration);
            if !name.is_empty() {
                return RuleMatch {
                    head: TransactionHead::Counterparty(name),
                    matched: true,
                };
            }
        }

        let label = rule.transaction_head.trim();
        let head = if label.is_empty() {
            TransactionHead::ReviewRequired
        } else {
            TransactionHead::Rule(label.to_string())
        };
        RuleMatch { head, matched: true }
    }
}

fn parse_extract_flag(cell: &Cell) -> bool {
    normalize_cell(cell) == "YES"
}

/// Loads a rule file: `.toml` holds `[[rule]]` entries, anything else is read
/// as a table.
pub fn load_rules(path: &Path, options: &ReadOptions) -> Result<RuleSet, RuleError> {
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let rules = if is_toml {
        RuleSet::from_toml(&std::fs::read_to_string(path)?)?
    } else {
        RuleSet::from_table(&load_table(path, options)?)?
    };
    tracing::info!("Loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}
