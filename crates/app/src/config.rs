use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::{ColumnAliases, Money};
use tally_import::{AmountRule, MatchMode, NameExtractor, ReadOptions, DEFAULT_CATEGORY_COLUMN};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classify: ClassifySection,
    pub columns: ColumnAliases,
    pub extract: ExtractSection,
    pub interbank: InterbankSection,
    pub input: ReadOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifySection {
    /// Rule table used when `--rules` is not given.
    pub rules: Option<PathBuf>,
    /// Sheet of a workbook rule table; the first sheet when unset. `[input]`
    /// settings apply to statements only.
    pub rules_sheet: Option<String>,
    pub category_column: String,
}

impl Default for ClassifySection {
    fn default() -> Self {
        Self {
            rules: None,
            rules_sheet: None,
            category_column: DEFAULT_CATEGORY_COLUMN.to_string(),
        }
    }
}

/// Extra stop words and protocol markers, added to the built-in lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    pub stop_words: Vec<String>,
    pub protocol_markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterbankSection {
    pub mode: MatchMode,
    /// Pairwise amounts match when they differ by strictly less than this.
    pub tolerance: Decimal,
    /// Exact amounts with duplicate records dropped; overrides `tolerance`.
    pub strict: bool,
}

impl Default for InterbankSection {
    fn default() -> Self {
        Self {
            mode: MatchMode::Auto,
            tolerance: Decimal::ONE,
            strict: false,
        }
    }
}

impl Config {
    pub fn name_extractor(&self) -> NameExtractor {
        NameExtractor::new()
            .with_stop_words(&self.extract.stop_words)
            .with_protocol_markers(&self.extract.protocol_markers)
    }

    pub fn read_options(&self, sheet: Option<&str>) -> ReadOptions {
        let mut options = self.input.clone();
        if let Some(sheet) = sheet {
            options.sheet = Some(sheet.to_string());
        }
        options
    }

    /// Read options for the rule table. Rule files always start with their
    /// header row.
    pub fn rule_read_options(&self) -> ReadOptions {
        ReadOptions {
            sheet: self.classify.rules_sheet.clone(),
            skip_rows: 0,
        }
    }

    pub fn amount_rule(&self, strict: bool) -> AmountRule {
        if strict || self.interbank.strict {
            AmountRule::Exact
        } else {
            AmountRule::Within(Money::from_decimal(self.interbank.tolerance))
        }
    }
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config")
}

/// Loads `explicit` if given, else `tally.toml` from the working directory
/// if present, else the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                return Ok(Config::default());
            }
            p
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let config = parse_config(&s).with_context(|| format!("in {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}
