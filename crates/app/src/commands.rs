use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tally_core::Table;
use tally_import::csv::write_table;
use tally_import::import::{create_classifier, create_interbank_matcher, load_rules, load_table};
use tally_import::{Classification, InterbankReport, MatchMode, RuleSet};

use crate::config::Config;

pub const INTERBANK_REPORT_STEM: &str = "interbank_transactions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Bank statement (CSV or workbook)
    pub input: PathBuf,
    /// Rule table (CSV, workbook or TOML)
    #[arg(short, long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
    /// Defaults to `<stem>_classified.<ext>` next to the input
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
    /// Workbook sheet to read
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Debug, Args)]
pub struct InterbankArgs {
    /// Bank statements to compare
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// auto, pairwise or grouped
    #[arg(short, long)]
    pub mode: Option<MatchMode>,
    /// Require exact amounts and drop duplicate matches
    #[arg(long)]
    pub strict: bool,
    /// Classify each statement before matching
    #[arg(short, long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
    /// Defaults to `interbank_transactions.<ext>`
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Where tagged statements are written; grouped runs default to each
    /// input's directory
    #[arg(long, value_name = "DIR")]
    pub tagged_dir: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
    #[arg(long)]
    pub sheet: Option<String>,
}

pub fn classify(config: &Config, args: &ClassifyArgs) -> Result<Classification> {
    let options = config.read_options(args.sheet.as_deref());
    let table = load_table(&args.input, &options)
        .with_context(|| format!("read statement {}", args.input.display()))?;
    let rules = rule_set(config, args.rules.as_deref());

    let classifier = create_classifier(config.columns.clone(), &config.classify.category_column);
    let result = classifier.classify(table, rules.as_ref());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling(&args.input, "classified", args.format));
    write_output(&result.table, &output, args.format)?;

    println!(
        "{}: {} rows, {} by rule, {} by name, {} need review -> {}",
        args.input.display(),
        result.summary.rows,
        result.summary.rule_labelled,
        result.summary.name_labelled,
        result.summary.review_required,
        output.display()
    );
    Ok(result)
}

pub fn interbank(config: &Config, args: &InterbankArgs) -> Result<InterbankReport> {
    let options = config.read_options(args.sheet.as_deref());
    let mut statements = args
        .inputs
        .iter()
        .map(|path| {
            load_table(path, &options).with_context(|| format!("read statement {}", path.display()))
        })
        .collect::<Result<Vec<Table>>>()?;

    let category_column = config.classify.category_column.as_str();
    if args.rules.is_some() {
        let rules = rule_set(config, args.rules.as_deref());
        let classifier = create_classifier(config.columns.clone(), category_column);
        statements = statements
            .into_iter()
            .map(|table| classifier.classify(table, rules.as_ref()).table)
            .collect();
    }

    let matcher = create_interbank_matcher(
        args.mode.unwrap_or(config.interbank.mode),
        config.amount_rule(args.strict),
        config.columns.clone(),
    );
    let report = matcher.detect(&statements);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(INTERBANK_REPORT_STEM).with_extension(args.format.extension()));
    write_output(&report.to_table(), &output, args.format)?;
    println!(
        "{} interbank matches across {} statements -> {}",
        report.matches.len(),
        statements.len(),
        output.display()
    );

    if report.mode == MatchMode::Grouped || args.tagged_dir.is_some() {
        let tagged = report.tag_statements(&statements, category_column);
        for (input, table) in args.inputs.iter().zip(&tagged) {
            let path = match &args.tagged_dir {
                Some(dir) => {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("create {}", dir.display()))?;
                    dir.join(file_name(input, "interbank", args.format))
                }
                None => sibling(input, "interbank", args.format),
            };
            write_output(table, &path, args.format)?;
            println!("Tagged {} -> {}", input.display(), path.display());
        }
    }
    Ok(report)
}

/// Loads the rule table named on the command line or in the config. A
/// missing or unreadable table is reported and treated as absent.
fn rule_set(config: &Config, cli: Option<&Path>) -> Option<RuleSet> {
    let path = cli.or(config.classify.rules.as_deref())?;
    match load_rules(path, &config.rule_read_options()) {
        Ok(rules) => Some(rules.with_extractor(config.name_extractor())),
        Err(e) => {
            tracing::warn!("Could not load rules from {}: {}", path.display(), e);
            None
        }
    }
}

pub fn write_output(table: &Table, path: &Path, format: OutputFormat) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_table(table, &mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &table.to_records())?;
            writeln!(out)?;
        }
    }
    out.flush().with_context(|| format!("write {}", path.display()))?;
    tracing::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn file_name(input: &Path, suffix: &str, format: OutputFormat) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "statement".to_string());
    format!("{stem}_{suffix}.{}", format.extension())
}

fn sibling(input: &Path, suffix: &str, format: OutputFormat) -> PathBuf {
    input.with_file_name(file_name(input, suffix, format))
}
