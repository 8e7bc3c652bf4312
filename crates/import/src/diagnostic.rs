use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem met during a run. Runs always produce a result;
/// diagnostics explain why some or all rows fell back to default labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The rule table is absent or unreadable.
    MissingResource { message: String },
    /// A required column could not be located in a table.
    MissingColumn { table: String, message: String },
    /// Pairwise matching needs exactly two statements.
    WrongStatementCount { expected: usize, found: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::MissingResource { .. } => Severity::Warning,
            Diagnostic::MissingColumn { .. } | Diagnostic::WrongStatementCount { .. } => {
                Severity::Error
            }
        }
    }

    /// Emits the diagnostic through `tracing` at its severity.
    pub(crate) fn log(&self) {
        match self.severity() {
            Severity::Warning => tracing::warn!("{self}"),
            Severity::Error => tracing::error!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingResource { message } => write!(f, "Rule table unavailable: {message}"),
            Diagnostic::MissingColumn { table, message } => write!(f, "{table}: {message}"),
            Diagnostic::WrongStatementCount { expected, found } => write!(
                f,
                "Pairwise matching needs exactly {expected} statements, got {found}"
            ),
        }
    }
}
