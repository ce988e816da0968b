mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::model::{DeclarationKey, Package};
use crate::shaker::ShakeOutcome;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

impl ReportFormat {
    /// Parse the config file spelling; unknown names fall back to terminal
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => ReportFormat::Json,
            _ => ReportFormat::Terminal,
        }
    }
}

/// A kept declaration holding a type the generator cannot render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnrepresentableWarning {
    pub declaration: DeclarationKey,
    /// Empty for aliases
    pub field: String,
    /// What is in the way (`func`, `chan`, ...)
    pub obstruction: String,
}

impl UnrepresentableWarning {
    pub fn message(&self) -> String {
        if self.field.is_empty() {
            format!("{} is a {} type", self.declaration, self.obstruction)
        } else {
            format!(
                "{} field {} has a {} type",
                self.declaration, self.field, self.obstruction
            )
        }
    }
}

/// Collect unrepresentable types among kept declarations.
///
/// Reporters decide how to surface them: the terminal report prints them,
/// the JSON report embeds them and logs them to stderr.
pub fn unrepresentable_warnings(packages: &[Package]) -> Vec<UnrepresentableWarning> {
    let mut warnings = Vec::new();

    for pkg in packages {
        for decl in &pkg.declarations {
            for (field, obstruction) in decl.unrepresentable() {
                let warning = UnrepresentableWarning {
                    declaration: pkg.key(decl),
                    field: field.to_string(),
                    obstruction: obstruction.to_string(),
                };
                warnings.push(warning);
            }
        }
    }

    warnings
}

/// Reporter for shake results
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
    show_kept: bool,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
            show_kept: false,
        }
    }

    pub fn with_show_kept(mut self, show: bool) -> Self {
        self.show_kept = show;
        self
    }

    /// Report the outcome of a shake
    pub fn report(&self, outcome: &ShakeOutcome) -> Result<()> {
        match &self.format {
            ReportFormat::Terminal => {
                let reporter = TerminalReporter::new().with_kept(self.show_kept);
                reporter.report(outcome)
            }
            ReportFormat::Json => {
                let reporter = JsonReporter::new(self.output_path.clone());
                reporter.report(outcome)
            }
        }
    }
}
