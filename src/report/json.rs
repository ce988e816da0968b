use super::{unrepresentable_warnings, UnrepresentableWarning};
use crate::model::{DeclarationKey, Package};
use crate::shaker::ShakeOutcome;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// JSON reporter: the pruned model, ready for a code generator
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, outcome: &ShakeOutcome) -> Result<()> {
        let json = self.render(outcome)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            info!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }

    pub fn render(&self, outcome: &ShakeOutcome) -> Result<String> {
        let report = JsonReport::from_outcome(outcome);
        serde_json::to_string_pretty(&report).into_diagnostic()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    removed_count: usize,
    packages: &'a [Package],
    removed: &'a [DeclarationKey],
    unrepresentable: Vec<JsonWarning>,
}

#[derive(Serialize)]
struct JsonWarning {
    severity: &'static str,
    message: String,
    #[serde(flatten)]
    warning: UnrepresentableWarning,
}

impl<'a> JsonReport<'a> {
    fn from_outcome(outcome: &'a ShakeOutcome) -> Self {
        let unrepresentable = unrepresentable_warnings(&outcome.packages)
            .into_iter()
            .map(|warning| {
                let message = warning.message();
                warn!("{}", message);
                JsonWarning {
                    severity: "warning",
                    message,
                    warning,
                }
            })
            .collect();

        Self {
            version: "1",
            removed_count: outcome.removed_count(),
            packages: &outcome.packages,
            removed: &outcome.removed,
            unrepresentable,
        }
    }
}
