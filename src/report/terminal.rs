use super::{unrepresentable_warnings, UnrepresentableWarning};
use crate::model::DeclarationKey;
use crate::shaker::ShakeOutcome;
use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// Also list what survived
    show_kept: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_kept: false }
    }

    pub fn with_kept(mut self, show: bool) -> Self {
        self.show_kept = show;
        self
    }

    pub fn report(&self, outcome: &ShakeOutcome) -> Result<()> {
        let warnings = unrepresentable_warnings(&outcome.packages);

        if outcome.removed.is_empty() {
            println!("{}", "Nothing to remove: every declaration is reachable.".green().bold());
        } else {
            println!();
            println!(
                "{}",
                format!("Removed {} unreachable declarations:", outcome.removed_count())
                    .yellow()
                    .bold()
            );
            println!();

            for (package, names) in group_by_package(&outcome.removed) {
                println!("{}", package.cyan().bold());
                for name in names {
                    println!("  {} {}", "-".red(), name);
                }
                println!();
            }
        }

        if self.show_kept {
            self.print_kept(outcome);
        }

        if !warnings.is_empty() {
            self.print_warnings(&warnings);
        }

        self.print_summary(outcome, warnings.len());
        Ok(())
    }

    fn print_kept(&self, outcome: &ShakeOutcome) {
        println!("{}", "Kept:".green().bold());
        for pkg in &outcome.packages {
            if pkg.is_empty() {
                println!("{} {}", pkg.path.cyan(), "(empty)".dimmed());
                continue;
            }
            println!("{}", pkg.path.cyan());
            for decl in &pkg.declarations {
                println!("  {} {}", "+".green(), decl.display());
            }
        }
        println!();
    }

    fn print_warnings(&self, warnings: &[UnrepresentableWarning]) {
        println!("{}", "Unrepresentable types:".yellow().bold());
        for warning in warnings {
            println!("  {} {}", "warning".yellow().bold(), warning.message());
        }
        println!();
    }

    fn print_summary(&self, outcome: &ShakeOutcome, warnings: usize) {
        println!("{}", "─".repeat(60).dimmed());

        let mut parts = vec![
            format!("{} kept", outcome.kept_count()).green().to_string(),
            format!("{} removed", outcome.removed_count()).red().to_string(),
            format!("{} packages", outcome.packages.len()),
        ];
        if warnings > 0 {
            parts.push(format!("{} warnings", warnings).yellow().to_string());
        }
        println!("Summary: {}", parts.join(", "));
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Removed names per package, packages sorted, names in removal order
fn group_by_package(removed: &[DeclarationKey]) -> BTreeMap<&str, Vec<&str>> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for key in removed {
        grouped.entry(key.package.as_str()).or_default().push(key.name.as_str());
    }
    grouped
}
