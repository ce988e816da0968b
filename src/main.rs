use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use miette::Result;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use typeshake::config::Config;
use typeshake::discovery::{resolve_entry, PackageFinder};
use typeshake::model::{declaration_count, DeclarationKey, Package};
use typeshake::parser::{collect_dependencies, load_packages, ParseOptions};
use typeshake::report::{ReportFormat, Reporter};
use typeshake::shaker::{CycleDetector, TreeShaker};

/// typeshake - Extract Go type models and drop what the entry packages never reach
#[derive(Parser, Debug)]
#[command(name = "typeshake")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Go module root
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Entry package (import path, or ./dir relative to the module); repeatable
    #[arg(short, long)]
    entry: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short = 'x', long)]
    exclude: Vec<String>,

    /// Module path, overriding go.mod
    #[arg(long)]
    module: Option<String>,

    /// Include packages under vendor/
    #[arg(long)]
    vendor: bool,

    /// Resolve same-package identifiers as references
    #[arg(long)]
    local_types: bool,

    /// Target OS for build constraints (default: $GOOS or the host)
    #[arg(long)]
    goos: Option<String>,

    /// Target architecture for build constraints (default: $GOARCH or the host)
    #[arg(long)]
    goarch: Option<String>,

    /// Extra build tags, comma separated
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Module cache directory (default: $GOMODCACHE or $GOPATH/pkg/mod)
    #[arg(long, value_name = "DIR")]
    modcache: Option<PathBuf>,

    /// Only load packages of this module, not of required modules
    #[arg(long)]
    no_deps: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Explain why a declaration is kept (PKG.Name); repeatable
    #[arg(long, value_name = "PKG.NAME")]
    explain: Vec<String>,

    /// Report reference cycles that were removed as a whole
    #[arg(long)]
    detect_cycles: bool,

    /// Print every parsed package and declaration before shaking
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("typeshake v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    run(&config, &cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.entry.is_empty() {
        config.entry_packages = cli.entry.clone();
    }
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    if cli.module.is_some() {
        config.module = cli.module.clone();
    }
    if cli.vendor {
        config.include_vendor = true;
    }
    if cli.local_types {
        config.resolve_local_types = true;
    }
    if cli.goos.is_some() {
        config.goos = cli.goos.clone();
    }
    if cli.goarch.is_some() {
        config.goarch = cli.goarch.clone();
    }
    config.build_tags.extend(cli.tags.iter().cloned());
    if cli.modcache.is_some() {
        config.module_cache = cli.modcache.clone();
    }
    if cli.no_deps {
        config.load_dependencies = false;
    }

    Ok(config)
}

fn run(config: &Config, cli: &Cli) -> Result<()> {
    let start_time = Instant::now();

    let format = match &cli.format {
        Some(format) => format.clone().into(),
        None => ReportFormat::from_name(&config.report.format),
    };
    let console = Console::for_format(&format);

    // Step 1: Discover packages
    info!("Discovering packages...");
    let finder = PackageFinder::new(config);
    let module = finder.module_path(&cli.path)?;
    let mut sources = finder.find_packages(&cli.path)?;

    info!("Found {} packages in module {}", sources.len(), module);

    if sources.is_empty() {
        console.line("No Go packages found.".yellow());
        return Ok(());
    }

    // Step 2: Entry packages
    let entries: HashSet<String> = config
        .entry_packages
        .iter()
        .map(|entry| resolve_entry(&module, entry))
        .collect();

    if entries.is_empty() {
        warn!("No entry packages given; every declaration will be removed");
    }

    // Step 3: Packages of required modules
    let options = ParseOptions::from_config(config);
    if config.load_dependencies && !entries.is_empty() {
        info!("Resolving imports of required modules...");
        let resolver = finder.module_resolver(&cli.path);
        let dependencies = collect_dependencies(&sources, &entries, &resolver, &options)?;
        sources.extend(dependencies);
    }

    // Step 4: Parse
    let spinner = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Parsing {} packages...", sources.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let parsed = load_packages(&sources, options);
    spinner.finish_and_clear();
    let packages = parsed?;

    info!(
        "Parsed {} declarations in {:.2}s",
        declaration_count(&packages),
        start_time.elapsed().as_secs_f64()
    );

    if cli.list {
        print_packages(console, &packages);
    }

    for entry in &entries {
        if !packages.iter().any(|p| &p.path == entry) {
            warn!("Entry package {} was not found", entry);
        }
    }

    let shaker = TreeShaker::new(entries);

    // Step 5: Diagnostics that need the unswept input
    {
        let reachability = shaker.analyze(&packages);

        for dangling in reachability.dangling() {
            debug!("Dangling reference: {}", dangling);
        }

        for target in &cli.explain {
            explain(console, &packages, &reachability, target);
        }

        if cli.detect_cycles {
            let cycles = CycleDetector::new().find_dead_cycles(&packages, &reachability);
            if cycles.is_empty() {
                console.line("No dead reference cycles.".green());
            } else {
                let total: usize = cycles.iter().map(|c| c.size).sum();
                console.line(format!("{} dead cycles ({} declarations)", cycles.len(), total).yellow());
                for cycle in &cycles {
                    let members: Vec<String> = cycle.members.iter().map(|m| m.to_string()).collect();
                    console.line(format!("  {}", members.join(" <-> ")));
                }
            }
        }
    }

    // Step 6: Shake
    info!("Shaking...");
    let outcome = shaker.shake_detailed(packages);

    // Step 7: Report
    let reporter = Reporter::new(format, cli.output.clone()).with_show_kept(config.report.show_kept);
    reporter.report(&outcome)?;

    info!(
        "Kept {} of {} declarations in {:.2}s",
        outcome.kept_count(),
        outcome.kept_count() + outcome.removed_count(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Where listings, explanations and cycle output go. Stdout is reserved for
/// the model when the report is JSON.
#[derive(Clone, Copy)]
struct Console {
    to_stderr: bool,
}

impl Console {
    fn for_format(format: &ReportFormat) -> Self {
        Self {
            to_stderr: *format == ReportFormat::Json,
        }
    }

    fn line(&self, text: impl Display) {
        if self.to_stderr {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

fn print_packages(console: Console, packages: &[Package]) {
    for pkg in packages {
        console.line(format!("{} {}", "package".dimmed(), pkg.path.cyan().bold()));
        for decl in &pkg.declarations {
            console.line(format!("  {}", decl.display()));
        }
    }
    console.line("");
}

fn explain(
    console: Console,
    packages: &[Package],
    reachability: &typeshake::Reachability<'_>,
    target: &str,
) {
    let Some(key) = DeclarationKey::parse(target) else {
        console.line(format!("{}: expected PKG.Name, got '{}'", "explain".yellow(), target));
        return;
    };

    let declared = packages
        .iter()
        .any(|p| p.path == key.package && p.get(&key.name).is_some());
    if !declared {
        console.line(format!("{} {} is not declared", "explain".yellow(), key));
        return;
    }

    match reachability.explain(&key) {
        Some(chain) => {
            let chain: Vec<String> = chain.iter().map(|k| k.to_string()).collect();
            console.line(format!(
                "{} {} is kept: {} {}",
                "explain".green(),
                key,
                "(entry)".dimmed(),
                chain.join(" -> ")
            ));
        }
        None => console.line(format!(
            "{} {} is not reachable from any entry package",
            "explain".red(),
            key
        )),
    }
}
