//! Go frontend: turns discovered packages into model [`Package`]s

mod common;
mod error;
mod go;

pub use error::ParseError;
pub use go::{GoParser, ParseOptions};

use crate::discovery::{is_standard_library, ModuleResolver, PackageSource};
use crate::model::Package;
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;
use tracing::{debug, info, trace};

fn package_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^package\s+(\w+)").expect("valid regex"))
}

/// Import path -> package clause name, read from the first file of each package.
///
/// Lets qualifiers resolve to the real name of a package whose directory is
/// named differently (`lib/v2` declaring `package lib`).
pub fn package_names(sources: &[PackageSource]) -> HashMap<String, String> {
    sources
        .iter()
        .filter_map(|source| {
            let first = source.files.first()?;
            let contents = std::fs::read_to_string(first).ok()?;
            let name = package_clause_re().captures(&contents)?.get(1)?.as_str();
            trace!("Package {} is named {}", source.import_path, name);
            Some((source.import_path.clone(), name.to_string()))
        })
        .collect()
}

/// Parse all packages in parallel. Output order follows `sources`.
pub fn load_packages(sources: &[PackageSource], mut options: ParseOptions) -> Result<Vec<Package>> {
    for (path, name) in package_names(sources) {
        options.known_packages.entry(path).or_insert(name);
    }

    info!("Parsing {} packages in parallel...", sources.len());

    let parser = GoParser::new(options);
    let packages: std::result::Result<Vec<Package>, ParseError> = sources
        .par_iter()
        .map(|source| parser.parse_package(source))
        .collect();

    packages.into_diagnostic()
}

/// Packages of required modules that the entry packages import, directly or
/// through other packages. Standard library imports are never followed and
/// imports nothing on disk provides stay dangling.
pub fn collect_dependencies(
    local: &[PackageSource],
    entries: &HashSet<String>,
    resolver: &ModuleResolver,
    options: &ParseOptions,
) -> Result<Vec<PackageSource>> {
    let parser = GoParser::new(options.clone());
    let by_path: HashMap<&str, &PackageSource> =
        local.iter().map(|s| (s.import_path.as_str(), s)).collect();

    let mut roots: Vec<&String> = entries.iter().collect();
    roots.sort();
    let mut queue: VecDeque<String> = roots.into_iter().cloned().collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut dependencies = Vec::new();

    while let Some(import_path) = queue.pop_front() {
        if !visited.insert(import_path.clone()) {
            continue;
        }

        let source = match by_path.get(import_path.as_str()) {
            Some(source) => (*source).clone(),
            None if is_standard_library(&import_path) => continue,
            None => match resolver.package_source(&import_path) {
                Some(source) => {
                    dependencies.push(source.clone());
                    source
                }
                None => {
                    debug!("No sources for import {}", import_path);
                    continue;
                }
            },
        };

        for import in parser.imports(&source).into_diagnostic()? {
            if !visited.contains(&import) {
                trace!("{} imports {}", source.import_path, import);
                queue.push_back(import);
            }
        }
    }

    dependencies.sort_by(|a, b| a.import_path.cmp(&b.import_path));
    info!("Found {} dependency packages", dependencies.len());
    Ok(dependencies)
}
