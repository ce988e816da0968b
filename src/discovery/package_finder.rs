use super::modules::{module_cache_dir, GoMod, ModuleResolver};
use crate::config::Config;
use ignore::{DirEntry, WalkBuilder};
use miette::{IntoDiagnostic, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot determine module path for {}: no go.mod and no `module` configured", .root.display())]
    MissingModule { root: PathBuf },

    #[error("Module root {} does not exist", .root.display())]
    MissingRoot { root: PathBuf },
}

/// One directory's worth of Go files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Directory holding the files
    pub dir: PathBuf,

    /// Import path the package is known by
    pub import_path: String,

    /// Non-test `.go` files that build for the target platform, sorted
    pub files: Vec<PathBuf>,
}

/// Package finder for a single Go module
pub struct PackageFinder<'a> {
    config: &'a Config,
}

impl<'a> PackageFinder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Module path from config, falling back to `go.mod` in `root`
    pub fn module_path(&self, root: &Path) -> Result<String> {
        if let Some(module) = &self.config.module {
            return Ok(module.trim_end_matches('/').to_string());
        }

        std::fs::read_to_string(root.join("go.mod"))
            .ok()
            .and_then(|contents| parse_module_directive(&contents))
            .ok_or_else(|| DiscoveryError::MissingModule {
                root: root.to_path_buf(),
            })
            .into_diagnostic()
    }

    /// Find all packages under `root`, sorted by import path
    pub fn find_packages(&self, root: &Path) -> Result<Vec<PackageSource>> {
        if !root.is_dir() {
            return Err(DiscoveryError::MissingRoot {
                root: root.to_path_buf(),
            })
            .into_diagnostic();
        }

        let module = self.module_path(root)?;
        debug!("Scanning module {} in: {}", module, root.display());

        let build = self.config.build_context();
        debug!("Selecting files for {}/{}", build.goos, build.goarch);

        let include_vendor = self.config.include_vendor;
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .parents(true)
            .follow_links(false)
            .filter_entry(move |entry| keep_entry(entry, include_vendor))
            .build();

        let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

        for entry in walker.filter_map(|entry| entry.ok()) {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            if !is_package_file(path) {
                continue;
            }

            if self.config.should_exclude(path) {
                trace!("Excluding: {}", path.display());
                continue;
            }

            if !build.matches_file(path) {
                trace!("Build constraints exclude: {}", path.display());
                continue;
            }

            if let Some(dir) = path.parent() {
                trace!("Found Go file: {}", path.display());
                by_dir.entry(dir.to_path_buf()).or_default().push(path.to_path_buf());
            }
        }

        let mut packages: Vec<PackageSource> = by_dir
            .into_iter()
            .filter_map(|(dir, mut files)| {
                let relative = dir.strip_prefix(root).ok()?;
                let import_path = import_path_for(&module, relative)?;
                files.sort();
                Some(PackageSource {
                    dir,
                    import_path,
                    files,
                })
            })
            .collect();

        packages.sort_by(|a, b| a.import_path.cmp(&b.import_path));

        debug!("Found {} packages", packages.len());
        Ok(packages)
    }

    /// Resolver for packages of the modules `root/go.mod` requires
    pub fn module_resolver(&self, root: &Path) -> ModuleResolver {
        let go_mod = GoMod::read(root).unwrap_or_default();
        let cache = module_cache_dir(self.config.module_cache.as_deref());
        debug!(
            "{} required modules, module cache: {}",
            go_mod.requires.len(),
            cache
                .as_ref()
                .map(|c| c.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        ModuleResolver::new(root, go_mod, cache, self.config.build_context())
    }
}

fn module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).expect("valid regex"))
}

fn parse_module_directive(go_mod: &str) -> Option<String> {
    module_re()
        .captures(go_mod)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Directory filter applied during the walk; the root itself is never filtered
fn keep_entry(entry: &DirEntry, include_vendor: bool) -> bool {
    if entry.depth() == 0 || !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
        return true;
    }

    let name = entry.file_name().to_string_lossy();
    if name == "testdata" || name.starts_with('_') || name.starts_with('.') {
        return false;
    }
    if name == "vendor" && !include_vendor {
        return false;
    }
    true
}

/// `.go` files the go tool considers: no tests, nothing starting with `_` or `.`
pub(super) fn is_package_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('_')
        && !name.starts_with('.')
}

/// `vendor/<path>` maps to `<path>`, everything else hangs off the module
fn import_path_for(module: &str, relative: &Path) -> Option<String> {
    let segments: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    match segments.iter().position(|s| *s == "vendor") {
        Some(idx) if idx + 1 < segments.len() => Some(segments[idx + 1..].join("/")),
        Some(_) => None,
        None if segments.is_empty() => Some(module.to_string()),
        None => Some(format!("{}/{}", module, segments.join("/"))),
    }
}

/// Resolve a command-line entry package: `./api` and `api/v1` style relative
/// paths hang off the module, anything else is taken as an import path.
pub fn resolve_entry(module: &str, entry: &str) -> String {
    match entry.strip_prefix("./") {
        Some(relative) => {
            let relative = relative.trim_end_matches('/');
            if relative.is_empty() {
                module.to_string()
            } else {
                format!("{}/{}", module, relative)
            }
        }
        None if entry == "." => module.to_string(),
        None => entry.trim_end_matches('/').to_string(),
    }
}
