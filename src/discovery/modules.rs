//! Packages of required modules: `go.mod` requirements and replacements
//! resolved against the local module cache.

use super::build::BuildContext;
use super::package_finder::{is_package_file, PackageSource};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// The parts of `go.mod` that locate dependency sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    pub module: Option<String>,
    pub requires: Vec<Requirement>,
    pub replaces: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
}

/// `replace old [version] => new [version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub path: String,
    /// Only this version is replaced; every version when absent
    pub version: Option<String>,
    pub target: ReplaceTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTarget {
    /// Directory relative to the main module, or absolute
    Dir(PathBuf),
    Module { path: String, version: String },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

impl GoMod {
    /// Read `go.mod` in `root`, if there is one
    pub fn read(root: &Path) -> Option<Self> {
        std::fs::read_to_string(root.join("go.mod"))
            .ok()
            .map(|contents| Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut go_mod = Self::default();
        let mut block = Block::None;

        for line in contents.lines() {
            let line = match line.find("//") {
                Some(idx) => &line[..idx],
                None => line,
            };
            let words: Vec<&str> = line.split_whitespace().map(|w| w.trim_matches('"')).collect();
            let Some(&first) = words.first() else {
                continue;
            };

            if block != Block::None {
                match (first, block) {
                    (")", _) => block = Block::None,
                    (_, Block::Require) => go_mod.add_requirement(&words),
                    (_, Block::Replace) => go_mod.add_replacement(&words),
                    _ => {}
                }
                continue;
            }

            let rest = &words[1..];
            let opens_block = rest.first() == Some(&"(");
            match first {
                "module" => go_mod.module = rest.first().map(|m| m.to_string()),
                "require" if opens_block => block = Block::Require,
                "require" => go_mod.add_requirement(rest),
                "replace" if opens_block => block = Block::Replace,
                "replace" => go_mod.add_replacement(rest),
                _ if opens_block => block = Block::Other,
                _ => {}
            }
        }

        go_mod
    }

    fn add_requirement(&mut self, words: &[&str]) {
        if let [path, version, ..] = words {
            self.requires.push(Requirement {
                path: path.to_string(),
                version: version.to_string(),
            });
        }
    }

    fn add_replacement(&mut self, words: &[&str]) {
        let Some(arrow) = words.iter().position(|w| *w == "=>") else {
            return;
        };
        let (old, new) = (&words[..arrow], &words[arrow + 1..]);
        let Some(path) = old.first() else {
            return;
        };

        let target = match new {
            [dir] => ReplaceTarget::Dir(PathBuf::from(*dir)),
            [path, version] => ReplaceTarget::Module {
                path: path.to_string(),
                version: version.to_string(),
            },
            _ => return,
        };

        self.replaces.push(Replacement {
            path: path.to_string(),
            version: old.get(1).map(|v| v.to_string()),
            target,
        });
    }
}

/// Standard library paths have no dot in their first element
pub fn is_standard_library(import_path: &str) -> bool {
    !import_path
        .split('/')
        .next()
        .map(|first| first.contains('.'))
        .unwrap_or(false)
}

/// Module cache case encoding: every upper-case letter becomes `!` plus its
/// lower-case form (`github.com/Azure/x` -> `github.com/!azure/x`)
pub fn escape_module_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Module cache location: configured, `GOMODCACHE`, the first `GOPATH`
/// entry's `pkg/mod`, then `~/go/pkg/mod`
pub fn module_cache_dir(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = configured {
        return Some(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os("GOMODCACHE").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if let Some(gopath) = std::env::var_os("GOPATH").filter(|v| !v.is_empty()) {
        if let Some(first) = std::env::split_paths(&gopath).next() {
            return Some(first.join("pkg").join("mod"));
        }
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("go").join("pkg").join("mod"))
}

/// Finds dependency packages on disk for the main module
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    go_mod: GoMod,
    cache: Option<PathBuf>,
    build: BuildContext,
}

impl ModuleResolver {
    pub fn new(root: &Path, go_mod: GoMod, cache: Option<PathBuf>, build: BuildContext) -> Self {
        Self {
            root: root.to_path_buf(),
            go_mod,
            cache,
            build,
        }
    }

    /// The required module owning `import_path`: the longest matching module path
    pub fn owning_module(&self, import_path: &str) -> Option<&Requirement> {
        self.go_mod
            .requires
            .iter()
            .filter(|req| {
                import_path == req.path
                    || import_path
                        .strip_prefix(req.path.as_str())
                        .map(|rest| rest.starts_with('/'))
                        .unwrap_or(false)
            })
            .max_by_key(|req| req.path.len())
    }

    /// Where the sources of a required module live, after replacements
    pub fn module_dir(&self, requirement: &Requirement) -> Option<PathBuf> {
        let replacement = self.go_mod.replaces.iter().find(|r| {
            r.path == requirement.path
                && r.version.as_ref().map_or(true, |v| *v == requirement.version)
        });

        let (path, version) = match replacement.map(|r| &r.target) {
            Some(ReplaceTarget::Dir(dir)) if dir.is_absolute() => return Some(dir.clone()),
            Some(ReplaceTarget::Dir(dir)) => return Some(self.root.join(dir)),
            Some(ReplaceTarget::Module { path, version }) => (path, version),
            None => (&requirement.path, &requirement.version),
        };

        let cache = self.cache.as_ref()?;
        Some(cache.join(format!(
            "{}@{}",
            escape_module_path(path),
            escape_module_path(version)
        )))
    }

    /// Source files of a dependency package, or `None` when it is not on disk
    pub fn package_source(&self, import_path: &str) -> Option<PackageSource> {
        let requirement = self.owning_module(import_path)?;
        let module_dir = self.module_dir(requirement)?;

        if !module_dir.is_dir() {
            warn!(
                "Module {}@{} is not in the module cache ({}); run `go mod download`",
                requirement.path,
                requirement.version,
                module_dir.display()
            );
            return None;
        }

        let relative = import_path[requirement.path.len()..].trim_start_matches('/');
        let dir = if relative.is_empty() {
            module_dir
        } else {
            module_dir.join(relative)
        };

        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_package_file(path))
            .filter(|path| {
                let keep = self.build.matches_file(path);
                if !keep {
                    trace!("Build constraints exclude: {}", path.display());
                }
                keep
            })
            .collect();

        if files.is_empty() {
            debug!("No buildable Go files for {} in {}", import_path, dir.display());
            return None;
        }
        files.sort();

        debug!("Dependency package {} found in {}", import_path, dir.display());
        Some(PackageSource {
            dir,
            import_path: import_path.to_string(),
            files,
        })
    }
}
