use crate::discovery::BuildContext;
use crate::model::{Type, TypeReference};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for a typeshake run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Module path; read from go.mod when absent
    pub module: Option<String>,

    /// Import paths whose declarations are all roots
    pub entry_packages: Vec<String>,

    /// Patterns to exclude from discovery
    pub exclude: Vec<String>,

    /// Treat `vendor/<path>` as package `<path>` instead of skipping it
    pub include_vendor: bool,

    /// Resolve same-package identifiers to references
    pub resolve_local_types: bool,

    /// Target OS for build constraints; `GOOS` or the host when absent
    pub goos: Option<String>,

    /// Target architecture for build constraints; `GOARCH` or the host when absent
    pub goarch: Option<String>,

    /// Extra build tags, as with `go build -tags`
    pub build_tags: Vec<String>,

    /// Load packages of required modules imported from the entry packages
    pub load_dependencies: bool,

    /// Module cache directory; `GOMODCACHE`, then `GOPATH/pkg/mod` when absent
    pub module_cache: Option<PathBuf>,

    /// Type overrides applied to qualified references while parsing
    pub mapping: Vec<MappingRule>,

    /// Report configuration
    pub report: ReportConfig,
}

/// Replace every reference to `from` with `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub from: TypeReference,
    pub to: Type,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format: terminal, json
    pub format: String,

    /// List kept declarations as well as removed ones
    pub show_kept: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module: None,
            entry_packages: vec![],
            exclude: vec!["**/testdata/**".to_string(), "**/.git/**".to_string()],
            include_vendor: false,
            resolve_local_types: false,
            goos: None,
            goarch: None,
            build_tags: vec![],
            load_dependencies: true,
            module_cache: None,
            mapping: vec![],
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "terminal".to_string(),
            show_kept: false,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(module_root: &Path) -> Result<Self> {
        let default_names = [
            ".typeshake.yml",
            ".typeshake.yaml",
            ".typeshake.toml",
            "typeshake.yml",
            "typeshake.yaml",
            "typeshake.toml",
        ];

        for name in &default_names {
            let path = module_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Check if a pattern matches for exclusion
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude.iter().any(|pattern| glob_match(pattern, &path_str))
    }

    /// Platform files are selected for
    pub fn build_context(&self) -> BuildContext {
        let mut context = BuildContext::default().with_tags(self.build_tags.iter().cloned());
        if let Some(goos) = &self.goos {
            context.goos = goos.clone();
        }
        if let Some(goarch) = &self.goarch {
            context.goarch = goarch.clone();
        }
        context
    }

    /// Override table for the parser. Later rules win.
    pub fn mapping(&self) -> HashMap<TypeReference, Type> {
        self.mapping
            .iter()
            .map(|rule| (rule.from.clone(), rule.to.clone()))
            .collect()
    }
}

/// Simple glob matching for patterns like "*_gen.go" or "**/testdata/**"
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern.contains("**") {
        return double_star_match(pattern, text);
    }

    if pattern.starts_with('*') && !pattern.contains('/') {
        // "*_gen.go" matches "zz_deepcopy_gen.go"
        return text.ends_with(&pattern[1..]);
    }

    if pattern.ends_with('*') && !pattern.contains('/') {
        return text.starts_with(&pattern[..pattern.len() - 1]);
    }

    text == pattern
}

/// Patterns holding `**`, which spans any number of path segments
fn double_star_match(pattern: &str, text: &str) -> bool {
    // "**/internal/**" must match a whole directory name
    if pattern.starts_with("**/") && pattern.ends_with("/**") {
        let dir_name = pattern.replace("**/", "").replace("/**", "");
        let dir_pattern = format!("/{}/", dir_name.trim_matches('/'));
        return text.contains(&dir_pattern);
    }

    let parts: Vec<&str> = pattern.split("**").collect();
    if parts.len() != 2 {
        return text == pattern;
    }

    let prefix = parts[0].trim_end_matches('/');
    let suffix = parts[1].trim_start_matches('/');

    if prefix.is_empty() && suffix.is_empty() {
        return true;
    }

    if prefix.is_empty() {
        if suffix.contains('*') && !suffix.contains('/') {
            // "**/*_gen.go" applies the file pattern to the last segment
            let name = text.rsplit('/').next().unwrap_or(text);
            return glob_match(suffix, name);
        }
        return text.ends_with(suffix) || text.contains(&format!("/{}", suffix));
    }

    if suffix.is_empty() {
        return text.starts_with(prefix) || text.contains(&format!("{}/", prefix));
    }

    (text.starts_with(prefix) || text.contains(&format!("/{}/", prefix)))
        && (text.ends_with(suffix) || text.contains(&format!("/{}", suffix)))
}
