use std::path::PathBuf;
use thiserror::Error;

/// Fatal frontend errors. Any of these aborts the run before a package
/// reaches the shaker.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load Go grammar: {0}")]
    Grammar(String),

    #[error("Syntax error in {}:{}", .file.display(), .line)]
    Syntax { file: PathBuf, line: usize },

    #[error("No Go files in {}", .dir.display())]
    NoGoFiles { dir: PathBuf },

    #[error("Build constraints exclude all Go files in {}", .dir.display())]
    ExcludedByConstraints { dir: PathBuf },

    #[error("Multiple packages in {}: {}", .dir.display(), .found.join(", "))]
    MixedPackages { dir: PathBuf, found: Vec<String> },

    #[error("Cannot resolve package qualifier '{}' in {}", .qualifier, .file.display())]
    UnresolvedQualifier { file: PathBuf, qualifier: String },

    #[error("Duplicate declaration '{}' in package {}", .name, .package)]
    DuplicateDeclaration { package: String, name: String },
}
