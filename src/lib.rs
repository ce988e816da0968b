//! typeshake - Go type-model extraction with cross-package tree shaking
//!
//! Reads the exported type declarations of a Go module into a small,
//! language-neutral model and drops every declaration that cannot be reached
//! from a chosen set of entry packages, so a code generator only sees the
//! types it actually needs.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! 1. **Package Discovery** - Walk the module and group `.go` files by package,
//!    keeping only files whose build constraints hold for the target platform
//! 2. **Dependencies** - Follow imports of the entry packages into required
//!    modules found in the module cache
//! 3. **Parsing** - Parse each package with tree-sitter into model declarations
//! 4. **Marking** - Breadth-first reachability from the entry packages
//! 5. **Sweeping** - Remove unmarked declarations, preserving order
//! 6. **Reporting** - Terminal summary or the pruned model as JSON

pub mod config;
pub mod discovery;
pub mod model;
pub mod parser;
pub mod report;
pub mod shaker;

pub use config::Config;
pub use discovery::{BuildContext, ModuleResolver, PackageFinder, PackageSource};
pub use model::{Declaration, DeclarationKey, Package, Type, TypeReference};
pub use parser::{collect_dependencies, load_packages, GoParser, ParseError, ParseOptions};
pub use report::{ReportFormat, Reporter};
pub use shaker::{shake, CycleDetector, Reachability, ShakeOutcome, TreeShaker};
