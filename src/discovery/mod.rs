//! Package discovery: walk a Go module and group its files by package,
//! honouring build constraints, and locate packages of required modules

mod build;
mod modules;
mod package_finder;

pub use build::{host_arch, host_os, BuildContext};
pub use modules::{
    escape_module_path, is_standard_library, module_cache_dir, GoMod, ModuleResolver,
    ReplaceTarget, Replacement, Requirement,
};
pub use package_finder::{resolve_entry, DiscoveryError, PackageFinder, PackageSource};
