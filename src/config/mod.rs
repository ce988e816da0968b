mod loader;

pub use loader::{Config, MappingRule, ReportConfig};
