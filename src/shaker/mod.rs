//! Cross-package reachability ("tree shaking")
//!
//! Every declaration in an entry package is a root. Anything reachable from a
//! root through [`Declaration::refs`](crate::model::Declaration::refs) chains
//! survives; everything else is removed before code generation sees it.

mod cycles;
mod reachability;

pub use cycles::{CycleDetector, CycleInfo, CycleStats};
pub use reachability::{shake, Reachability, Referrer, ShakeOutcome, TreeShaker};
