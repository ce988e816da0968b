// Cycle detector - finds reference cycles that were pruned as a whole
//
// Mutually referential types (A has a field of type B, B has a field of type A)
// are routine in generated API models. When neither side is reachable from an
// entry package the whole cycle goes; reporting it as one unit is more useful
// than listing its members as unrelated removals.

use super::Reachability;
use crate::model::{DeclarationKey, Package};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::debug;

/// A strongly connected group of removed declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// Members, sorted
    pub members: Vec<DeclarationKey>,
    /// Number of members
    pub size: usize,
}

/// Detector for dead reference cycles
pub struct CycleDetector;

impl CycleDetector {
    pub fn new() -> Self {
        Self
    }

    /// Find all reference cycles none of whose members are reachable.
    ///
    /// Returns cycles sorted by size (largest first), ties broken by the first
    /// member.
    pub fn find_dead_cycles(
        &self,
        packages: &[Package],
        reachability: &Reachability<'_>,
    ) -> Vec<CycleInfo> {
        let graph = build_graph(packages);

        let mut dead_cycles = Vec::new();

        for scc in tarjan_scc(&graph) {
            let is_cycle = scc.len() > 1
                || scc
                    .first()
                    .map(|&idx| graph.contains_edge(idx, idx))
                    .unwrap_or(false);
            if !is_cycle {
                continue;
            }

            let mut members: Vec<DeclarationKey> = scc
                .iter()
                .filter_map(|&idx| graph.node_weight(idx).cloned())
                .collect();

            if members.iter().any(|key| reachability.is_reachable(key)) {
                continue;
            }

            members.sort();
            debug!("Dead cycle with {} members: {:?}", members.len(), members);

            dead_cycles.push(CycleInfo {
                size: members.len(),
                members,
            });
        }

        dead_cycles.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.members.first().cmp(&b.members.first()))
        });

        dead_cycles
    }

    /// Get statistics about dead cycles
    pub fn get_cycle_stats(
        &self,
        packages: &[Package],
        reachability: &Reachability<'_>,
    ) -> CycleStats {
        let dead_cycles = self.find_dead_cycles(packages, reachability);

        CycleStats {
            num_dead_cycles: dead_cycles.len(),
            largest_cycle_size: dead_cycles.first().map(|c| c.size).unwrap_or(0),
            total_declarations_in_cycles: dead_cycles.iter().map(|c| c.size).sum(),
        }
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Directed refs graph over declared keys. Dangling targets get no node.
fn build_graph(packages: &[Package]) -> DiGraph<DeclarationKey, ()> {
    let mut graph = DiGraph::new();
    let mut node_map: HashMap<DeclarationKey, NodeIndex> = HashMap::new();

    for pkg in packages {
        for decl in &pkg.declarations {
            let key = pkg.key(decl);
            node_map
                .entry(key.clone())
                .or_insert_with(|| graph.add_node(key));
        }
    }

    for pkg in packages {
        for decl in &pkg.declarations {
            let Some(&from) = node_map.get(&pkg.key(decl)) else {
                continue;
            };
            for reference in decl.refs() {
                if let Some(&to) = node_map.get(&DeclarationKey::from(reference)) {
                    graph.update_edge(from, to, ());
                }
            }
        }
    }

    graph
}

/// Statistics about dead cycles
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    pub num_dead_cycles: usize,
    pub largest_cycle_size: usize,
    pub total_declarations_in_cycles: usize,
}

impl CycleStats {
    pub fn has_cycles(&self) -> bool {
        self.num_dead_cycles > 0
    }
}
