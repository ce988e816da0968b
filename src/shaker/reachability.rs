use crate::model::{declaration_count, Declaration, DeclarationKey, Package, TypeReference};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, trace};

/// Who marked a declaration as reachable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Referrer {
    /// Seeded because the declaration lives in an entry package
    Root,
    /// Referenced by another reachable declaration
    Declaration(DeclarationKey),
}

/// Internal referrer: the sentinel, or the slot of a real key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
    Root,
    Slot(usize),
}

/// One indexed (package, name) pair
#[derive(Debug)]
struct Entry<'a> {
    package: &'a str,
    name: &'a str,
    /// `None` for a reference target with no matching declaration
    declaration: Option<&'a Declaration>,
    referrers: Vec<Via>,
}

impl<'a> Entry<'a> {
    fn key(&self) -> DeclarationKey {
        DeclarationKey::new(self.package, self.name)
    }
}

/// Result of the index and mark phases of one shake.
///
/// Owns its index; nothing outlives the borrow of the input packages.
#[derive(Debug)]
pub struct Reachability<'a> {
    /// package path -> name -> slot in `entries`
    slots: HashMap<&'a str, HashMap<&'a str, usize>>,
    entries: Vec<Entry<'a>>,
}

impl<'a> Reachability<'a> {
    /// Index every declaration of every package
    fn index(packages: &'a [Package]) -> Self {
        let mut index = Self {
            slots: HashMap::new(),
            entries: Vec::with_capacity(declaration_count(packages)),
        };

        for pkg in packages {
            for decl in &pkg.declarations {
                let slot = index.slot(&pkg.path, decl.name());
                let entry = &mut index.entries[slot];
                if entry.declaration.is_some() {
                    debug!("Duplicate declaration {}.{} (keeping first)", pkg.path, decl.name());
                    continue;
                }
                entry.declaration = Some(decl);
            }
        }

        index
    }

    /// Slot for a key, creating an empty entry on first sight
    fn slot(&mut self, package: &'a str, name: &'a str) -> usize {
        if let Some(&slot) = self.slots.get(package).and_then(|names| names.get(name)) {
            return slot;
        }

        let slot = self.entries.len();
        self.entries.push(Entry {
            package,
            name,
            declaration: None,
            referrers: Vec::new(),
        });
        self.slots.entry(package).or_default().insert(name, slot);
        slot
    }

    fn slot_for_ref(&mut self, reference: &'a TypeReference) -> usize {
        self.slot(&reference.package_path, &reference.name)
    }

    fn lookup(&self, package: &str, name: &str) -> Option<&Entry<'a>> {
        let slot = *self.slots.get(package)?.get(name)?;
        self.entries.get(slot)
    }

    /// Seed every declaration of the entry packages, then propagate.
    ///
    /// A key is expanded into its refs only on its first visit; later visits
    /// just record the extra referrer. This keeps the full audit trail and
    /// terminates on reference cycles.
    fn mark(&mut self, packages: &'a [Package], entry_packages: &HashSet<String>) {
        let mut queue: VecDeque<(usize, Via)> = VecDeque::new();

        for pkg in packages {
            if !entry_packages.contains(&pkg.path) {
                continue;
            }
            for decl in &pkg.declarations {
                let slot = self.slot(&pkg.path, decl.name());
                queue.push_back((slot, Via::Root));
            }
        }

        let mut expanded: HashSet<usize> = HashSet::new();

        while let Some((slot, via)) = queue.pop_front() {
            self.entries[slot].referrers.push(via);

            if !expanded.insert(slot) {
                continue;
            }

            let Some(decl) = self.entries[slot].declaration else {
                trace!(
                    "Dangling reference {}.{}",
                    self.entries[slot].package,
                    self.entries[slot].name
                );
                continue;
            };

            for reference in decl.refs() {
                let target = self.slot_for_ref(reference);
                queue.push_back((target, Via::Slot(slot)));
            }
        }
    }

    /// Whether the declaration was reached from an entry package
    pub fn is_reachable(&self, key: &DeclarationKey) -> bool {
        self.is_marked(&key.package, &key.name)
    }

    fn is_marked(&self, package: &str, name: &str) -> bool {
        self.lookup(package, name)
            .map(|e| !e.referrers.is_empty())
            .unwrap_or(false)
    }

    /// Every referrer recorded for a key, in marking order.
    ///
    /// `None` when the key was never indexed.
    pub fn referrers(&self, key: &DeclarationKey) -> Option<Vec<Referrer>> {
        let entry = self.lookup(&key.package, &key.name)?;
        Some(
            entry
                .referrers
                .iter()
                .map(|via| match via {
                    Via::Root => Referrer::Root,
                    Via::Slot(slot) => Referrer::Declaration(self.entries[*slot].key()),
                })
                .collect(),
        )
    }

    /// Shortest chain of declarations from an entry-package root to `key`,
    /// root first. `None` if the key is unreachable.
    pub fn explain(&self, key: &DeclarationKey) -> Option<Vec<DeclarationKey>> {
        let slot = *self.slots.get(key.package.as_str())?.get(key.name.as_str())?;

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = slot;

        loop {
            if !seen.insert(current) {
                return None;
            }
            let entry = &self.entries[current];
            chain.push(entry.key());

            // Marking is breadth-first, so the first referrer is on a shortest path
            match entry.referrers.first()? {
                Via::Root => break,
                Via::Slot(parent) => current = *parent,
            }
        }

        chain.reverse();
        Some(chain)
    }

    /// Reached keys that have no declaration behind them
    pub fn dangling(&self) -> Vec<DeclarationKey> {
        self.entries
            .iter()
            .filter(|e| e.declaration.is_none() && !e.referrers.is_empty())
            .map(Entry::key)
            .collect()
    }

    /// Number of reached keys that have a declaration
    pub fn reachable_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.declaration.is_some() && !e.referrers.is_empty())
            .count()
    }
}

/// Result of a shake
#[derive(Debug, Clone, Default)]
pub struct ShakeOutcome {
    /// Pruned packages, in input order
    pub packages: Vec<Package>,

    /// Removed declarations, in input order
    pub removed: Vec<DeclarationKey>,
}

impl ShakeOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn kept_count(&self) -> usize {
        declaration_count(&self.packages)
    }
}

/// Removes declarations unreachable from a set of entry packages
#[derive(Debug, Clone, Default)]
pub struct TreeShaker {
    entry_packages: HashSet<String>,
}

impl TreeShaker {
    pub fn new<I, S>(entry_packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entry_packages: entry_packages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entry_packages(&self) -> &HashSet<String> {
        &self.entry_packages
    }

    /// Index and mark without sweeping
    pub fn analyze<'a>(&self, packages: &'a [Package]) -> Reachability<'a> {
        let mut reachability = Reachability::index(packages);
        reachability.mark(packages, &self.entry_packages);
        reachability
    }

    /// Remove unreachable declarations. Returns the removed count and the
    /// pruned packages.
    pub fn shake(&self, packages: Vec<Package>) -> (usize, Vec<Package>) {
        let outcome = self.shake_detailed(packages);
        (outcome.removed_count(), outcome.packages)
    }

    /// Like [`TreeShaker::shake`], but also lists what was removed
    pub fn shake_detailed(&self, packages: Vec<Package>) -> ShakeOutcome {
        let total = declaration_count(&packages);
        info!(
            "Shaking {} declarations in {} packages ({} entry packages)",
            total,
            packages.len(),
            self.entry_packages.len()
        );

        let keep: Vec<Vec<bool>> = {
            let reachability = self.analyze(&packages);
            packages
                .iter()
                .map(|pkg| {
                    pkg.declarations
                        .iter()
                        .map(|decl| reachability.is_marked(&pkg.path, decl.name()))
                        .collect()
                })
                .collect()
        };

        let mut removed = Vec::new();
        let mut out = Vec::with_capacity(packages.len());

        for (mut pkg, mask) in packages.into_iter().zip(keep) {
            let declarations = std::mem::take(&mut pkg.declarations);
            for (decl, kept) in declarations.into_iter().zip(mask) {
                if kept {
                    pkg.declarations.push(decl);
                } else {
                    debug!("Unreachable: {}.{} ({})", pkg.path, decl.name(), decl.kind());
                    removed.push(pkg.key(&decl));
                }
            }
            out.push(pkg);
        }

        info!("Removed {} of {} declarations", removed.len(), total);

        ShakeOutcome {
            packages: out,
            removed,
        }
    }
}

/// Free-function form of [`TreeShaker::shake`]
pub fn shake(entry_package_paths: &HashSet<String>, packages: Vec<Package>) -> (usize, Vec<Package>) {
    TreeShaker::new(entry_package_paths.iter().cloned()).shake(packages)
}
