//! Integration tests for the tree shaker
//!
//! Scenarios on hand-built models plus property tests over random models.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use typeshake::model::{
    declaration_count, AliasDeclaration, Declaration, DeclarationKey, Field, Package,
    StructDeclaration, Type,
};
use typeshake::shaker::{shake, CycleDetector, Referrer, TreeShaker};

fn entries(paths: &[&str]) -> HashSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

fn names(pkg: &Package) -> Vec<&str> {
    pkg.declarations.iter().map(|d| d.name()).collect()
}

fn find<'a>(packages: &'a [Package], path: &str) -> &'a Package {
    packages
        .iter()
        .find(|p| p.path == path)
        .unwrap_or_else(|| panic!("package {} missing", path))
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_referenced_declaration_survives() {
    let packages = vec![
        Package::new("pkg/a").with_declaration(
            StructDeclaration::new("S1").with_field(Field::new("Two", Type::reference("pkg/b", "S2"))),
        ),
        Package::new("pkg/b")
            .with_declaration(StructDeclaration::new("S2"))
            .with_declaration(StructDeclaration::new("S3")),
    ];

    let (removed, out) = shake(&entries(&["pkg/a"]), packages);

    assert_eq!(removed, 1);
    assert_eq!(names(find(&out, "pkg/a")), vec!["S1"]);
    assert_eq!(names(find(&out, "pkg/b")), vec!["S2"]);
}

#[test]
fn test_alias_targets_are_not_followed() {
    let packages = vec![
        Package::new("pkg/a").with_declaration(AliasDeclaration::new(
            "T",
            Type::map(Type::primitive("string"), Type::reference("pkg/b", "X")),
        )),
        Package::new("pkg/b").with_declaration(StructDeclaration::new("X")),
    ];

    let (removed, out) = shake(&entries(&["pkg/a"]), packages);

    // Aliases expose no references, so X goes even though T mentions it
    assert_eq!(removed, 1);
    assert_eq!(names(find(&out, "pkg/a")), vec!["T"]);
    assert!(find(&out, "pkg/b").is_empty());
}

#[test]
fn test_no_entry_packages_removes_everything() {
    let packages = vec![
        Package::new("pkg/a")
            .with_declaration(StructDeclaration::new("A"))
            .with_declaration(AliasDeclaration::new("B", Type::primitive("int"))),
        Package::new("pkg/b").with_declaration(StructDeclaration::new("C")),
    ];
    let total = declaration_count(&packages);

    let (removed, out) = shake(&HashSet::new(), packages);

    assert_eq!(removed, total);
    assert_eq!(declaration_count(&out), 0);
    // Packages themselves are kept, emptied
    assert_eq!(out.len(), 2);
}

#[test]
fn test_inline_field_is_followed_like_a_named_one() {
    let packages = vec![
        Package::new("pkg/a").with_declaration(
            StructDeclaration::new("Obj")
                .with_field(Field::embedded(Type::reference("pkg/meta", "TypeMeta")))
                .with_field(Field::new("Spec", Type::primitive("string"))),
        ),
        Package::new("pkg/meta")
            .with_declaration(StructDeclaration::new("TypeMeta"))
            .with_declaration(StructDeclaration::new("ListMeta")),
    ];

    let (removed, out) = shake(&entries(&["pkg/a"]), packages);

    assert_eq!(removed, 1);
    assert_eq!(names(find(&out, "pkg/meta")), vec!["TypeMeta"]);
}

#[test]
fn test_nested_references_are_not_followed() {
    let packages = vec![
        Package::new("pkg/a").with_declaration(
            StructDeclaration::new("Holder")
                .with_field(Field::new("Ptr", Type::pointer(Type::reference("pkg/b", "P"))))
                .with_field(Field::new("List", Type::array(Type::reference("pkg/b", "L"))))
                .with_field(Field::new("Direct", Type::reference("pkg/b", "D"))),
        ),
        Package::new("pkg/b")
            .with_declaration(StructDeclaration::new("P"))
            .with_declaration(StructDeclaration::new("L"))
            .with_declaration(StructDeclaration::new("D")),
    ];

    let (removed, out) = shake(&entries(&["pkg/a"]), packages);

    assert_eq!(removed, 2);
    assert_eq!(names(find(&out, "pkg/b")), vec!["D"]);
}

#[test]
fn test_transitive_chain_across_packages() {
    let packages = vec![
        Package::new("pkg/c").with_declaration(StructDeclaration::new("Leaf")),
        Package::new("pkg/b").with_declaration(
            StructDeclaration::new("Mid").with_field(Field::new("Leaf", Type::reference("pkg/c", "Leaf"))),
        ),
        Package::new("pkg/a").with_declaration(
            StructDeclaration::new("Top").with_field(Field::new("Mid", Type::reference("pkg/b", "Mid"))),
        ),
    ];

    let shaker = TreeShaker::new(["pkg/a"]);
    let reach = shaker.analyze(&packages);
    assert_eq!(
        reach.explain(&DeclarationKey::new("pkg/c", "Leaf")),
        Some(vec![
            DeclarationKey::new("pkg/a", "Top"),
            DeclarationKey::new("pkg/b", "Mid"),
            DeclarationKey::new("pkg/c", "Leaf"),
        ])
    );
    assert_eq!(
        reach.referrers(&DeclarationKey::new("pkg/a", "Top")),
        Some(vec![Referrer::Root])
    );

    let outcome = shaker.shake_detailed(packages);
    assert_eq!(outcome.removed_count(), 0);
    assert_eq!(outcome.kept_count(), 3);
    // Input package order is preserved
    let paths: Vec<&str> = outcome.packages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["pkg/c", "pkg/b", "pkg/a"]);
}

#[test]
fn test_cycle_terminates_and_is_detected_when_dead() {
    let a = StructDeclaration::new("A").with_field(Field::new("B", Type::reference("pkg/q", "B")));
    let b = StructDeclaration::new("B").with_field(Field::new("A", Type::reference("pkg/p", "A")));
    let packages = vec![
        Package::new("pkg/entry").with_declaration(StructDeclaration::new("Root")),
        Package::new("pkg/p").with_declaration(a),
        Package::new("pkg/q").with_declaration(b),
    ];

    let shaker = TreeShaker::new(["pkg/entry"]);
    let reach = shaker.analyze(&packages);
    let cycles = CycleDetector::new().find_dead_cycles(&packages, &reach);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].size, 2);

    let outcome = shaker.shake_detailed(packages);
    assert_eq!(
        outcome.removed,
        vec![DeclarationKey::new("pkg/p", "A"), DeclarationKey::new("pkg/q", "B")]
    );
}

#[test]
fn test_live_cycle_is_kept() {
    let a = StructDeclaration::new("A").with_field(Field::new("B", Type::reference("pkg/q", "B")));
    let b = StructDeclaration::new("B").with_field(Field::new("A", Type::reference("pkg/p", "A")));
    let packages = vec![
        Package::new("pkg/p").with_declaration(a),
        Package::new("pkg/q").with_declaration(b),
    ];

    let (removed, out) = shake(&entries(&["pkg/p"]), packages);
    assert_eq!(removed, 0);
    assert_eq!(declaration_count(&out), 2);
}

#[test]
fn test_dangling_reference_is_a_dead_end() {
    let packages = vec![Package::new("pkg/a").with_declaration(
        StructDeclaration::new("Event").with_field(Field::new("At", Type::reference("time", "Time"))),
    )];

    let shaker = TreeShaker::new(["pkg/a"]);
    let reach = shaker.analyze(&packages);
    assert_eq!(reach.dangling(), vec![DeclarationKey::new("time", "Time")]);

    let (removed, out) = shaker.shake(packages);
    assert_eq!(removed, 0);
    assert_eq!(names(&out[0]), vec!["Event"]);
}

#[test]
fn test_entry_package_missing_from_input() {
    let packages = vec![Package::new("pkg/a").with_declaration(StructDeclaration::new("A"))];
    let (removed, out) = shake(&entries(&["pkg/zzz"]), packages);
    assert_eq!(removed, 1);
    assert!(out[0].is_empty());
}

// ============================================================================
// Properties
// ============================================================================

/// (is_alias, references as (package index, declaration index))
type DeclSpec = (bool, Vec<(usize, usize)>);

fn build(spec: Vec<Vec<DeclSpec>>) -> Vec<Package> {
    spec.into_iter()
        .enumerate()
        .map(|(p, decls)| {
            decls
                .into_iter()
                .enumerate()
                .fold(Package::new(format!("pkg/{}", p)), |pkg, (d, (is_alias, refs))| {
                    let name = format!("D{}", d);
                    let to = |(rp, rd): (usize, usize)| Type::reference(format!("pkg/{}", rp), format!("D{}", rd));
                    if is_alias {
                        let ty = refs.first().copied().map(to).unwrap_or_else(|| Type::primitive("string"));
                        pkg.with_declaration(AliasDeclaration::new(name, ty))
                    } else {
                        let decl = refs.into_iter().enumerate().fold(StructDeclaration::new(name), |s, (i, r)| {
                            s.with_field(Field::new(format!("F{}", i), to(r)))
                        });
                        pkg.with_declaration(decl)
                    }
                })
        })
        .collect()
}

fn arb_packages() -> impl Strategy<Value = Vec<Package>> {
    // Indices reach past the generated ranges so some references dangle
    let decl = (any::<bool>(), prop::collection::vec((0..6usize, 0..8usize), 0..4));
    prop::collection::vec(prop::collection::vec(decl, 0..6), 1..6).prop_map(build)
}

fn arb_entries() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set((0..6usize).prop_map(|i| format!("pkg/{}", i)), 0..3)
}

fn keys(packages: &[Package]) -> HashSet<DeclarationKey> {
    packages
        .iter()
        .flat_map(|p| p.declarations.iter().map(move |d| p.key(d)))
        .collect()
}

/// Reference closure computed by plain fixpoint iteration
fn naive_closure(entry: &HashSet<String>, packages: &[Package]) -> HashSet<DeclarationKey> {
    let decls: HashMap<DeclarationKey, &Declaration> = packages
        .iter()
        .flat_map(|p| p.declarations.iter().map(move |d| (p.key(d), d)))
        .collect();

    let mut kept: HashSet<DeclarationKey> = decls
        .keys()
        .filter(|k| entry.contains(&k.package))
        .cloned()
        .collect();

    loop {
        let mut added = Vec::new();
        for key in &kept {
            for reference in decls[key].refs() {
                let target = DeclarationKey::from(reference);
                if decls.contains_key(&target) && !kept.contains(&target) {
                    added.push(target);
                }
            }
        }
        if added.is_empty() {
            return kept;
        }
        kept.extend(added);
    }
}

proptest! {
    #[test]
    fn prop_shake_is_idempotent(packages in arb_packages(), entry in arb_entries()) {
        let (_, once) = shake(&entry, packages);
        let (removed, twice) = shake(&entry, once.clone());
        prop_assert_eq!(removed, 0);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_kept_set_is_the_reference_closure(packages in arb_packages(), entry in arb_entries()) {
        let expected = naive_closure(&entry, &packages);
        let (_, out) = shake(&entry, packages);
        prop_assert_eq!(keys(&out), expected);
    }

    #[test]
    fn prop_every_kept_declaration_is_justified(packages in arb_packages(), entry in arb_entries()) {
        let (_, out) = shake(&entry, packages);
        let referenced: HashSet<DeclarationKey> = out
            .iter()
            .flat_map(|p| p.declarations.iter().flat_map(|d| d.refs()))
            .map(DeclarationKey::from)
            .collect();

        for key in keys(&out) {
            prop_assert!(entry.contains(&key.package) || referenced.contains(&key));
        }
    }

    #[test]
    fn prop_order_is_preserved(packages in arb_packages(), entry in arb_entries()) {
        let input = packages.clone();
        let (_, out) = shake(&entry, packages);

        prop_assert_eq!(out.len(), input.len());
        for (before, after) in input.iter().zip(&out) {
            prop_assert_eq!(&before.path, &after.path);
            let mut remaining = before.declarations.iter();
            for kept in &after.declarations {
                prop_assert!(remaining.any(|d| d == kept));
            }
        }
    }

    #[test]
    fn prop_counts_add_up(packages in arb_packages(), entry in arb_entries()) {
        let total = declaration_count(&packages);
        let outcome = TreeShaker::new(entry).shake_detailed(packages);
        prop_assert_eq!(outcome.removed_count() + outcome.kept_count(), total);
        prop_assert_eq!(outcome.removed.len(), outcome.removed_count());
    }
}
