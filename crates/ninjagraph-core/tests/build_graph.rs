//! # Build Graph Integration Tests
//!
//! End-to-end invariants over parse -> store -> query -> analysis, plus
//! property tests for the parser and the variables serialization.

#![allow(clippy::unwrap_used, clippy::panic)]

use ninjagraph_core::{parse, GraphError, NinjaGraph, NinjaParser};
use proptest::collection::btree_map;
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::tempdir;

fn open_graph(dir: &tempfile::TempDir) -> NinjaGraph {
    NinjaGraph::open(dir.path().join("store")).expect("open graph")
}

fn load(graph: &NinjaGraph, text: &str) {
    NinjaParser::new(graph).parse_and_load(text).expect("load");
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn linear_chain_scenario() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(
        &graph,
        "rule cc\n  command = gcc -c $in -o $out\nbuild a.o: cc a.c\nbuild prog: cc a.o\n",
    );

    assert_eq!(graph.get_build_order().expect("order"), vec!["a.o", "prog"]);
    assert!(graph.find_cycles().expect("cycles").is_empty());

    let reverse: Vec<String> = graph
        .get_reverse_dependencies("a.c")
        .expect("reverse")
        .into_iter()
        .map(|t| t.path)
        .collect();
    assert_eq!(reverse, vec!["a.o"]);

    let deps: Vec<String> = graph
        .get_build_dependencies("prog")
        .expect("deps")
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(deps, vec!["a.o"]);
}

#[test]
fn diamond_scenario() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(
        &graph,
        "rule cc\n  command = gcc\n\
         build c: cc src.c\n\
         build a: cc c\n\
         build b: cc c\n\
         build d: cc a b\n",
    );

    let order = graph.get_build_order().expect("order");
    assert_eq!(order.first().map(String::as_str), Some("c"));
    assert_eq!(order.last().map(String::as_str), Some("d"));

    let mut reverse: Vec<String> = graph
        .get_reverse_dependencies("c")
        .expect("reverse")
        .into_iter()
        .map(|t| t.path)
        .collect();
    reverse.sort();
    assert_eq!(reverse, vec!["a", "b"]);
}

#[test]
fn cycle_scenario() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(&graph, "rule cc\n  command = gcc\nbuild a: cc b\nbuild b: cc a\n");

    let cycles = graph.find_cycles().expect("cycles");
    assert_eq!(cycles.len(), 1);
    let nodes: BTreeSet<&str> = cycles[0].iter().map(String::as_str).collect();
    assert_eq!(nodes, BTreeSet::from(["a", "b"]));

    assert!(matches!(
        graph.get_build_order(),
        Err(GraphError::CycleDetected)
    ));
}

#[test]
fn implicit_vs_order_deps_scenario() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(
        &graph,
        "rule cc\n  command = gcc\nbuild out: cc in | h.h || gen.h\n",
    );

    let mut deps: Vec<String> = graph
        .get_build_dependencies("out")
        .expect("deps")
        .into_iter()
        .map(|f| f.path)
        .collect();
    deps.sort();
    assert_eq!(deps, vec!["h.h", "in"]);

    let by_rule: Vec<String> = graph
        .get_targets_by_rule("cc")
        .expect("by rule")
        .into_iter()
        .map(|t| t.path)
        .collect();
    assert_eq!(by_rule, vec!["out"]);

    // Order-only deps never produce reverse dependencies either.
    assert!(graph
        .get_reverse_dependencies("gen.h")
        .expect("reverse")
        .is_empty());
}

#[test]
fn line_continuation_scenario() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(&graph, "rule cc\n  command = gcc $\n  -O2 $in\nbuild a.o: cc a.c\n");

    assert_eq!(graph.get_rule("cc").expect("rule").command, "gcc -O2 $in");
}

#[test]
fn duplicate_load_is_idempotent() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    let text = "rule cc\n  command = gcc\nbuild a.o: cc a.c h.h\nbuild prog: cc a.o\n";

    load(&graph, text);
    let first = graph.get_build_stats().expect("stats");

    load(&graph, text);
    let second = graph.get_build_stats().expect("stats");

    assert_eq!(first, second);
}

#[test]
fn empty_file_loads_zero_entities() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(&graph, "");

    let stats = graph.get_build_stats().expect("stats");
    assert_eq!(stats["rules"], 0);
    assert_eq!(stats["builds"], 0);
    assert_eq!(stats["targets"], 0);
    assert_eq!(stats["files"], 0);
    assert_eq!(stats["total_quads"], 0);
}

#[test]
fn parse_error_leaves_store_untouched() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);

    // The first rule is complete, but the second rule is missing its
    // command; nothing at all may land in the store.
    let text = "rule cc\n  command = gcc\nbuild a.o: cc a.c\nrule broken\n  description = no command\n";
    let err = NinjaParser::new(&graph).parse_and_load(text).unwrap_err();
    assert!(matches!(err, GraphError::Parse(_)));

    assert_eq!(graph.get_build_stats().expect("stats")["total_quads"], 0);
}

#[test]
fn status_update_survives_reparse() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    let text = "rule cc\n  command = gcc\nbuild a.o: cc a.c\n";

    load(&graph, text);
    graph.update_target_status("a.o", "dirty").expect("update");
    load(&graph, text);

    assert_eq!(graph.get_target("a.o").expect("target").status, "dirty");
}

#[test]
fn reparse_after_reopen_preserves_graph() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("store");
    let text = "rule cc\n  command = gcc\nbuild a.o: cc a.c\n";

    {
        let graph = NinjaGraph::open(&path).expect("open");
        NinjaParser::new(&graph).parse_and_load(text).expect("load");
    }

    {
        let graph = NinjaGraph::open(&path).expect("reopen");
        assert_eq!(graph.get_target("a.o").expect("target").build, "build:a.o");
        assert_eq!(graph.get_build_order().expect("order"), vec!["a.o"]);
    }
}

#[test]
fn reverse_dependencies_match_depends_on() {
    let temp = tempdir().expect("temp dir");
    let graph = open_graph(&temp);
    load(
        &graph,
        "rule cc\n  command = gcc\n\
         build x.o: cc x.c common.h\n\
         build y.o: cc y.c common.h\n\
         build prog: cc x.o y.o\n",
    );

    // For every target T and file F: T in reverse_deps(F) iff F in deps(T).
    let targets = graph.get_all_targets().expect("targets");
    for file in ["x.c", "y.c", "common.h", "x.o", "y.o"] {
        let dependents: BTreeSet<String> = graph
            .get_reverse_dependencies(file)
            .expect("reverse")
            .into_iter()
            .map(|t| t.path)
            .collect();
        for target in &targets {
            let deps: BTreeSet<String> = graph
                .get_build_dependencies(&target.path)
                .expect("deps")
                .into_iter()
                .map(|f| f.path)
                .collect();
            assert_eq!(
                dependents.contains(&target.path),
                deps.contains(file),
                "mismatch for target {} and file {}",
                target.path,
                file
            );
        }
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Variables maps survive the JSON-text round trip for any string map.
    #[test]
    fn variables_round_trip_is_identity(
        vars in btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 0..8)
    ) {
        let mut rule = ninjagraph_core::NinjaRule::new("cc", "gcc");
        rule.set_variables(&vars).expect("set");
        prop_assert!(!rule.variables.is_empty());
        prop_assert_eq!(rule.get_variables().expect("get"), vars);
    }

    /// Parsing is deterministic: the same text yields the same parse.
    #[test]
    fn parse_is_deterministic(
        names in proptest::collection::vec("[a-z]{1,8}", 1..6)
    ) {
        let mut text = String::from("rule cc\n  command = gcc\n");
        for name in &names {
            text.push_str(&format!("build {name}.o: cc {name}.c\n"));
        }

        let first = parse(&text).expect("parse");
        let second = parse(&text).expect("parse");
        prop_assert_eq!(first, second);
    }

    /// Every parsed build declares the outputs present in the source text,
    /// and loading exposes exactly those targets.
    #[test]
    fn loaded_targets_match_source_outputs(
        names in proptest::collection::btree_set("[a-z]{1,8}", 1..6)
    ) {
        let mut text = String::from("rule cc\n  command = gcc\n");
        for name in &names {
            text.push_str(&format!("build {name}.o: cc {name}.c\n"));
        }

        let temp = tempdir().expect("temp dir");
        let graph = open_graph(&temp);
        load(&graph, &text);

        let targets: BTreeSet<String> = graph
            .get_all_targets()
            .expect("targets")
            .into_iter()
            .map(|t| t.path)
            .collect();
        let expected: BTreeSet<String> =
            names.iter().map(|n| format!("{n}.o")).collect();
        prop_assert_eq!(targets, expected);
    }
}
