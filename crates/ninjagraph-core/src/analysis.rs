//! # Graph Analysis
//!
//! Structural algorithms over the target-induced subgraph: topological
//! build ordering (Kahn's algorithm) and cycle detection (three-color DFS).
//!
//! Both operate on the subgraph of `depends_on` edges restricted to
//! dependencies that are themselves targets; plain source files never
//! constrain ordering. Each edge expansion is a store round-trip, so cost
//! is dominated by query latency rather than the O(V+E) core.

use crate::model::NinjaGraph;
use crate::types::GraphError;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Visiting,
    Done,
}

impl NinjaGraph {
    /// Targets in topological build order.
    ///
    /// Fails with `CycleDetected` when the subgraph has a cycle. An empty
    /// graph yields an empty order. Ties break in the store's enumeration
    /// order, which is stable per store state but not guaranteed across
    /// stores.
    pub fn get_build_order(&self) -> Result<Vec<String>, GraphError> {
        let targets = self.get_all_targets()?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
        for target in &targets {
            adjacency.insert(target.path.clone(), Vec::new());
            in_degree.insert(target.path.clone(), 0);
        }

        // Edge dep -> target for every dependency that is itself a target.
        for target in &targets {
            let Ok(deps) = self.get_build_dependencies(&target.path) else {
                continue;
            };
            for dep in deps {
                if adjacency.contains_key(&dep.path) {
                    if let Some(successors) = adjacency.get_mut(&dep.path) {
                        successors.push(target.path.clone());
                    }
                    if let Some(degree) = in_degree.get_mut(&target.path) {
                        *degree += 1;
                    }
                }
            }
        }

        let mut queue: VecDeque<String> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(path, _)| path.clone())
            .collect();

        let mut order = Vec::with_capacity(targets.len());
        while let Some(current) = queue.pop_front() {
            order.push(current.clone());
            if let Some(successors) = adjacency.get(&current) {
                for successor in successors.clone() {
                    if let Some(degree) = in_degree.get_mut(&successor) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(successor);
                        }
                    }
                }
            }
        }

        if order.len() != targets.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(order)
    }

    /// All dependency cycles among targets.
    ///
    /// Each cycle is the slice of the DFS path from the first occurrence of
    /// the re-entered node onward. Cycle presence is a result, not an
    /// error; the empty list means the graph is acyclic.
    pub fn find_cycles(&self) -> Result<Vec<Vec<String>>, GraphError> {
        let targets = self.get_all_targets()?;

        let mut colors: BTreeMap<String, Color> = targets
            .iter()
            .map(|t| (t.path.clone(), Color::Unvisited))
            .collect();
        let mut cycles = Vec::new();
        let mut path = Vec::new();

        for target in &targets {
            if colors.get(&target.path) == Some(&Color::Unvisited) {
                self.cycle_dfs(&target.path, &mut colors, &mut path, &mut cycles)?;
            }
        }
        Ok(cycles)
    }

    fn cycle_dfs(
        &self,
        node: &str,
        colors: &mut BTreeMap<String, Color>,
        path: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) -> Result<(), GraphError> {
        match colors.get(node) {
            Some(Color::Visiting) => {
                if let Some(start) = path.iter().position(|p| p == node) {
                    cycles.push(path[start..].to_vec());
                }
                return Ok(());
            }
            Some(Color::Done) => return Ok(()),
            _ => {}
        }

        colors.insert(node.to_string(), Color::Visiting);
        path.push(node.to_string());

        let deps = self.get_build_dependencies(node)?;
        for dep in deps {
            // Only dependencies that are targets participate.
            if colors.contains_key(&dep.path) {
                self.cycle_dfs(&dep.path, colors, path, cycles)?;
            }
        }

        colors.insert(node.to_string(), Color::Done);
        path.pop();
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::NinjaParser;
    use tempfile::tempdir;

    fn graph_from(text: &str) -> (tempfile::TempDir, NinjaGraph) {
        let temp = tempdir().expect("temp dir");
        let graph = NinjaGraph::open(temp.path().join("store")).expect("open graph");
        NinjaParser::new(&graph).parse_and_load(text).expect("load");
        (temp, graph)
    }

    #[test]
    fn empty_graph_orders_to_nothing() {
        let temp = tempdir().expect("temp dir");
        let graph = NinjaGraph::open(temp.path().join("store")).expect("open");
        assert!(graph.get_build_order().expect("order").is_empty());
        assert!(graph.find_cycles().expect("cycles").is_empty());
    }

    #[test]
    fn linear_chain_orders_dep_first() {
        let (_temp, graph) = graph_from(
            "rule cc\n  command = gcc -c $in -o $out\nbuild a.o: cc a.c\nbuild prog: cc a.o\n",
        );

        assert_eq!(graph.get_build_order().expect("order"), vec!["a.o", "prog"]);
        assert!(graph.find_cycles().expect("cycles").is_empty());
    }

    #[test]
    fn diamond_orders_source_first_sink_last() {
        let (_temp, graph) = graph_from(
            "rule cc\n  command = gcc\n\
             build c: cc base.c\n\
             build a: cc c\n\
             build b: cc c\n\
             build d: cc a b\n",
        );

        let order = graph.get_build_order().expect("order");
        assert_eq!(order.len(), 4);
        assert_eq!(order.first().map(String::as_str), Some("c"));
        assert_eq!(order.last().map(String::as_str), Some("d"));

        let reverse = graph.get_reverse_dependencies("c").expect("reverse");
        let mut paths: Vec<String> = reverse.into_iter().map(|t| t.path).collect();
        paths.sort();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn two_cycle_is_detected() {
        let (_temp, graph) = graph_from(
            "rule cc\n  command = gcc\nbuild a: cc b\nbuild b: cc a\n",
        );

        let cycles = graph.find_cycles().expect("cycles");
        assert_eq!(cycles.len(), 1);
        let mut nodes = cycles[0].clone();
        nodes.sort();
        assert_eq!(nodes, vec!["a", "b"]);

        assert!(matches!(
            graph.get_build_order(),
            Err(GraphError::CycleDetected)
        ));
    }

    #[test]
    fn self_cycle_is_detected() {
        let (_temp, graph) = graph_from("rule cc\n  command = gcc\nbuild a: cc a\n");

        let cycles = graph.find_cycles().expect("cycles");
        assert_eq!(cycles, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn order_succeeds_iff_no_cycles() {
        let acyclic = "rule cc\n  command = gcc\nbuild a.o: cc a.c\nbuild prog: cc a.o\n";
        let cyclic = "rule cc\n  command = gcc\nbuild a: cc b\nbuild b: cc a\n";

        let (_t1, ok_graph) = graph_from(acyclic);
        assert!(ok_graph.find_cycles().expect("cycles").is_empty());
        assert!(ok_graph.get_build_order().is_ok());

        let (_t2, bad_graph) = graph_from(cyclic);
        assert!(!bad_graph.find_cycles().expect("cycles").is_empty());
        assert!(bad_graph.get_build_order().is_err());
    }

    #[test]
    fn order_respects_every_edge() {
        let (_temp, graph) = graph_from(
            "rule cc\n  command = gcc\n\
             build low: cc src.c\n\
             build mid1: cc low\n\
             build mid2: cc low\n\
             build top: cc mid1 mid2\n",
        );

        let order = graph.get_build_order().expect("order");
        let position = |p: &str| order.iter().position(|x| x == p).expect("present");
        assert!(position("low") < position("mid1"));
        assert!(position("low") < position("mid2"));
        assert!(position("mid1") < position("top"));
        assert!(position("mid2") < position("top"));
    }

    #[test]
    fn source_files_never_constrain_order() {
        // base.c is consumed by both builds but is not a target; it must not
        // create edges between them.
        let (_temp, graph) = graph_from(
            "rule cc\n  command = gcc\nbuild x: cc base.c\nbuild y: cc base.c\n",
        );

        let order = graph.get_build_order().expect("order");
        assert_eq!(order.len(), 2);
    }
}
