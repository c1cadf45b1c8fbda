//! Cooker dependency graph
//!
//! Arena of cooker nodes with index-based edges. An edge `a -> b` means
//! `a` depends on `b`. Traversals are iterative, so chain depth is bounded
//! only by memory.

use pantry_core::CookerPath;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{BTreeSet, HashMap};

/// Visit state for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug, Default)]
pub struct CookerGraph {
    graph: DiGraph<CookerPath, ()>,
    nodes: HashMap<CookerPath, NodeIndex>,
}

impl CookerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cooker if it is not present yet
    pub fn add_cooker(&mut self, path: &CookerPath) -> NodeIndex {
        if let Some(&index) = self.nodes.get(path) {
            return index;
        }
        let index = self.graph.add_node(path.clone());
        self.nodes.insert(path.clone(), index);
        index
    }

    /// `dependent` derives from `dependency`
    pub fn add_dependency(&mut self, dependent: &CookerPath, dependency: &CookerPath) {
        let from = self.add_cooker(dependent);
        let to = self.add_cooker(dependency);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, path: &CookerPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// First cycle found, as `a → … → a`
    pub fn find_cycle(&self) -> Option<Vec<CookerPath>> {
        let mut colors = vec![Color::White; self.graph.node_count()];

        for start in self.graph.node_indices() {
            if colors[start.index()] != Color::White {
                continue;
            }
            colors[start.index()] = Color::Gray;
            let mut stack = vec![(start, self.graph.neighbors(start))];

            while let Some((node, neighbors)) = stack.last_mut() {
                let node = *node;
                let Some(next) = neighbors.next() else {
                    colors[node.index()] = Color::Black;
                    stack.pop();
                    continue;
                };
                match colors[next.index()] {
                    Color::White => {
                        colors[next.index()] = Color::Gray;
                        stack.push((next, self.graph.neighbors(next)));
                    }
                    Color::Gray => {
                        // `next` is on the current path, so the cycle starts there
                        let begin = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        let mut cycle: Vec<CookerPath> =
                            stack[begin..].iter().map(|(n, _)| self.graph[*n].clone()).collect();
                        cycle.push(self.graph[next].clone());
                        return Some(cycle);
                    }
                    Color::Black => {}
                }
            }
        }
        None
    }

    /// Every cooker, dependencies before dependents. `Err` carries a cycle.
    pub fn topological_order(&self) -> Result<Vec<CookerPath>, Vec<CookerPath>> {
        if let Some(cycle) = self.find_cycle() {
            return Err(cycle);
        }
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .rev()
                .map(|i| self.graph[i].clone())
                .collect()),
            Err(cycle) => Err(vec![self.graph[cycle.node_id()].clone()]),
        }
    }

    /// Transitive dependencies of `path`, excluding `path` itself
    pub fn dependencies_of(&self, path: &CookerPath) -> BTreeSet<CookerPath> {
        let mut found = BTreeSet::new();
        let Some(&start) = self.nodes.get(path) else {
            return found;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                found.insert(self.graph[node].clone());
            }
        }
        found
    }
}
