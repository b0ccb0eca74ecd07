//! Module dependency graph
//!
//! Tracks dependencies between modules and provides:
//! - Cycle detection
//! - Topological ordering for bundling
//!
//! Nodes live in an arena and are addressed by [`ModuleId`]. Ids are handed
//! out in insertion order, which is also the order modules were first
//! discovered, so they double as the tie-breaker for ordering.

use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors related to module graph operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Circular dependency detected. The first and last ids are the same.
    #[error("Circular dependency detected: {}", format_cycle(.0))]
    CircularDependency(Vec<ModuleId>),
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Arena index of a module, assigned in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the module graph
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Absolute path to the module (or a label for an entry without one)
    pub path: PathBuf,
    /// Modules this module requires (dependencies)
    pub imports: Vec<ModuleId>,
    /// Modules that require this module (dependents)
    pub imported_by: Vec<ModuleId>,
}

impl ModuleNode {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            imports: Vec::new(),
            imported_by: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Module dependency graph
#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: Vec<ModuleNode>,
    index: FxHashMap<PathBuf, ModuleId>,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph, returning the existing id if the path is known
    pub fn add_module(&mut self, path: PathBuf) -> ModuleId {
        if let Some(&id) = self.index.get(&path) {
            return id;
        }

        let id = ModuleId(self.nodes.len());
        self.nodes.push(ModuleNode::new(path.clone()));
        self.index.insert(path, id);
        id
    }

    /// Add a dependency edge (`from` requires `to`)
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let node = &mut self.nodes[from.0];
        if !node.imports.contains(&to) {
            node.imports.push(to);
            self.nodes[to.0].imported_by.push(from);
        }
    }

    /// Look up a module by path
    pub fn lookup(&self, path: &Path) -> Option<ModuleId> {
        self.index.get(path).copied()
    }

    /// Get a module node by id
    pub fn get(&self, id: ModuleId) -> &ModuleNode {
        &self.nodes[id.0]
    }

    /// Path of a module
    pub fn path(&self, id: ModuleId) -> &Path {
        &self.nodes[id.0].path
    }

    /// Get the number of modules in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every module reachable from `id` through requires, nearest first.
    ///
    /// `id` itself is only included when it lies on a cycle.
    pub fn transitive_dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = std::collections::VecDeque::from([id]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            for &dep in &self.nodes[current.0].imports {
                if !seen[dep.0] {
                    seen[dep.0] = true;
                    reached.push(dep);
                    queue.push_back(dep);
                }
            }
        }

        reached
    }

    /// Detect cycles in the graph
    ///
    /// Walks depth-first from every module in id order with an explicit
    /// stack. Returns the first cycle found, closed by repeating its start.
    pub fn detect_cycles(&self) -> Result<(), GraphError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            marks[start] = Mark::InProgress;
            let mut stack: Vec<(ModuleId, usize)> = vec![(ModuleId(start), 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;

                let Some(&dep) = self.nodes[node.0].imports.get(next) else {
                    marks[node.0] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[dep.0] {
                    Mark::Unvisited => {
                        marks[dep.0] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => {
                        let cycle_start = stack
                            .iter()
                            .position(|(id, _)| *id == dep)
                            .unwrap_or(0);
                        let mut cycle: Vec<ModuleId> =
                            stack[cycle_start..].iter().map(|(id, _)| *id).collect();
                        cycle.push(dep);
                        return Err(GraphError::CircularDependency(cycle));
                    }
                    Mark::Done => {}
                }
            }
        }

        Ok(())
    }

    /// Get topological order of modules (dependencies first)
    ///
    /// Among modules whose dependencies are all placed, the one discovered
    /// first (lowest id) goes next, so the order is deterministic.
    pub fn topological_order(&self) -> Result<Vec<ModuleId>, GraphError> {
        self.detect_cycles()?;

        // Number of not-yet-placed dependencies per module
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.imports.len()).collect();

        let mut ready: BinaryHeap<Reverse<ModuleId>> = pending
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(i, _)| Reverse(ModuleId(i)))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);

            for &dependent in &self.nodes[id.0].imported_by {
                pending[dependent.0] -= 1;
                if pending[dependent.0] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(paths: &[&str]) -> (ModuleGraph, Vec<ModuleId>) {
        let mut graph = ModuleGraph::new();
        let ids = paths
            .iter()
            .map(|p| graph.add_module(PathBuf::from(p)))
            .collect();
        (graph, ids)
    }

    fn position(order: &[ModuleId], id: ModuleId) -> usize {
        order.iter().position(|p| *p == id).unwrap()
    }

    #[test]
    fn test_add_module() {
        let mut graph = ModuleGraph::new();
        let path = PathBuf::from("/src/main.lua");

        let id = graph.add_module(path.clone());

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.path(id), path.as_path());
        assert_eq!(graph.lookup(&path), Some(id));
    }

    #[test]
    fn test_add_module_twice_returns_same_id() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(PathBuf::from("/a.lua"));
        let again = graph.add_module(PathBuf::from("/a.lua"));

        assert_eq!(a, again);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_add_dependency() {
        let (mut graph, ids) = graph_with(&["/src/main.lua", "/src/utils.lua"]);
        let (main, utils) = (ids[0], ids[1]);

        graph.add_dependency(main, utils);
        graph.add_dependency(main, utils);

        assert_eq!(graph.get(main).imports, vec![utils]);
        assert_eq!(graph.get(utils).imported_by, vec![main]);
    }

    #[test]
    fn test_no_cycle() {
        let (mut graph, ids) = graph_with(&["/a.lua", "/b.lua", "/c.lua"]);

        // a -> b -> c (no cycle)
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[1], ids[2]);

        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn test_simple_cycle() {
        let (mut graph, ids) = graph_with(&["/a.lua", "/b.lua"]);

        // a -> b -> a (cycle)
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[1], ids[0]);

        assert_eq!(
            graph.detect_cycles(),
            Err(GraphError::CircularDependency(vec![ids[0], ids[1], ids[0]]))
        );
    }

    #[test]
    fn test_longer_cycle_excludes_prefix() {
        let (mut graph, ids) = graph_with(&["/main.lua", "/a.lua", "/b.lua", "/c.lua"]);

        // main -> a -> b -> c -> a
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[1], ids[2]);
        graph.add_dependency(ids[2], ids[3]);
        graph.add_dependency(ids[3], ids[1]);

        assert_eq!(
            graph.detect_cycles(),
            Err(GraphError::CircularDependency(vec![ids[1], ids[2], ids[3], ids[1]]))
        );
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn test_self_cycle() {
        let (mut graph, ids) = graph_with(&["/a.lua"]);
        graph.add_dependency(ids[0], ids[0]);

        assert_eq!(
            graph.detect_cycles(),
            Err(GraphError::CircularDependency(vec![ids[0], ids[0]]))
        );
    }

    #[test]
    fn test_topological_order() {
        let (mut graph, ids) = graph_with(&["/main.lua", "/utils.lua", "/logger.lua"]);
        let (main, utils, logger) = (ids[0], ids[1], ids[2]);

        // main -> utils -> logger
        graph.add_dependency(main, utils);
        graph.add_dependency(utils, logger);

        let order = graph.topological_order().unwrap();

        assert_eq!(order, vec![logger, utils, main]);
    }

    #[test]
    fn test_diamond_dependency() {
        let (mut graph, ids) = graph_with(&["/main.lua", "/a.lua", "/b.lua", "/shared.lua"]);
        let (main, a, b, shared) = (ids[0], ids[1], ids[2], ids[3]);

        // main -> a -> shared
        //      -> b -> shared
        graph.add_dependency(main, a);
        graph.add_dependency(main, b);
        graph.add_dependency(a, shared);
        graph.add_dependency(b, shared);

        let order = graph.topological_order().unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(&order, shared) < position(&order, a));
        assert!(position(&order, shared) < position(&order, b));
        assert!(position(&order, a) < position(&order, main));
        assert!(position(&order, b) < position(&order, main));
    }

    #[test]
    fn test_ties_broken_by_discovery_order() {
        let (mut graph, ids) = graph_with(&["/main.lua", "/z.lua", "/a.lua", "/m.lua"]);

        // main requires three independent modules
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[0], ids[2]);
        graph.add_dependency(ids[0], ids[3]);

        let order = graph.topological_order().unwrap();

        assert_eq!(order, vec![ids[1], ids[2], ids[3], ids[0]]);
    }

    #[test]
    fn test_transitive_dependencies() {
        let (mut graph, ids) = graph_with(&["/main.lua", "/a.lua", "/b.lua", "/c.lua", "/d.lua"]);

        // main -> a -> c, main -> b -> c; d is unreachable
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[0], ids[2]);
        graph.add_dependency(ids[1], ids[3]);
        graph.add_dependency(ids[2], ids[3]);

        assert_eq!(graph.transitive_dependencies(ids[0]), vec![ids[1], ids[2], ids[3]]);
        assert_eq!(graph.transitive_dependencies(ids[3]), vec![]);
    }

    #[test]
    fn test_transitive_dependencies_through_cycle() {
        let (mut graph, ids) = graph_with(&["/a.lua", "/b.lua"]);
        graph.add_dependency(ids[0], ids[1]);
        graph.add_dependency(ids[1], ids[0]);

        assert_eq!(graph.transitive_dependencies(ids[0]), vec![ids[1], ids[0]]);
    }

    #[test]
    fn test_deep_chain_is_stack_safe() {
        let mut graph = ModuleGraph::new();
        let mut previous = graph.add_module(PathBuf::from("/m0.lua"));
        for i in 1..50_000 {
            let next = graph.add_module(PathBuf::from(format!("/m{}.lua", i)));
            graph.add_dependency(previous, next);
            previous = next;
        }

        let order = graph.topological_order().unwrap();

        assert_eq!(order.len(), 50_000);
        assert_eq!(order[0], previous);
        assert_eq!(order[49_999], ModuleId(0));
    }
}
