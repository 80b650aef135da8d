//! FILENAME: core/engine/src/dependency_graph.rs
//! PURPOSE: Tracks which cells reference which other cells.
//! CONTEXT: Every formula edit rewrites this graph, and the graph answers the
//! two questions the sheet needs: "would this assignment close a loop?"
//! before committing a formula, and "whose caches are now stale?" after any
//! change. Both directions are kept so each lookup is direct.
//!
//! TERMINOLOGY:
//! - Precedents: cells a formula references (its inputs).
//!   If A3 = A1 + A2, then A1 and A2 are precedents of A3.
//! - Dependents: cells that reference a given cell (reverse lookup).
//!   If A3 = A1 + A2, then A3 is a dependent of A1 and A2.
//!
//! The graph stores positions, never cell handles, so it owns nothing and
//! survives cells being cleared out from under it.

use std::collections::{HashMap, HashSet, VecDeque};
use tabula_parser::Position;

/// The dependency graph: forward (precedents) and reverse (dependents)
/// mappings between cell positions.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// For each cell, the set of cells it directly depends on.
    precedents: HashMap<Position, HashSet<Position>>,

    /// For each cell, the set of cells that directly depend on it.
    dependents: HashMap<Position, HashSet<Position>>,
}

impl DependencyGraph {
    /// Creates a new, empty dependency graph.
    pub fn new() -> Self {
        DependencyGraph {
            precedents: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Sets the dependencies for a cell, replacing any previous dependencies.
    /// This updates both the precedents and dependents mappings.
    ///
    /// Does NOT check for cycles; call `would_create_cycle()` first.
    pub fn set_dependencies(&mut self, cell: Position, new_precedents: HashSet<Position>) {
        self.clear_dependencies(cell);

        if !new_precedents.is_empty() {
            for &prec in &new_precedents {
                self.dependents.entry(prec).or_default().insert(cell);
            }

            self.precedents.insert(cell, new_precedents);
        }
    }

    /// Removes a cell's outgoing edges: its precedents entry and its
    /// membership in each precedent's dependents set. The cell's own
    /// dependents (cells referencing it) are left alone — they may still
    /// reference this position.
    pub fn clear_dependencies(&mut self, cell: Position) {
        if let Some(old_precs) = self.precedents.remove(&cell) {
            for prec in old_precs {
                if let Some(deps) = self.dependents.get_mut(&prec) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.dependents.remove(&prec);
                    }
                }
            }
        }
    }

    /// Returns the direct precedents of a cell, or None if it has none.
    pub fn get_precedents(&self, cell: Position) -> Option<&HashSet<Position>> {
        self.precedents.get(&cell)
    }

    /// Returns the direct dependents of a cell, or None if no cell depends on it.
    pub fn get_dependents(&self, cell: Position) -> Option<&HashSet<Position>> {
        self.dependents.get(&cell)
    }

    /// Checks if giving `cell` the proposed precedents would create a cycle.
    /// Read-only: the tentative edges are never inserted, so a rejected
    /// assignment leaves the graph exactly as it was.
    pub fn would_create_cycle(&self, cell: Position, new_precedents: &HashSet<Position>) -> bool {
        // A cell depending on itself is a trivial cycle
        if new_precedents.contains(&cell) {
            return true;
        }

        // Otherwise a cycle exists iff some proposed precedent can already
        // reach `cell` through the existing precedent chains.
        for &prec in new_precedents {
            if self.can_reach(prec, cell) {
                return true;
            }
        }

        false
    }

    /// Depth-first reachability from `start` to `target` along precedent
    /// edges. Cells without a precedents entry (text, empty, or absent
    /// cells) are leaves of the search.
    fn can_reach(&self, start: Position, target: Position) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }

            if !visited.insert(current) {
                continue;
            }

            if let Some(precs) = self.precedents.get(&current) {
                for &prec in precs {
                    if !visited.contains(&prec) {
                        stack.push(prec);
                    }
                }
            }
        }

        false
    }

    /// Gets all transitive dependents of a cell (not including the cell
    /// itself): the set whose cached values a change at `cell` invalidates.
    /// BFS over the reverse edges; the visited set keeps diamonds cheap.
    pub fn get_all_dependents(&self, cell: Position) -> HashSet<Position> {
        let mut result = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(deps) = self.dependents.get(&cell) {
            for &dep in deps {
                queue.push_back(dep);
            }
        }

        while let Some(current) = queue.pop_front() {
            if !result.insert(current) {
                continue;
            }

            if let Some(deps) = self.dependents.get(&current) {
                for &dep in deps {
                    if !result.contains(&dep) {
                        queue.push_back(dep);
                    }
                }
            }
        }

        result
    }

    /// Returns the number of cells that currently have precedents.
    pub fn formula_cell_count(&self) -> usize {
        self.precedents.len()
    }

    /// Returns the total number of dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.precedents.values().map(|v| v.len()).sum()
    }
}
