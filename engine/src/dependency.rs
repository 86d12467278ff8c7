//! FILENAME: engine/src/dependency.rs
//! PURPOSE: Cycle detection and cache invalidation over the dependency graph.
//! CONTEXT: The graph is keyed by Position and its edges live on the cells
//! themselves: depends_on points at referenced cells, dependents points
//! back. Both traversals here are iterative with explicit stacks and
//! visited sets, so chains as long as the populated cell count cannot
//! overflow the call stack. Both tolerate positions with no cell behind
//! them: a missing target has no outgoing edges, a dangling dependent is
//! skipped.

use std::collections::{HashMap, HashSet};

use crate::cell::Cell;
use crate::position::Position;

/// Checks whether giving `writer` the outgoing references `refs` would
/// close a cycle: either a direct self-reference, or some reference whose
/// transitive depends_on chain already reaches `writer`.
pub(crate) fn creates_cycle(
    cells: &HashMap<Position, Cell>,
    writer: Position,
    refs: &[Position],
) -> bool {
    // A cell referencing itself is the trivial cycle
    if refs.contains(&writer) {
        return true;
    }

    let mut visited: HashSet<Position> = HashSet::new();
    let mut stack: Vec<Position> = refs.to_vec();

    while let Some(current) = stack.pop() {
        if current == writer {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(cell) = cells.get(&current) {
            for &next in cell.depends_on() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
    }

    false
}

/// Clears the memoized result of `start` and of every cell that
/// transitively depends on it.
pub(crate) fn invalidate(cells: &HashMap<Position, Cell>, start: Position) {
    let mut visited: HashSet<Position> = HashSet::new();
    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(cell) = cells.get(&current) {
            cell.clear_own_cache();
            for &next in cell.dependents() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
    }
}
