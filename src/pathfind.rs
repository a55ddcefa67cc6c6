//! Shortest relationship path between two tables.

use std::collections::{HashMap, VecDeque};

use crate::graph::RelationshipGraph;
use crate::schema::TableId;

/// Breadth-first search over the undirected relationship graph.
///
/// Returns one shortest path from `start` to `end` inclusive; ties go to
/// the first-discovered route (neighbors are visited in id order). Empty
/// when either endpoint is missing or no path exists.
pub fn shortest_path(graph: &RelationshipGraph, start: &str, end: &str) -> Vec<TableId> {
    if !graph.contains(start) || !graph.contains(end) {
        return Vec::new();
    }
    if start == end {
        return vec![TableId::from(start)];
    }

    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    parent.insert(start, start);

    while let Some(node) = queue.pop_front() {
        if node == end {
            break;
        }
        let Some(neighbors) = graph.neighbors(node) else {
            continue;
        };
        for next in neighbors {
            let next = next.as_str();
            if !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    if !parent.contains_key(end) {
        return Vec::new();
    }

    let mut path = vec![TableId::from(end)];
    let mut cursor = end;
    while cursor != start {
        cursor = parent[cursor];
        path.push(TableId::from(cursor));
    }
    path.reverse();
    path
}

/// Consecutive table pairs along a path, for edge highlighting.
pub fn path_edges(path: &[TableId]) -> impl Iterator<Item = (&TableId, &TableId)> {
    path.windows(2).map(|w| (&w[0], &w[1]))
}
