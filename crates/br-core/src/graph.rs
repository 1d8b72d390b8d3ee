//! Thread wait-for graph and deadlock detection.
//!
//! An edge `A -> B` means thread `A` is blocked on a lock held by `B`.
//! Any cycle is a deadlock.

use std::collections::HashMap;

use serde::Serialize;

/// A labeled wait-for edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitEdge {
    pub from: usize,
    pub to: usize,
    pub from_name: String,
    pub to_name: String,
    pub lock: String,
}

/// Directed multigraph over thread names.
///
/// Names are interned to dense ids in insertion order, which makes
/// [`ThreadGraph::find_deadlock`] deterministic.
#[derive(Debug, Default)]
pub struct ThreadGraph {
    ids: HashMap<String, usize>,
    names: Vec<String>,
    edges: Vec<WaitEdge>,
    /// Outgoing edge indices per vertex.
    outgoing: Vec<Vec<usize>>,
}

impl ThreadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a thread, returning its id. Idempotent.
    pub fn add_thread(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        self.outgoing.push(Vec::new());
        id
    }

    /// Adds `from -> to` labeled with `lock`.
    ///
    /// Both threads must have been added first; otherwise the edge is
    /// dropped and `false` returned.
    pub fn add_dependency(&mut self, from: &str, to: &str, lock: &str) -> bool {
        let (Some(&from_id), Some(&to_id)) = (self.ids.get(from), self.ids.get(to)) else {
            tracing::warn!(from, to, lock, "dropping wait edge for unknown thread");
            return false;
        };
        self.outgoing[from_id].push(self.edges.len());
        self.edges.push(WaitEdge {
            from: from_id,
            to: to_id,
            from_name: from.to_string(),
            to_name: to.to_string(),
            lock: lock.to_string(),
        });
        true
    }

    pub fn thread_count(&self) -> usize {
        self.names.len()
    }

    pub fn edges(&self) -> &[WaitEdge] {
        &self.edges
    }

    /// Thread names of the first cycle found, in wait order, or empty.
    pub fn find_deadlock(&self) -> Vec<String> {
        self.find_cycle()
            .into_iter()
            .map(|edge| edge.from_name.clone())
            .collect()
    }

    /// Edges of the first cycle found, ending with the edge that closes it.
    pub fn find_cycle(&self) -> Vec<&WaitEdge> {
        let n = self.names.len();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut parent_edge: Vec<Option<usize>> = vec![None; n];

        for root in 0..n {
            if visited[root] {
                continue;
            }
            // (vertex, position in its outgoing list)
            let mut stack = vec![(root, 0usize)];
            visited[root] = true;
            on_stack[root] = true;

            while let Some(top) = stack.last_mut() {
                let vertex = top.0;
                let Some(&edge_idx) = self.outgoing[vertex].get(top.1) else {
                    on_stack[vertex] = false;
                    stack.pop();
                    continue;
                };
                top.1 += 1;

                let target = self.edges[edge_idx].to;
                if on_stack[target] {
                    return self.unwind(vertex, target, edge_idx, &parent_edge);
                }
                if !visited[target] {
                    visited[target] = true;
                    on_stack[target] = true;
                    parent_edge[target] = Some(edge_idx);
                    stack.push((target, 0));
                }
            }
        }
        Vec::new()
    }

    /// Walks parent edges from `vertex` back to `target`.
    fn unwind(
        &self,
        mut vertex: usize,
        target: usize,
        closing: usize,
        parent_edge: &[Option<usize>],
    ) -> Vec<&WaitEdge> {
        let mut cycle = Vec::new();
        while vertex != target {
            let Some(edge_idx) = parent_edge[vertex] else {
                break;
            };
            cycle.push(&self.edges[edge_idx]);
            vertex = self.edges[edge_idx].from;
        }
        cycle.reverse();
        cycle.push(&self.edges[closing]);
        cycle
    }
}
