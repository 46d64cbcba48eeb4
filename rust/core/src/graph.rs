// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room adjacency graph.
//!
//! - **Nodes** = rooms, keyed by [`RoomId`]
//! - **Edges** = physically shared wall segments, weighted by their length
//!
//! Rooms on different floors never share a wall, so builders only connect
//! rooms on the same floor.

use std::collections::VecDeque;

use madori_geometry::shared_boundary_length;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::room::{RoomId, RoomInstance};

/// A shared wall between two rooms. `a < b` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyEdge {
    pub a: RoomId,
    pub b: RoomId,
    /// Length of the shared boundary, in the unit of the room geometry.
    pub shared_length: f64,
}

/// Undirected room-contact graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRepr", into = "GraphRepr")]
pub struct AdjacencyGraph {
    nodes: Vec<RoomId>,
    edges: Vec<AdjacencyEdge>,
    /// Adjacency list: node index → list of (neighbor index, edge index).
    adjacency: Vec<SmallVec<[(usize, usize); 4]>>,
    /// Map from room id to node index for fast lookup.
    id_to_node: FxHashMap<RoomId, usize>,
}

impl AdjacencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the contact graph of a set of rooms.
    ///
    /// Every room becomes a node. Two rooms on the same floor are connected
    /// when their boundaries, allowing for `tolerance`, touch along more
    /// than `min_contact`.
    pub fn from_rooms(rooms: &[RoomInstance], tolerance: f64, min_contact: f64) -> Self {
        let mut graph = Self::new();
        for room in rooms {
            graph.add_node(room.id);
        }

        let polygons: Vec<_> = rooms.iter().map(|r| r.polygon()).collect();
        for i in 0..rooms.len() {
            for j in (i + 1)..rooms.len() {
                if rooms[i].floor != rooms[j].floor {
                    continue;
                }
                let length = shared_boundary_length(&polygons[i], &polygons[j], tolerance);
                if length > min_contact {
                    // Both ids were just inserted
                    let _ = graph.add_edge(rooms[i].id, rooms[j].id, length);
                }
            }
        }
        graph
    }

    /// Adds a node, returning its index. Existing ids are not duplicated.
    pub fn add_node(&mut self, id: RoomId) -> usize {
        if let Some(&idx) = self.id_to_node.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.id_to_node.insert(id, idx);
        self.nodes.push(id);
        self.adjacency.push(SmallVec::new());
        idx
    }

    /// Adds an undirected edge between two known rooms.
    ///
    /// A second edge between the same pair keeps the longer length.
    pub fn add_edge(&mut self, a: RoomId, b: RoomId, shared_length: f64) -> Result<usize> {
        if a == b {
            return Err(Error::Graph(format!("self-loop on room {a}")));
        }
        let (Some(&ia), Some(&ib)) = (self.id_to_node.get(&a), self.id_to_node.get(&b)) else {
            return Err(Error::Graph(format!("edge {a}-{b} references an unknown room")));
        };

        if let Some(&(_, edge_idx)) = self.adjacency[ia].iter().find(|(n, _)| *n == ib) {
            let edge = &mut self.edges[edge_idx];
            edge.shared_length = edge.shared_length.max(shared_length);
            return Ok(edge_idx);
        }

        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let idx = self.edges.len();
        self.edges.push(AdjacencyEdge { a, b, shared_length });
        self.adjacency[ia].push((ib, idx));
        self.adjacency[ib].push((ia, idx));
        Ok(idx)
    }

    pub fn nodes(&self) -> &[RoomId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AdjacencyEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: RoomId) -> bool {
        self.id_to_node.contains_key(&id)
    }

    /// The edge between two rooms, if they touch.
    pub fn edge_between(&self, a: RoomId, b: RoomId) -> Option<&AdjacencyEdge> {
        let ia = *self.id_to_node.get(&a)?;
        let ib = *self.id_to_node.get(&b)?;
        self.adjacency[ia]
            .iter()
            .find(|(n, _)| *n == ib)
            .map(|&(_, e)| &self.edges[e])
    }

    /// Neighbors of a room with the shared lengths.
    pub fn neighbors(&self, id: RoomId) -> Vec<(RoomId, f64)> {
        let Some(&idx) = self.id_to_node.get(&id) else {
            return Vec::new();
        };
        self.adjacency[idx]
            .iter()
            .map(|&(neighbor, edge_idx)| (self.nodes[neighbor], self.edges[edge_idx].shared_length))
            .collect()
    }

    pub fn degree(&self, id: RoomId) -> usize {
        self.id_to_node
            .get(&id)
            .map_or(0, |&idx| self.adjacency[idx].len())
    }

    /// Rooms touching no other room.
    pub fn isolated_nodes(&self) -> Vec<RoomId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.adjacency[*i].is_empty())
            .map(|(_, id)| *id)
            .collect()
    }

    /// Connected components (BFS), each as a list of room ids.
    pub fn connected_components(&self) -> Vec<Vec<RoomId>> {
        let n = self.nodes.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(start);
            visited[start] = true;

            while let Some(node) = queue.pop_front() {
                component.push(self.nodes[node]);
                for &(neighbor, _) in &self.adjacency[node] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// Copy of the graph with every length multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut graph = self.clone();
        for edge in &mut graph.edges {
            edge.shared_length *= factor;
        }
        graph
    }
}

// ============================================================================
// Serialization
// ============================================================================

#[derive(Serialize, Deserialize)]
struct GraphRepr {
    nodes: Vec<RoomId>,
    edges: Vec<AdjacencyEdge>,
}

impl From<GraphRepr> for AdjacencyGraph {
    fn from(repr: GraphRepr) -> Self {
        let mut graph = AdjacencyGraph::new();
        for id in repr.nodes {
            graph.add_node(id);
        }
        for edge in repr.edges {
            // Edges naming unknown rooms are dropped on load
            let _ = graph.add_edge(edge.a, edge.b, edge.shared_length);
        }
        graph
    }
}

impl From<AdjacencyGraph> for GraphRepr {
    fn from(graph: AdjacencyGraph) -> Self {
        GraphRepr {
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomShape;
    use crate::room_type::RoomType;
    use approx::assert_relative_eq;
    use madori_geometry::Rect;

    fn room(id: u32, floor: u32, x: f64, y: f64, w: f64, h: f64) -> RoomInstance {
        RoomInstance::new(
            RoomId(id),
            RoomType::Bedroom,
            floor,
            RoomShape::Rect(Rect::new(x, y, w, h).unwrap()),
        )
    }

    #[test]
    fn builds_edges_for_touching_rooms() {
        let rooms = vec![
            room(1, 0, 0.0, 0.0, 100.0, 100.0),
            room(2, 0, 100.0, 20.0, 50.0, 50.0),
            room(3, 0, 300.0, 0.0, 50.0, 50.0),
        ];
        let graph = AdjacencyGraph::from_rooms(&rooms, 5.0, 10.0);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert_relative_eq!(graph.edge_between(RoomId(2), RoomId(1)).unwrap().shared_length, 50.0);
        assert_eq!(graph.isolated_nodes(), vec![RoomId(3)]);
        assert_eq!(graph.connected_components().len(), 2);
    }

    #[test]
    fn short_contact_below_threshold_is_ignored() {
        let rooms = vec![
            room(1, 0, 0.0, 0.0, 100.0, 100.0),
            room(2, 0, 100.0, 95.0, 50.0, 50.0),
        ];
        let graph = AdjacencyGraph::from_rooms(&rooms, 0.0, 10.0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn rooms_on_other_floors_never_connect() {
        let rooms = vec![
            room(1, 0, 0.0, 0.0, 100.0, 100.0),
            room(2, 1, 100.0, 0.0, 100.0, 100.0),
        ];
        let graph = AdjacencyGraph::from_rooms(&rooms, 5.0, 10.0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn add_edge_rejects_unknown_and_self_loops() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(RoomId(1));
        assert!(graph.add_edge(RoomId(1), RoomId(1), 1.0).is_err());
        assert!(graph.add_edge(RoomId(1), RoomId(9), 1.0).is_err());
    }

    #[test]
    fn edges_are_normalized_and_deduplicated() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(RoomId(5));
        graph.add_node(RoomId(2));
        graph.add_edge(RoomId(5), RoomId(2), 1.0).unwrap();
        graph.add_edge(RoomId(2), RoomId(5), 3.0).unwrap();
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges()[0];
        assert_eq!((edge.a, edge.b), (RoomId(2), RoomId(5)));
        assert_relative_eq!(edge.shared_length, 3.0);
        assert_eq!(graph.degree(RoomId(5)), 1);
    }

    #[test]
    fn json_round_trip_rebuilds_index() {
        let rooms = vec![
            room(1, 0, 0.0, 0.0, 4.0, 4.0),
            room(2, 0, 4.0, 0.0, 4.0, 4.0),
        ];
        let graph = AdjacencyGraph::from_rooms(&rooms, 0.0, 0.0);
        let json = serde_json::to_string(&graph).unwrap();
        let back: AdjacencyGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.neighbors(RoomId(1)), vec![(RoomId(2), 4.0)]);
    }
}
