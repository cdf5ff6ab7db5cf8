//! In-memory graph store for one area.
//!
//! `AreaGraph` is a directed multigraph: rooms are vertices keyed by id and
//! every edge is an `Exit` bound to a source and a target room. Vertices and
//! edges keep insertion order, so traversals are deterministic for a given
//! graph state.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::error::GraphError;
use crate::schema::{Exit, Room};

/// An exit bound to its endpoints.
#[derive(Debug, Clone)]
pub struct Edge {
    pub exit: Exit,
    pub source: String,
    pub target: String,
}

/// Directed multigraph of rooms and exits.
#[derive(Debug, Clone, Default)]
pub struct AreaGraph {
    rooms: Vec<Room>,
    room_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    /// Room id → indices into `edges` for its out-edges.
    out_index: HashMap<String, Vec<usize>>,
}

impl AreaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex. Returns false if a room with this id already exists.
    pub fn add_room(&mut self, room: Room) -> bool {
        if self.room_index.contains_key(&room.id) {
            return false;
        }
        self.room_index.insert(room.id.clone(), self.rooms.len());
        self.rooms.push(room);
        true
    }

    pub fn contains_room(&self, id: &str) -> bool {
        self.room_index.contains_key(id)
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_index.get(id).map(|&idx| &self.rooms[idx])
    }

    pub fn room_mut(&mut self, id: &str) -> Option<&mut Room> {
        match self.room_index.get(id) {
            Some(&idx) => Some(&mut self.rooms[idx]),
            None => None,
        }
    }

    /// Rooms in insertion order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn rooms_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.iter_mut()
    }

    pub fn vertex_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Whether `literal` may be added next to `existing` out-edges.
    ///
    /// Literals are compared ignoring case.
    pub fn can_add_exit<'a, I>(existing: I, literal: &str) -> bool
    where
        I: IntoIterator<Item = &'a Exit>,
    {
        !existing
            .into_iter()
            .any(|exit| exit.exit.eq_ignore_ascii_case(literal))
    }

    /// Add a directed edge `source -> target` labelled `exit`.
    ///
    /// Returns `Ok(false)` without touching the graph when `source` already
    /// has an out-edge with the same literal.
    pub fn add_edge(&mut self, source: &str, target: &str, exit: Exit) -> Result<bool, GraphError> {
        for id in [source, target] {
            if !self.contains_room(id) {
                return Err(GraphError::UnknownRoom(id.to_string()));
            }
        }
        if !Self::can_add_exit(self.out_edges(source).map(|edge| &edge.exit), &exit.exit) {
            debug!("Skipping duplicate exit '{}' from {}", exit.exit, source);
            return Ok(false);
        }
        self.restore_edge(source, target, exit)?;
        Ok(true)
    }

    /// Add an edge read back from storage.
    ///
    /// Unlike [`Self::add_edge`] no duplicate check is made, so a stored
    /// graph comes back exactly as it was written.
    pub fn restore_edge(&mut self, source: &str, target: &str, exit: Exit) -> Result<(), GraphError> {
        for id in [source, target] {
            if !self.contains_room(id) {
                return Err(GraphError::UnknownRoom(id.to_string()));
            }
        }
        let idx = self.edges.len();
        self.edges.push(Edge {
            exit,
            source: source.to_string(),
            target: target.to_string(),
        });
        self.out_index.entry(source.to_string()).or_default().push(idx);
        Ok(())
    }

    /// Out-edges of a room in insertion order.
    pub fn out_edges<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.out_edge_indices(id).iter().map(move |&idx| &self.edges[idx])
    }

    fn out_edge_indices(&self, id: &str) -> &[usize] {
        self.out_index.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge(&self, idx: usize) -> Option<&Edge> {
        self.edges.get(idx)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Source and target ids of an edge.
    pub fn endpoints(&self, idx: usize) -> Option<(&str, &str)> {
        self.edges
            .get(idx)
            .map(|edge| (edge.source.as_str(), edge.target.as_str()))
    }

    /// Shortest path by edge count, following edge direction.
    ///
    /// Returns the edge indices from `from` to `to`, or `None` if `to` is
    /// unreachable. Among equally short paths the first discovered wins.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<usize>> {
        if !self.contains_room(from) || !self.contains_room(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        // Reached room id → edge index it was reached through
        let mut via: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for &idx in self.out_edge_indices(current) {
                let next = self.edges[idx].target.as_str();
                if next == from || via.contains_key(next) {
                    continue;
                }
                via.insert(next, idx);
                if next == to {
                    return Some(self.unwind(&via, from, to));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn unwind(&self, via: &HashMap<&str, usize>, from: &str, to: &str) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let idx = via[cursor];
            path.push(idx);
            cursor = self.edges[idx].source.as_str();
        }
        path.reverse();
        path
    }

    /// Mark exactly the given edges as the highlighted path.
    pub fn highlight_path(&mut self, path: &[usize]) {
        self.clear_highlight();
        for &idx in path {
            if let Some(edge) = self.edges.get_mut(idx) {
                edge.exit.current_exit = true;
            }
        }
    }

    pub fn clear_highlight(&mut self) {
        for edge in &mut self.edges {
            edge.exit.current_exit = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> AreaGraph {
        let mut graph = AreaGraph::new();
        for id in ids {
            graph.add_room(Room::new(*id));
        }
        graph
    }

    #[test]
    fn test_add_room_rejects_duplicate_id() {
        let mut graph = AreaGraph::new();
        assert!(graph.add_room(Room::new("r1")));
        assert!(!graph.add_room(Room::new("r1")));
        assert_eq!(graph.vertex_count(), 1);
    }

    #[test]
    fn test_can_add_exit() {
        let none: Vec<Exit> = Vec::new();
        assert!(AreaGraph::can_add_exit(&none, "north"));

        let exits = vec![Exit::new("north"), Exit::new("south"), Exit::new("east")];
        assert!(!AreaGraph::can_add_exit(&exits, "north"));
        assert!(!AreaGraph::can_add_exit(&exits, "North"));
        assert!(!AreaGraph::can_add_exit(&exits, "south"));
        assert!(AreaGraph::can_add_exit(&exits, "west"));
    }

    #[test]
    fn test_add_edge_duplicate_literal_is_noop() {
        let mut graph = graph_with(&["r1", "r2", "r3"]);
        assert_eq!(graph.add_edge("r1", "r2", Exit::new("north")), Ok(true));
        assert_eq!(graph.add_edge("r1", "r3", Exit::new("north")), Ok(false));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.endpoints(0), Some(("r1", "r2")));
    }

    #[test]
    fn test_add_edge_unknown_endpoint() {
        let mut graph = graph_with(&["r1"]);
        assert_eq!(
            graph.add_edge("r1", "nowhere", Exit::new("north")),
            Err(GraphError::UnknownRoom("nowhere".to_string()))
        );
    }

    #[test]
    fn test_restore_edge_keeps_duplicates() {
        let mut graph = graph_with(&["r1", "r2"]);
        graph.restore_edge("r1", "r2", Exit::new("north")).unwrap();
        graph.restore_edge("r1", "r1", Exit::new("North")).unwrap();
        assert_eq!(graph.out_edges("r1").count(), 2);
        assert!(graph.restore_edge("r1", "gone", Exit::new("east")).is_err());
    }

    #[test]
    fn test_self_loop() {
        let mut graph = graph_with(&["r1"]);
        assert_eq!(graph.add_edge("r1", "r1", Exit::new("north")), Ok(true));
        let edge = graph.out_edges("r1").next().unwrap();
        assert_eq!(edge.source, "r1");
        assert_eq!(edge.target, "r1");
    }

    #[test]
    fn test_shortest_path_follows_direction() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge("a", "b", Exit::new("east")).unwrap();
        graph.add_edge("b", "c", Exit::new("east")).unwrap();

        assert_eq!(graph.shortest_path("a", "c"), Some(vec![0, 1]));
        assert_eq!(graph.shortest_path("c", "a"), None);
        assert_eq!(graph.shortest_path("a", "a"), Some(vec![]));
        assert_eq!(graph.shortest_path("a", "missing"), None);
    }

    #[test]
    fn test_shortest_path_prefers_fewer_hops() {
        let mut graph = graph_with(&["a", "b", "c", "d"]);
        graph.add_edge("a", "b", Exit::new("north")).unwrap();
        graph.add_edge("b", "c", Exit::new("north")).unwrap();
        graph.add_edge("c", "d", Exit::new("north")).unwrap();
        graph.add_edge("a", "d", Exit::new("portal")).unwrap();

        let path = graph.shortest_path("a", "d").unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(graph.edge(path[0]).unwrap().exit.exit, "portal");
    }

    #[test]
    fn test_highlight_path() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge("a", "b", Exit::new("east")).unwrap();
        graph.add_edge("b", "a", Exit::new("west")).unwrap();

        graph.highlight_path(&[0]);
        assert!(graph.edge(0).unwrap().exit.current_exit);
        assert!(!graph.edge(1).unwrap().exit.current_exit);

        graph.highlight_path(&[1]);
        assert!(!graph.edge(0).unwrap().exit.current_exit);
        assert!(graph.edge(1).unwrap().exit.current_exit);
    }
}
