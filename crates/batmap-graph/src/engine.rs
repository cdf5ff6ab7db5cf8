//! Mapper Engine for the area graph.
//!
//! Consumes room arrivals reported by the game and grows the current area's
//! graph from them. Also answers the navigation queries the client needs:
//! walking directions to a room, exit listings, and room labels.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::GraphError;
use crate::graph::AreaGraph;
use crate::schema::{Area, AreaSnapshot, Exit, Location, Room};

/// Arrival exit meaning "no directional edge should be created".
pub const TELEPORT_EXIT: &str = "teleport";

/// Delimiter between steps of a direction string.
const STEP_DELIMITER: &str = ";";

/// Mapper Engine owns one area's graph and the current-room pointer.
#[derive(Debug, Clone)]
pub struct MapperEngine {
    area: Area,
    graph: AreaGraph,
    locations: BTreeMap<String, Location>,
    current_room: Option<String>,
    maze_mode: bool,
    reversable_dirs_mode: bool,
}

impl MapperEngine {
    /// Create an engine with an empty graph for `area`.
    pub fn new(area: Area) -> Self {
        Self {
            area,
            graph: AreaGraph::new(),
            locations: BTreeMap::new(),
            current_room: None,
            maze_mode: false,
            reversable_dirs_mode: false,
        }
    }

    /// Resume mapping a previously stored area. No room is current.
    pub fn from_snapshot(snapshot: AreaSnapshot) -> Self {
        let AreaSnapshot {
            area,
            mut graph,
            locations,
        } = snapshot;
        for room in graph.rooms_mut() {
            room.current = false;
        }
        Self {
            area,
            graph,
            locations,
            current_room: None,
            maze_mode: false,
            reversable_dirs_mode: false,
        }
    }

    /// Copy of the area's graph and locations, ready to be saved.
    pub fn snapshot(&self) -> AreaSnapshot {
        AreaSnapshot {
            area: self.area.clone(),
            graph: self.graph.clone(),
            locations: self.locations.clone(),
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn graph(&self) -> &AreaGraph {
        &self.graph
    }

    pub fn locations(&self) -> &BTreeMap<String, Location> {
        &self.locations
    }

    /// Record where the renderer placed a room.
    pub fn set_location(&mut self, room_id: &str, location: Location) -> Result<(), GraphError> {
        if !self.graph.contains_room(room_id) {
            return Err(GraphError::UnknownRoom(room_id.to_string()));
        }
        self.locations.insert(room_id.to_string(), location);
        Ok(())
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.current_room
            .as_deref()
            .and_then(|id| self.graph.room(id))
    }

    /// Make a known room current without creating any edge.
    pub fn set_current_room(&mut self, room_id: &str) -> Result<(), GraphError> {
        if !self.graph.contains_room(room_id) {
            return Err(GraphError::UnknownRoom(room_id.to_string()));
        }
        self.set_current(room_id);
        Ok(())
    }

    pub fn maze_mode(&self) -> bool {
        self.maze_mode
    }

    pub fn set_maze_mode(&mut self, enabled: bool) {
        self.maze_mode = enabled;
    }

    pub fn reversable_dirs_mode(&self) -> bool {
        self.reversable_dirs_mode
    }

    pub fn set_reversable_dirs_mode(&mut self, enabled: bool) {
        self.reversable_dirs_mode = enabled;
    }

    /// Handle an arrival in room `id` through `arrival_exit`.
    ///
    /// Returns true if the room was not in the graph before. A known room
    /// keeps its attributes; use [`Self::set_room_descs_for_room`] to update
    /// them.
    pub fn move_to_room<I, S>(
        &mut self,
        id: &str,
        arrival_exit: &str,
        long_desc: &str,
        short_desc: &str,
        indoors: bool,
        exits: I,
    ) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let is_new = !self.graph.contains_room(id);
        if is_new {
            let mut room = Room::in_area(id, &self.area);
            room.area_entrance = self.graph.is_empty();
            room.set_descs(short_desc, long_desc);
            room.indoors = indoors;
            room.add_exits(exits);
            debug!("New room {} in {} (entrance: {})", id, self.area.name, room.area_entrance);
            self.graph.add_room(room);
        }

        if let Some(previous) = self.current_room.clone() {
            if arrival_exit != TELEPORT_EXIT {
                self.link_rooms(&previous, id, arrival_exit);
                if self.maze_mode {
                    if let Some(room) = self.graph.room_mut(&previous) {
                        room.use_exit(arrival_exit);
                    }
                }
            }
        }

        self.set_current(id);
        is_new
    }

    /// Add `from -> to` and, in reversable mode, the opposite edge back.
    fn link_rooms(&mut self, from: &str, to: &str, exit_literal: &str) {
        let exit = Exit::new(exit_literal);
        let opposite = exit.opposite().ok();

        // Both endpoints are known vertices here, so add_edge cannot fail
        if let Ok(added) = self.graph.add_edge(from, to, exit) {
            debug!("Edge {} -[{}]-> {} added: {}", from, exit_literal, to, added);
        }

        if self.reversable_dirs_mode {
            if let Some(back) = opposite {
                if let Ok(added) = self.graph.add_edge(to, from, Exit::new(back)) {
                    debug!("Reverse edge {} -[{}]-> {} added: {}", to, back, from, added);
                }
            }
        }
    }

    fn set_current(&mut self, id: &str) {
        if let Some(previous) = self.current_room.take() {
            if let Some(room) = self.graph.room_mut(&previous) {
                room.current = false;
            }
        }
        if let Some(room) = self.graph.room_mut(id) {
            room.current = true;
            self.current_room = Some(id.to_string());
        }
    }

    /// Overwrite a room's descriptions and indoors flag, and add `exits` to
    /// its declared exits. Exits already known are never removed.
    pub fn set_room_descs_for_room<I, S>(
        &mut self,
        room_id: &str,
        long_desc: &str,
        short_desc: &str,
        indoors: bool,
        exits: I,
    ) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let room = self
            .graph
            .room_mut(room_id)
            .ok_or_else(|| GraphError::UnknownRoom(room_id.to_string()))?;
        room.set_descs(short_desc, long_desc);
        room.indoors = indoors;
        room.add_exits(exits);
        Ok(())
    }

    /// Attach a label to the current room. Returns false if there is none.
    pub fn set_label_to_current_room(&mut self, label: &str) -> bool {
        match self.current_room_mut() {
            Some(room) => {
                room.label = Some(label.to_string());
                true
            }
            None => false,
        }
    }

    pub fn remove_label_from_current(&mut self) {
        if let Some(room) = self.current_room_mut() {
            room.label = None;
        }
    }

    fn current_room_mut(&mut self) -> Option<&mut Room> {
        let id = self.current_room.as_deref()?;
        self.graph.room_mut(id)
    }

    /// Whether any room carries `label`, ignoring case.
    pub fn room_label_exists(&self, label: &str) -> bool {
        self.find_room_by_label(label).is_some()
    }

    /// Id of the room labelled `label`, ignoring case.
    pub fn find_room_by_label(&self, label: &str) -> Option<&str> {
        self.labeled_rooms()
            .find(|(text, _)| text.to_lowercase() == label.to_lowercase())
            .map(|(_, room)| room.id.as_str())
    }

    fn labeled_rooms(&self) -> impl Iterator<Item = (&str, &Room)> {
        self.graph
            .rooms()
            .filter_map(|room| room.label.as_deref().map(|label| (label, room)))
    }

    /// `"label: short description"` for every labelled room, in graph order.
    pub fn labels(&self) -> Vec<String> {
        self.labeled_rooms()
            .map(|(label, room)| format!("{}: {}", label, room))
            .collect()
    }

    /// Exit literals leading out of a room, joined by `;`.
    pub fn make_exits_string_from_picked_room(&self, room_id: &str) -> String {
        self.graph
            .out_edges(room_id)
            .map(|edge| edge.exit.exit.as_str())
            .collect::<Vec<_>>()
            .join(STEP_DELIMITER)
    }

    /// Walking directions from the current room to `target_id`.
    ///
    /// Returns `None` when there is no current room or no directed path.
    /// Every step ends with `;`. With `compress`, steps become compass codes
    /// and runs of the same code collapse to `"<count> <code>;"`.
    ///
    /// The edges of the found path are highlighted in the graph.
    pub fn check_dirs_from_current_room_to(&mut self, target_id: &str, compress: bool) -> Option<String> {
        let from = self.current_room.as_deref()?;
        let path = self.graph.shortest_path(from, target_id)?;

        let steps: Vec<&Exit> = path
            .iter()
            .filter_map(|&idx| self.graph.edge(idx))
            .map(|edge| &edge.exit)
            .collect();
        let dirs = if compress {
            compress_steps(&steps)
        } else {
            steps
                .iter()
                .map(|exit| format!("{}{}", exit.exit, STEP_DELIMITER))
                .collect()
        };

        self.graph.highlight_path(&path);
        Some(dirs)
    }

    /// Whether every declared exit of the current room has been walked.
    pub fn current_room_fully_explored(&self) -> bool {
        self.current_room()
            .map(Room::all_exits_have_been_used)
            .unwrap_or(false)
    }

    /// Forget which exits were walked in maze mode.
    pub fn reset_maze_progress(&mut self) {
        for room in self.graph.rooms_mut() {
            room.reset_exit_usage();
        }
    }

    /// Drop every room and exit of the area. Modes are kept.
    pub fn clear(&mut self) {
        info!("Clearing map of {}", self.area.name);
        self.graph = AreaGraph::new();
        self.locations.clear();
        self.current_room = None;
    }
}

/// Run-length encode consecutive identical compass codes.
fn compress_steps(steps: &[&Exit]) -> String {
    let codes: Vec<&str> = steps
        .iter()
        .map(|exit| exit.compass_dir().unwrap_or(exit.exit.as_str()))
        .collect();

    let mut out = String::new();
    let mut i = 0;
    while i < codes.len() {
        let code = codes[i];
        let run = codes[i..].iter().take_while(|&&c| c == code).count();
        if run > 1 {
            out.push_str(&format!("{} {}{}", run, code, STEP_DELIMITER));
        } else {
            out.push_str(&format!("{}{}", code, STEP_DELIMITER));
        }
        i += run;
    }
    out
}
