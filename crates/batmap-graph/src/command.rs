//! Commands fed into the engine by event sources.
//!
//! Front ends (the game client hook, UI actions, replays) translate their
//! events into `MapperCommand`s, so the engine never depends on a particular
//! source.

use serde::{Deserialize, Serialize};

use crate::engine::MapperEngine;
use crate::error::GraphError;

/// Toggleable navigation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperMode {
    /// Track which declared exits have been walked.
    Maze,
    /// Add the compass-opposite edge on every compass arrival.
    ReversableDirs,
}

impl MapperMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapperMode::Maze => "maze",
            MapperMode::ReversableDirs => "reversable_dirs",
        }
    }
}

/// A single event for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapperCommand {
    /// The player arrived in a room.
    RoomArrived {
        id: String,
        /// Exit literal taken, or the teleport sentinel.
        arrival_exit: String,
        long_desc: String,
        short_desc: String,
        #[serde(default)]
        indoors: bool,
        #[serde(default)]
        exits: Vec<String>,
    },
    /// Fresh descriptions for a known room.
    DescsUpdated {
        room_id: String,
        long_desc: String,
        short_desc: String,
        #[serde(default)]
        indoors: bool,
        #[serde(default)]
        exits: Vec<String>,
    },
    /// Set (or, with `None`, remove) the current room's label.
    LabelSet {
        #[serde(default)]
        label: Option<String>,
    },
    ModeToggled {
        mode: MapperMode,
        enabled: bool,
    },
    ClearRequested,
}

/// What applying a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    RoomEntered { is_new: bool },
    DescsUpdated,
    LabelChanged { applied: bool },
    ModeChanged,
    Cleared,
}

impl MapperEngine {
    /// Apply one command to the engine.
    pub fn apply(&mut self, command: MapperCommand) -> Result<CommandOutcome, GraphError> {
        let outcome = match command {
            MapperCommand::RoomArrived {
                id,
                arrival_exit,
                long_desc,
                short_desc,
                indoors,
                exits,
            } => {
                let is_new = self.move_to_room(&id, &arrival_exit, &long_desc, &short_desc, indoors, exits);
                CommandOutcome::RoomEntered { is_new }
            }
            MapperCommand::DescsUpdated {
                room_id,
                long_desc,
                short_desc,
                indoors,
                exits,
            } => {
                self.set_room_descs_for_room(&room_id, &long_desc, &short_desc, indoors, exits)?;
                CommandOutcome::DescsUpdated
            }
            MapperCommand::LabelSet { label: Some(label) } => CommandOutcome::LabelChanged {
                applied: self.set_label_to_current_room(&label),
            },
            MapperCommand::LabelSet { label: None } => {
                let applied = self.current_room().is_some();
                self.remove_label_from_current();
                CommandOutcome::LabelChanged { applied }
            }
            MapperCommand::ModeToggled { mode, enabled } => {
                match mode {
                    MapperMode::Maze => self.set_maze_mode(enabled),
                    MapperMode::ReversableDirs => self.set_reversable_dirs_mode(enabled),
                }
                CommandOutcome::ModeChanged
            }
            MapperCommand::ClearRequested => {
                self.clear();
                CommandOutcome::Cleared
            }
        };
        Ok(outcome)
    }
}
