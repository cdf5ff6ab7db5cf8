//! Entity definitions for the area mapper.
//!
//! This module defines the value objects the graph is built from:
//! - `Area`: a named map region
//! - `Room`: a vertex, identified by its stable id
//! - `Exit`: an edge label, identified by its literal text
//! - `Compass`: the ten canonical directions an exit literal may resolve to

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::AreaGraph;

/// A named collection of rooms forming one map region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Canonical compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compass {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Up,
    Down,
}

impl Compass {
    pub const ALL: [Compass; 10] = [
        Compass::North,
        Compass::South,
        Compass::East,
        Compass::West,
        Compass::NorthEast,
        Compass::NorthWest,
        Compass::SouthEast,
        Compass::SouthWest,
        Compass::Up,
        Compass::Down,
    ];

    /// Short code, e.g. `"ne"`.
    pub fn code(&self) -> &'static str {
        match self {
            Compass::North => "n",
            Compass::South => "s",
            Compass::East => "e",
            Compass::West => "w",
            Compass::NorthEast => "ne",
            Compass::NorthWest => "nw",
            Compass::SouthEast => "se",
            Compass::SouthWest => "sw",
            Compass::Up => "u",
            Compass::Down => "d",
        }
    }

    /// Long name, e.g. `"northeast"`.
    pub fn long_name(&self) -> &'static str {
        match self {
            Compass::North => "north",
            Compass::South => "south",
            Compass::East => "east",
            Compass::West => "west",
            Compass::NorthEast => "northeast",
            Compass::NorthWest => "northwest",
            Compass::SouthEast => "southeast",
            Compass::SouthWest => "southwest",
            Compass::Up => "up",
            Compass::Down => "down",
        }
    }

    pub fn opposite(&self) -> Compass {
        match self {
            Compass::North => Compass::South,
            Compass::South => Compass::North,
            Compass::East => Compass::West,
            Compass::West => Compass::East,
            Compass::NorthEast => Compass::SouthWest,
            Compass::NorthWest => Compass::SouthEast,
            Compass::SouthEast => Compass::NorthWest,
            Compass::SouthWest => Compass::NorthEast,
            Compass::Up => Compass::Down,
            Compass::Down => Compass::Up,
        }
    }

    /// Resolve an exit literal, ignoring case. Accepts short and long forms.
    pub fn parse(literal: &str) -> Option<Self> {
        let lowered = literal.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|dir| dir.code() == lowered || dir.long_name() == lowered)
    }
}

/// RGBA display color of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// 2D coordinate of a room on the rendered map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A navigable location. Equality and hashing use the id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    /// Back-reference to the owning area.
    pub area: Option<Area>,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
    pub notes: Option<String>,
    pub label: Option<String>,
    pub area_entrance: bool,
    pub indoors: bool,
    pub color: Option<Color>,
    #[serde(skip)]
    pub current: bool,
    /// Exits the game reported for this room.
    pub exits: BTreeSet<String>,
    /// Exits actually taken while in maze mode.
    pub used_exits: BTreeSet<String>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            area: None,
            short_desc: None,
            long_desc: None,
            notes: None,
            label: None,
            area_entrance: false,
            indoors: false,
            color: None,
            current: false,
            exits: BTreeSet::new(),
            used_exits: BTreeSet::new(),
        }
    }

    /// Create a room that belongs to `area`.
    pub fn in_area(id: impl Into<String>, area: &Area) -> Self {
        let mut room = Self::new(id);
        room.area = Some(area.clone());
        room
    }

    pub fn set_descs(&mut self, short_desc: impl Into<String>, long_desc: impl Into<String>) {
        self.short_desc = Some(short_desc.into());
        self.long_desc = Some(long_desc.into());
    }

    pub fn add_exit(&mut self, exit: impl Into<String>) {
        self.exits.insert(exit.into());
    }

    pub fn add_exits<I, S>(&mut self, exits: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exits.extend(exits.into_iter().map(Into::into));
    }

    /// Replace the declared exits.
    pub fn set_exits(&mut self, exits: BTreeSet<String>) {
        self.exits = exits;
    }

    pub fn use_exit(&mut self, exit: impl Into<String>) {
        self.used_exits.insert(exit.into());
    }

    pub fn reset_exit_usage(&mut self) {
        self.used_exits.clear();
    }

    /// True iff the used exits are exactly the declared exits.
    ///
    /// An exit used but never declared makes this false as well.
    pub fn all_exits_have_been_used(&self) -> bool {
        self.exits == self.used_exits
    }
}

impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Room {}

impl Hash for Room {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_desc.as_deref().unwrap_or_default())
    }
}

/// A directed egress from a room, identified by its literal text.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub exit: String,
    /// Highlight flag for the last computed path. Never persisted.
    #[serde(skip)]
    pub current_exit: bool,
}

impl Exit {
    pub fn new(exit: impl Into<String>) -> Self {
        Self {
            exit: exit.into(),
            current_exit: false,
        }
    }

    pub fn compass(&self) -> Option<Compass> {
        Compass::parse(&self.exit)
    }

    /// Canonical short code of the literal, if it is a compass direction.
    pub fn compass_dir(&self) -> Option<&'static str> {
        self.compass().map(|dir| dir.code())
    }

    /// Long name of the opposite direction.
    pub fn opposite(&self) -> Result<&'static str, GraphError> {
        self.compass()
            .map(|dir| dir.opposite().long_name())
            .ok_or_else(|| GraphError::NotACompassDirection(self.exit.clone()))
    }
}

impl PartialEq for Exit {
    fn eq(&self, other: &Self) -> bool {
        self.exit == other.exit
    }
}

impl Hash for Exit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.exit.hash(state);
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exit)
    }
}

/// An area's graph together with room coordinates, the unit of persistence.
#[derive(Debug, Clone)]
pub struct AreaSnapshot {
    pub area: Area,
    pub graph: AreaGraph,
    /// Keyed by the ids of `graph`'s vertices.
    pub locations: BTreeMap<String, Location>,
}

impl AreaSnapshot {
    pub fn new(area: Area) -> Self {
        Self {
            area,
            graph: AreaGraph::new(),
            locations: BTreeMap::new(),
        }
    }
}
